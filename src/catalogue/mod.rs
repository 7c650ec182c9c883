//! Patch Catalogue
//!
//! Deduplicates fragments by content hash. Single-voice and synchronized
//! two-voice fragments live in separate maps; every observation of an
//! already known shape only bumps its occurrence count.

pub mod persist;

pub use persist::{read_events, read_patches, write_events, write_patches, FragmentEvent};

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;

use crate::fragment::SoundFragment;

/// Which map a patch belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// One voice
    Single,
    /// Primary voice plus a synchronized voice
    Multi,
}

impl Arity {
    /// Arity of a fragment
    pub fn of(fragment: &SoundFragment) -> Self {
        if fragment.is_multi_voice() {
            Arity::Multi
        } else {
            Arity::Single
        }
    }

    /// File name suffix of the patch table
    pub fn table_suffix(&self) -> &'static str {
        match self {
            Arity::Single => "single_ssf",
            Arity::Multi => "multi_ssf",
        }
    }

    /// Relative voice numbers of the fragments in this map
    pub fn voices(&self) -> Vec<u8> {
        match self {
            Arity::Single => vec![1],
            Arity::Multi => vec![1, 3],
        }
    }
}

/// A deduplicated fragment shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// Content hash of the fragment
    pub hash_id: u64,
    /// The fragment shape
    pub fragment: Arc<SoundFragment>,
    /// How many times the shape was observed
    pub occurrence_count: u64,
}

/// Content hash of a fragment's ordered `(field, value)` stream
///
/// Row offsets are hashed as the trailing `clock` column. Physical voice
/// numbers are not part of the content.
pub fn content_hash(fragment: &SoundFragment) -> u64 {
    let mut hasher = blake3::Hasher::new();
    for row in fragment.rows() {
        for (field, value) in fragment.fields().iter().zip(&row.values) {
            hasher.update(field.name().as_bytes());
            match value {
                Some(value) => {
                    hasher.update(&[1]);
                    hasher.update(&value.to_le_bytes());
                }
                None => {
                    hasher.update(&[0]);
                }
            }
        }
        hasher.update(b"clock");
        hasher.update(&row.offset.to_le_bytes());
        hasher.update(b"\n");
    }
    let bytes = hasher.finalize();
    let mut id = [0u8; 8];
    id.copy_from_slice(&bytes.as_bytes()[..8]);
    u64::from_le_bytes(id)
}

/// Append/increment-only store of patches for one trace-processing run
#[derive(Debug, Default)]
pub struct PatchCatalogue {
    single: Mutex<HashMap<u64, Patch>>,
    multi: Mutex<HashMap<u64, Patch>>,
}

impl PatchCatalogue {
    /// Create an empty catalogue
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, arity: Arity) -> &Mutex<HashMap<u64, Patch>> {
        match arity {
            Arity::Single => &self.single,
            Arity::Multi => &self.multi,
        }
    }

    /// Record one observation of a fragment, returning its hash id
    pub fn intern(&self, fragment: &SoundFragment) -> u64 {
        let hash_id = content_hash(fragment);
        let mut patches = self.map(Arity::of(fragment)).lock();
        let patch = patches.entry(hash_id).or_insert_with(|| {
            trace!("new patch {:016x}", hash_id);
            Patch {
                hash_id,
                fragment: Arc::new(fragment.clone()),
                occurrence_count: 0,
            }
        });
        patch.occurrence_count += 1;
        hash_id
    }

    /// Add a previously persisted patch, summing counts with any existing entry
    pub fn merge(&self, arity: Arity, patch: Patch) {
        let mut patches = self.map(arity).lock();
        patches
            .entry(patch.hash_id)
            .and_modify(|existing| existing.occurrence_count += patch.occurrence_count)
            .or_insert(patch);
    }

    /// Look up a patch in either map
    pub fn get(&self, hash_id: u64) -> Option<Patch> {
        let single = self.single.lock().get(&hash_id).cloned();
        single.or_else(|| self.multi.lock().get(&hash_id).cloned())
    }

    /// Patches of one arity, most frequent first (ties by hash id)
    pub fn patches(&self, arity: Arity) -> Vec<Patch> {
        let mut patches: Vec<Patch> = self.map(arity).lock().values().cloned().collect();
        sort_by_count(&mut patches);
        patches
    }

    /// The `n` most frequent patches across both maps
    pub fn top_n(&self, n: usize) -> Vec<Patch> {
        let mut patches = self.patches(Arity::Single);
        patches.extend(self.patches(Arity::Multi));
        sort_by_count(&mut patches);
        patches.truncate(n);
        patches
    }

    /// Number of distinct patches
    pub fn len(&self) -> usize {
        self.single.lock().len() + self.multi.lock().len()
    }

    /// Check if nothing was interned
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of all occurrence counts
    pub fn total_occurrences(&self) -> u64 {
        [&self.single, &self.multi]
            .iter()
            .map(|map| map.lock().values().map(|p| p.occurrence_count).sum::<u64>())
            .sum()
    }
}

fn sort_by_count(patches: &mut [Patch]) {
    patches.sort_by(|a, b| {
        b.occurrence_count
            .cmp(&a.occurrence_count)
            .then(a.hash_id.cmp(&b.hash_id))
    });
}
