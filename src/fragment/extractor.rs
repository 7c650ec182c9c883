//! Fragment extraction from a gate interval.
//!
//! The extractor is stateless: it reads a slice of the timeline covering one
//! voice's gate interval and produces the fragment for it, or nothing when
//! the voice was never audible during the interval.

use std::collections::BTreeSet;

use log::{debug, trace};

use super::field::{rename_fields, Field};
use super::{FragmentRow, SoundFragment};
use crate::sid::{check_voice, MainField, VoiceField};
use crate::trace::{FrameClock, TimelineEntry};
use crate::{Result, SidError};

/// Fragment plus where it occurred
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFragment {
    /// Voice-normalized fragment
    pub fragment: SoundFragment,
    /// Absolute clock of the gate rising edge
    pub first_clock: u64,
    /// Physical voice the fragment was extracted for
    pub voice: u8,
}

/// Per-field running sums used for column pruning
struct Accumulator {
    first: Vec<i64>,
    cumsum: Vec<i64>,
    max: Vec<i64>,
}

impl Accumulator {
    fn new(first: Vec<i64>) -> Self {
        Self {
            cumsum: first.clone(),
            max: first.clone(),
            first,
        }
    }

    fn keep(&mut self, column: usize, change: i64) {
        self.cumsum[column] += change;
        self.max[column] = self.max[column].max(self.cumsum[column]);
    }

    /// Fold a change into the first row instead of emitting it
    fn fold(&mut self, column: usize, change: i64) {
        self.first[column] += change;
        self.keep(column, change);
    }
}

/// Timed change row before pruning
struct PendingDiff {
    bucket: u64,
    clock: u64,
    changes: Vec<Option<i64>>,
}

/// Extracts sound fragments from gate interval slices
#[derive(Debug, Clone, Copy)]
pub struct FragmentExtractor {
    frame_clock: FrameClock,
}

impl FragmentExtractor {
    /// Create an extractor bucketing offsets with `frame_clock`
    pub fn new(frame_clock: FrameClock) -> Self {
        Self { frame_clock }
    }

    /// Extract the fragment for `voice` from a gate interval slice
    ///
    /// The slice must start at the voice's gate rising edge. Returns
    /// `Ok(None)` when the voice is never audible in the slice.
    pub fn extract(&self, slice: &[TimelineEntry], voice: u8) -> Result<Option<ExtractedFragment>> {
        check_voice(voice)?;
        let Some(first) = slice.first() else {
            return Ok(None);
        };
        if !slice
            .iter()
            .any(|entry| entry.state.audible_voices().contains(&voice))
        {
            trace!("voice {} inaudible at {}", voice, first.clock);
            return Ok(None);
        }

        let voices = Self::involved_voices(slice, voice)?;
        let fields = Field::tracked(&voices);
        let mut acc = Accumulator::new(fields.iter().map(|f| f.value(&first.state)).collect());
        let pending = self.walk(slice, voice, &voices, &fields, &mut acc);

        let keep = Self::retained_columns(&fields, &voices, &acc.max);
        let rows = Self::compress(first.clock, &acc.first, pending, &keep)?;
        let kept: Vec<Field> = keep.iter().map(|&column| fields[column]).collect();

        debug!(
            "voice {} at {}: {} rows, {} of {} fields",
            voice,
            first.clock,
            rows.len(),
            kept.len(),
            fields.len()
        );

        Ok(Some(ExtractedFragment {
            fragment: SoundFragment::new(rename_fields(&kept, voice), rows, voices),
            first_clock: first.clock,
            voice,
        }))
    }

    /// Target voice plus the voice modulating it, if any
    ///
    /// A modulating voice that is itself modulated would pull a third voice
    /// into the fragment, which is rejected.
    fn involved_voices(slice: &[TimelineEntry], voice: u8) -> Result<Vec<u8>> {
        let synced = |v: u8| -> BTreeSet<u8> {
            slice
                .iter()
                .filter_map(|entry| entry.state.voice(v).synced_voice())
                .collect()
        };

        let mut voices = vec![voice];
        voices.extend(synced(voice));
        if let Some(&secondary) = voices.get(1) {
            let chained: Vec<u8> = synced(secondary)
                .into_iter()
                .filter(|v| !voices.contains(v))
                .collect();
            voices.extend(chained);
        }
        if voices.len() > 2 {
            return Err(SidError::TooManyVoices { voice, voices });
        }
        Ok(voices)
    }

    fn walk(
        &self,
        slice: &[TimelineEntry],
        voice: u8,
        voices: &[u8],
        fields: &[Field],
        acc: &mut Accumulator,
    ) -> Vec<PendingDiff> {
        let first_frame = slice[0].frame;
        let sounding_in = |entry: &TimelineEntry| {
            voices.iter().any(|&v| entry.state.voice(v).sounding())
        };
        let mut sounding = sounding_in(&slice[0]);
        let mut pending = Vec::new();

        for pair in slice.windows(2) {
            let (last, now) = (&pair[0], &pair[1]);
            // Once any voice of the fragment sounds, every change is timed
            sounding = sounding || sounding_in(now);

            let mut changes = vec![None; fields.len()];
            for (column, field) in fields.iter().enumerate() {
                let change = field.value(&now.state) - field.value(&last.state);
                if change == 0 {
                    continue;
                }
                if sounding {
                    changes[column] = Some(change);
                } else {
                    acc.fold(column, change);
                }
            }

            if changes.iter().any(Option::is_some) {
                for (column, change) in changes.iter().enumerate() {
                    if let Some(change) = change {
                        acc.keep(column, *change);
                    }
                }
                pending.push(PendingDiff {
                    bucket: self
                        .frame_clock
                        .frame_start(now.frame.saturating_sub(first_frame)),
                    clock: now.clock,
                    changes,
                });
            }

            let target = now.state.voice(voice);
            if !target.gate() && target.release == 0 {
                break;
            }
        }
        pending
    }

    /// Columns surviving pruning, in column order
    fn retained_columns(fields: &[Field], voices: &[u8], max: &[i64]) -> Vec<usize> {
        let max_of = |field: Field| {
            fields
                .iter()
                .position(|f| *f == field)
                .map_or(0, |column| max[column])
        };
        let filtered = voices
            .iter()
            .any(|&v| max_of(Field::Voice(VoiceField::Filter, v)) > 0);
        let mute3 = voices.contains(&3) && max_of(Field::Main(MainField::MuteVoice3)) > 0;

        fields
            .iter()
            .enumerate()
            .filter(|&(column, field)| {
                if max[column] <= 0 {
                    return false;
                }
                match *field {
                    Field::Voice(VoiceField::PulseWidth, v) => {
                        max_of(Field::Voice(VoiceField::Pulse, v)) > 0
                    }
                    Field::Main(MainField::MuteVoice3) => mute3,
                    f if f.is_filter() => filtered,
                    _ => true,
                }
            })
            .map(|(column, _)| column)
            .collect()
    }

    /// Build rows: first row at offset 0, then frame-bucketed change rows
    fn compress(
        first_clock: u64,
        first: &[i64],
        pending: Vec<PendingDiff>,
        keep: &[usize],
    ) -> Result<Vec<FragmentRow>> {
        let mut rows = vec![FragmentRow {
            offset: 0,
            values: keep.iter().map(|&column| Some(first[column])).collect(),
        }];
        let mut bucket = (0u64, first_clock);
        let mut last_offset = 0u64;

        for diff in pending {
            if diff.bucket != bucket.0 {
                bucket = (diff.bucket, diff.clock);
            }
            let values: Vec<Option<i64>> = keep.iter().map(|&column| diff.changes[column]).collect();
            if values.iter().all(Option::is_none) {
                continue;
            }
            let offset = bucket.0 + (diff.clock - bucket.1);
            if offset <= last_offset {
                return Err(SidError::ClockRegression {
                    previous: last_offset,
                    current: offset,
                });
            }
            last_offset = offset;
            rows.push(FragmentRow { offset, values });
        }
        Ok(rows)
    }
}
