//! Sound Fragments
//!
//! A sound fragment is the diff-compressed register activity of one gated
//! note: a first row holding every retained field, then one row per change
//! carrying only the fields that moved. Offsets are frame-quantized clock
//! distances from the start of the note and voice numbers are relative
//! (1 = primary, 3 = synchronized), so the same sound played on different
//! physical voices encodes identically.

pub mod extractor;
pub mod field;

pub use extractor::{ExtractedFragment, FragmentExtractor};
pub use field::{rename_fields, Field, RelativeVoice};

/// One row of a fragment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentRow {
    /// Clock offset from the start of the fragment
    pub offset: u64,
    /// Value (first row) or change (later rows) per retained field;
    /// `None` means unchanged
    pub values: Vec<Option<i64>>,
}

/// Absolute field values at a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndiffedRow {
    /// Clock offset from the start of the fragment
    pub offset: u64,
    /// Cumulative value per retained field
    pub values: Vec<i64>,
}

/// Diff-compressed, voice-normalized register activity of one note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundFragment {
    fields: Vec<Field>,
    rows: Vec<FragmentRow>,
    voices: Vec<u8>,
}

impl SoundFragment {
    /// Assemble a fragment from retained fields, rows and involved voices
    ///
    /// Rows shorter than the field list are padded with `None`.
    pub fn new(fields: Vec<Field>, mut rows: Vec<FragmentRow>, voices: Vec<u8>) -> Self {
        for row in &mut rows {
            row.values.resize(fields.len(), None);
        }
        Self {
            fields,
            rows,
            voices,
        }
    }

    /// Retained fields in column order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Rows in offset order
    pub fn rows(&self) -> &[FragmentRow] {
        &self.rows
    }

    /// Physical voices involved, primary first
    pub fn voices(&self) -> &[u8] {
        &self.voices
    }

    /// Check if a synchronized voice takes part
    pub fn is_multi_voice(&self) -> bool {
        self.voices.len() > 1
    }

    /// Column index of a field
    pub fn column(&self, field: Field) -> Option<usize> {
        self.fields.iter().position(|f| *f == field)
    }

    /// Raw cell of a row
    pub fn value(&self, row: usize, field: Field) -> Option<i64> {
        let column = self.column(field)?;
        self.rows.get(row)?.values[column]
    }

    /// Offset of the last row
    pub fn last_offset(&self) -> u64 {
        self.rows.last().map_or(0, |row| row.offset)
    }

    /// Reconstruct absolute values by accumulating every row's changes
    pub fn undiff(&self) -> Vec<UndiffedRow> {
        let mut totals = vec![0i64; self.fields.len()];
        self.rows
            .iter()
            .map(|row| {
                for (total, change) in totals.iter_mut().zip(&row.values) {
                    *total += change.unwrap_or(0);
                }
                UndiffedRow {
                    offset: row.offset,
                    values: totals.clone(),
                }
            })
            .collect()
    }
}

impl UndiffedRow {
    /// Value of a field, zero when the fragment does not retain it
    pub fn get(&self, fragment: &SoundFragment, field: Field) -> i64 {
        fragment
            .column(field)
            .map_or(0, |column| self.values[column])
    }
}

/// Compare fragments allowing row offsets to differ by up to `tolerance`
///
/// Everything else (retained fields, row count and every value) must match
/// exactly.
pub fn jitter_match(a: &SoundFragment, b: &SoundFragment, tolerance: u64) -> bool {
    a.fields == b.fields
        && a.rows.len() == b.rows.len()
        && a.rows.iter().zip(&b.rows).all(|(row_a, row_b)| {
            row_a.values == row_b.values && row_a.offset.abs_diff(row_b.offset) <= tolerance
        })
}
