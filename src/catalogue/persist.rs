//! CSV tables for patches and fragment events.
//!
//! Patch tables have the columns `hash_id,occurrence_count,<fields>,clock`
//! with one line per fragment row; an empty cell means no change. The event
//! index maps every extracted fragment to its patch: `first_clock,hash_id,voicenum`.

use std::io::{Read, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Arity, Patch};
use crate::fragment::{Field, FragmentRow, SoundFragment};
use crate::{Result, SidError};

/// One occurrence of a patch in the trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FragmentEvent {
    /// Absolute clock of the gate rising edge
    pub first_clock: u64,
    /// Patch the fragment was interned as
    pub hash_id: u64,
    /// Physical voice (1-3)
    pub voicenum: u8,
}

/// Write a patch table, most frequent patches first
pub fn write_patches<W: Write>(writer: W, patches: &[Patch]) -> Result<()> {
    let mut columns: Vec<Field> = Vec::new();
    for patch in patches {
        for field in patch.fragment.fields() {
            if !columns.contains(field) {
                columns.push(*field);
            }
        }
    }
    columns.sort_by_key(Field::sort_key);

    let mut csv = csv::Writer::from_writer(writer);
    let mut header = vec!["hash_id".to_string(), "occurrence_count".to_string()];
    header.extend(columns.iter().map(Field::name));
    header.push("clock".to_string());
    csv.write_record(&header)?;

    for patch in patches {
        let fragment = &patch.fragment;
        let lookup: Vec<Option<usize>> = columns.iter().map(|f| fragment.column(*f)).collect();
        for row in fragment.rows() {
            let mut record = vec![patch.hash_id.to_string(), patch.occurrence_count.to_string()];
            record.extend(lookup.iter().map(|column| {
                column
                    .and_then(|c| row.values[c])
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            }));
            record.push(row.offset.to_string());
            csv.write_record(&record)?;
        }
    }
    csv.flush()?;
    Ok(())
}

fn parse_cell<T: std::str::FromStr>(record: &csv::StringRecord, index: usize) -> Result<Option<T>> {
    let cell = record.get(index).unwrap_or("").trim();
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse().map(Some).map_err(|_| SidError::Parse {
        line: record.position().map_or(0, |p| p.line() as usize),
        content: cell.to_string(),
        reason: format!("column {} is not an integer", index + 1),
    })
}

fn required<T: std::str::FromStr>(record: &csv::StringRecord, index: usize) -> Result<T> {
    parse_cell(record, index)?.ok_or_else(|| SidError::Parse {
        line: record.position().map_or(0, |p| p.line() as usize),
        content: record.iter().collect::<Vec<_>>().join(","),
        reason: format!("column {} is empty", index + 1),
    })
}

/// Read a patch table written by [`write_patches`]
///
/// A patch retains exactly the columns set in its first row.
pub fn read_patches<R: Read>(reader: R, arity: Arity) -> Result<Vec<Patch>> {
    let mut csv = csv::Reader::from_reader(reader);
    let headers = csv.headers()?.clone();
    if headers.len() < 3
        || &headers[0] != "hash_id"
        || &headers[1] != "occurrence_count"
        || &headers[headers.len() - 1] != "clock"
    {
        return Err(SidError::Parse {
            line: 1,
            content: headers.iter().collect::<Vec<_>>().join(","),
            reason: "not a patch table".to_string(),
        });
    }
    let clock_index = headers.len() - 1;
    let columns = (2..clock_index)
        .map(|index| {
            Field::parse(&headers[index]).ok_or_else(|| SidError::Parse {
                line: 1,
                content: headers[index].to_string(),
                reason: "unknown field".to_string(),
            })
        })
        .collect::<Result<Vec<Field>>>()?;

    // (hash_id, count, rows) in table order
    let mut groups: Vec<(u64, u64, Vec<(u64, Vec<Option<i64>>)>)> = Vec::new();
    for record in csv.records() {
        let record = record?;
        let hash_id: u64 = required(&record, 0)?;
        let count: u64 = required(&record, 1)?;
        let offset: u64 = required(&record, clock_index)?;
        let values = (2..clock_index)
            .map(|index| parse_cell(&record, index))
            .collect::<Result<Vec<Option<i64>>>>()?;
        match groups.last_mut() {
            Some((id, _, rows)) if *id == hash_id => rows.push((offset, values)),
            _ => groups.push((hash_id, count, vec![(offset, values)])),
        }
    }

    Ok(groups
        .into_iter()
        .map(|(hash_id, occurrence_count, rows)| {
            let keep: Vec<usize> = rows
                .first()
                .map(|(_, first)| (0..columns.len()).filter(|&c| first[c].is_some()).collect())
                .unwrap_or_default();
            let fields = keep.iter().map(|&c| columns[c]).collect();
            let rows = rows
                .into_iter()
                .map(|(offset, values)| FragmentRow {
                    offset,
                    values: keep.iter().map(|&c| values[c]).collect(),
                })
                .collect();
            Patch {
                hash_id,
                fragment: Arc::new(SoundFragment::new(fields, rows, arity.voices())),
                occurrence_count,
            }
        })
        .collect())
}

/// Write the fragment event index
pub fn write_events<W: Write>(writer: W, events: &[FragmentEvent]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for event in events {
        csv.serialize(event)?;
    }
    csv.flush()?;
    Ok(())
}

/// Read a fragment event index
pub fn read_events<R: Read>(reader: R) -> Result<Vec<FragmentEvent>> {
    csv::Reader::from_reader(reader)
        .deserialize()
        .map(|event| event.map_err(SidError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;
    use crate::catalogue::tests::fragment;
    use crate::catalogue::{content_hash, PatchCatalogue};

    #[test]
    fn test_patch_table_layout() {
        let catalogue = PatchCatalogue::new();
        let hash_id = catalogue.intern(&fragment(1024, vec![1]));
        let mut out = Vec::new();
        write_patches(&mut out, &catalogue.patches(Arity::Single)).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "hash_id,occurrence_count,freq1,gate1,tri1,clock");
        assert_eq!(lines[1], format!("{},1,1024,1,1,0", hash_id));
        assert_eq!(lines[2], format!("{},1,,-1,,19705", hash_id));
    }

    #[test]
    fn test_patch_table_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.multi_ssf.csv");
        let catalogue = PatchCatalogue::new();
        catalogue.intern(&fragment(1024, vec![2, 1]));
        catalogue.intern(&fragment(1024, vec![2, 1]));
        catalogue.intern(&fragment(300, vec![3, 2]));
        let written = catalogue.patches(Arity::Multi);
        write_patches(File::create(&path).unwrap(), &written).unwrap();

        let read = read_patches(File::open(&path).unwrap(), Arity::Multi).unwrap();
        assert_eq!(read.len(), 2);
        for (a, b) in written.iter().zip(&read) {
            assert_eq!(a.hash_id, b.hash_id);
            assert_eq!(a.occurrence_count, b.occurrence_count);
            assert_eq!(a.fragment.fields(), b.fragment.fields());
            assert_eq!(a.fragment.rows(), b.fragment.rows());
            assert_eq!(content_hash(&b.fragment), b.hash_id);
        }
        assert_eq!(read[0].occurrence_count, 2);
    }

    #[test]
    fn test_events_round_trip() {
        let events = vec![
            FragmentEvent {
                first_clock: 103,
                hash_id: u64::MAX,
                voicenum: 2,
            },
            FragmentEvent {
                first_clock: 40_000,
                hash_id: 7,
                voicenum: 1,
            },
        ];
        let mut out = Vec::new();
        write_events(&mut out, &events).unwrap();
        assert!(String::from_utf8_lossy(&out).starts_with("first_clock,hash_id,voicenum\n"));
        assert_eq!(read_events(out.as_slice()).unwrap(), events);
    }

    #[test]
    fn test_rejects_foreign_table() {
        let result = read_patches("a,b,c\n1,2,3\n".as_bytes(), Arity::Single);
        assert!(matches!(result, Err(SidError::Parse { .. })));
    }
}
