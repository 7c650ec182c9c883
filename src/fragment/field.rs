//! Fragment column naming and voice normalization.

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::ToPrimitive as _;

use crate::sid::{ChipState, MainField, VoiceField};

/// Canonical role of a voice inside a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum RelativeVoice {
    /// Voice the fragment was extracted for
    Primary = 1,
    /// Voice modulating the primary through sync or ring
    Synchronized = 3,
}

impl RelativeVoice {
    /// Role of a physical voice relative to the fragment's primary voice
    pub fn of(voice: u8, primary: u8) -> Self {
        if voice == primary {
            RelativeVoice::Primary
        } else {
            RelativeVoice::Synchronized
        }
    }

    /// Voice number used in column names
    pub fn number(self) -> u8 {
        self.to_u8().unwrap_or(1)
    }
}

/// One tracked column of a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Per-voice field with its voice number
    Voice(VoiceField, u8),
    /// Shared filter/volume field
    Main(MainField),
}

impl Field {
    /// Column name, e.g. `freq1` or `fltcoff`
    pub fn name(&self) -> String {
        match self {
            Field::Voice(field, voice) => format!("{}{}", field.name(), voice),
            Field::Main(field) => field.name().to_string(),
        }
    }

    /// Parse a column name
    pub fn parse(name: &str) -> Option<Self> {
        if let Some(field) = MainField::from_name(name) {
            return Some(Field::Main(field));
        }
        let split = name.len().checked_sub(1)?;
        let (prefix, digit) = name.split_at(split);
        let voice: u8 = digit.parse().ok()?;
        VoiceField::from_name(prefix).map(|field| Field::Voice(field, voice))
    }

    /// Field value in a chip state
    ///
    /// Per-voice filter routing lives in the shared resonance/route register.
    pub fn value(&self, state: &ChipState) -> i64 {
        match *self {
            Field::Voice(VoiceField::Filter, voice) => state.main().voice_route(voice),
            Field::Voice(field, voice) => state.voice(voice).field(field),
            Field::Main(field) => state.main().field(field),
        }
    }

    /// Voice number of a per-voice field
    pub fn voice(&self) -> Option<u8> {
        match self {
            Field::Voice(_, voice) => Some(*voice),
            Field::Main(_) => None,
        }
    }

    /// Filter-related column (routing, mode, resonance or cutoff)
    pub fn is_filter(&self) -> bool {
        match self {
            Field::Voice(field, _) => *field == VoiceField::Filter,
            Field::Main(field) => field.is_filter(),
        }
    }

    /// Sort key giving the canonical column order: voice blocks by number,
    /// then shared fields
    pub fn sort_key(&self) -> (u8, u8) {
        match self {
            Field::Voice(field, voice) => (*voice, *field as u8),
            Field::Main(field) => (u8::MAX, *field as u8),
        }
    }

    /// All fields tracked for a voice set, in column order
    pub fn tracked(voices: &[u8]) -> Vec<Field> {
        voices
            .iter()
            .flat_map(|&voice| VoiceField::ALL.iter().map(move |&field| Field::Voice(field, voice)))
            .chain(MainField::ALL.iter().map(|&field| Field::Main(field)))
            .collect()
    }
}

/// Rename per-voice fields to relative voice numbers
pub fn rename_fields(fields: &[Field], primary: u8) -> Vec<Field> {
    fields
        .iter()
        .map(|field| match *field {
            Field::Voice(name, voice) => Field::Voice(name, RelativeVoice::of(voice, primary).number()),
            main => main,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for name in ["freq1", "pwduty3", "flt2", "vol", "fltcoff", "mute3"] {
            let field = Field::parse(name).unwrap();
            assert_eq!(field.name(), name);
        }
        assert_eq!(Field::parse("mute3"), Some(Field::Main(MainField::MuteVoice3)));
        assert_eq!(Field::parse("freq"), None);
        assert_eq!(Field::parse("bogus1"), None);
        assert_eq!(Field::parse(""), None);
    }

    #[test]
    fn test_rename_fields() {
        let fields = vec![
            Field::Voice(VoiceField::Frequency, 2),
            Field::Voice(VoiceField::Frequency, 1),
            Field::Main(MainField::Volume),
        ];
        let renamed = rename_fields(&fields, 2);
        let names: Vec<String> = renamed.iter().map(Field::name).collect();
        assert_eq!(names, ["freq1", "freq3", "vol"]);
    }

    #[test]
    fn test_tracked_order() {
        let fields = Field::tracked(&[2, 1]);
        assert_eq!(fields.len(), 15 * 2 + 8);
        assert_eq!(fields[0].name(), "freq2");
        assert_eq!(fields[14].name(), "flt2");
        assert_eq!(fields[15].name(), "freq1");
        assert_eq!(fields[30].name(), "vol");
    }

    #[test]
    fn test_filter_route_value() {
        let mut state = ChipState::new();
        state.write(23, 0x02).unwrap();
        assert_eq!(Field::Voice(VoiceField::Filter, 2).value(&state), 1);
        assert_eq!(Field::Voice(VoiceField::Filter, 1).value(&state), 0);
    }
}
