//! Filter and volume block (registers 0x15-0x18).

use super::flags::{nibbles, FilterMode, FilterRoute};
use super::registers::RegisterOp;

/// Decoded state of the filter/volume registers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MainState {
    /// Filter cutoff (11-bit)
    pub filter_cutoff: u16,
    /// Filter resonance (0-15)
    pub resonance: u8,
    /// Which voices (and the external input) go through the filter
    pub route: FilterRoute,
    /// Low/band/high-pass selection and voice 3 mute
    pub mode: FilterMode,
    /// Main volume (0-15)
    pub volume: u8,
}

/// Tracked fields of the filter/volume block shared by all voices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MainField {
    /// Main volume
    Volume,
    /// Low-pass enabled
    LowPass,
    /// Band-pass enabled
    BandPass,
    /// High-pass enabled
    HighPass,
    /// External input filtered
    External,
    /// Resonance
    Resonance,
    /// Cutoff
    Cutoff,
    /// Voice 3 muted
    MuteVoice3,
}

impl MainField {
    /// All fields in canonical order
    pub const ALL: [MainField; 8] = [
        MainField::Volume,
        MainField::LowPass,
        MainField::BandPass,
        MainField::HighPass,
        MainField::External,
        MainField::Resonance,
        MainField::Cutoff,
        MainField::MuteVoice3,
    ];

    /// Column name
    pub fn name(&self) -> &'static str {
        match self {
            MainField::Volume => "vol",
            MainField::LowPass => "fltlo",
            MainField::BandPass => "fltband",
            MainField::HighPass => "flthi",
            MainField::External => "fltext",
            MainField::Resonance => "fltres",
            MainField::Cutoff => "fltcoff",
            MainField::MuteVoice3 => "mute3",
        }
    }

    /// Parse a column name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.name() == name)
    }

    /// Filter configuration fields (meaningless when no voice is filtered)
    pub fn is_filter(&self) -> bool {
        !matches!(self, MainField::Volume | MainField::MuteVoice3)
    }
}

fn flag(value: bool) -> i64 {
    i64::from(value)
}

impl MainState {
    /// Re-decode the fields owned by `op` from the four main registers
    pub(crate) fn decode(&mut self, op: RegisterOp, regs: &[u8]) {
        match op {
            RegisterOp::CutoffLo | RegisterOp::CutoffHi => {
                self.filter_cutoff = (u16::from(regs[1]) << 3) | u16::from(regs[0] & 0x07);
            }
            RegisterOp::ResonanceRoute => {
                let (route, resonance) = nibbles(regs[2]);
                self.resonance = resonance;
                self.route = FilterRoute::from_bits_truncate(route);
            }
            RegisterOp::ModeVolume => {
                let (volume, mode) = nibbles(regs[3]);
                self.volume = volume;
                self.mode = FilterMode::from_bits_truncate(mode);
            }
            _ => {}
        }
    }

    /// Human-readable decoded fields affected by `op`
    pub(crate) fn describe(&self, op: RegisterOp) -> Vec<(&'static str, String)> {
        match op {
            RegisterOp::CutoffLo | RegisterOp::CutoffHi => {
                vec![("filter_cutoff", format!("{:02x}", self.filter_cutoff))]
            }
            RegisterOp::ResonanceRoute => vec![
                ("filter_res", format!("{:02x}", self.resonance)),
                ("filter_voice1", flag(self.route.contains(FilterRoute::VOICE1)).to_string()),
                ("filter_voice2", flag(self.route.contains(FilterRoute::VOICE2)).to_string()),
                ("filter_voice3", flag(self.route.contains(FilterRoute::VOICE3)).to_string()),
                ("filter_external", flag(self.route.contains(FilterRoute::EXTERNAL)).to_string()),
            ],
            RegisterOp::ModeVolume => vec![
                ("main_vol", format!("{:02x}", self.volume)),
                ("filter_low", flag(self.mode.contains(FilterMode::LOW_PASS)).to_string()),
                ("filter_band", flag(self.mode.contains(FilterMode::BAND_PASS)).to_string()),
                ("filter_high", flag(self.mode.contains(FilterMode::HIGH_PASS)).to_string()),
                ("mute_voice3", flag(self.mode.contains(FilterMode::MUTE_VOICE3)).to_string()),
            ],
            _ => Vec::new(),
        }
    }

    /// Check if a voice (1-3) is routed through the filter
    pub fn filters_voice(&self, voice: u8) -> bool {
        self.route.contains(FilterRoute::for_voice(voice))
    }

    /// Check if voice 3 is disconnected from the output
    pub fn mute_voice3(&self) -> bool {
        self.mode.contains(FilterMode::MUTE_VOICE3)
    }

    /// Numeric value of a shared field
    pub fn field(&self, field: MainField) -> i64 {
        match field {
            MainField::Volume => i64::from(self.volume),
            MainField::LowPass => flag(self.mode.contains(FilterMode::LOW_PASS)),
            MainField::BandPass => flag(self.mode.contains(FilterMode::BAND_PASS)),
            MainField::HighPass => flag(self.mode.contains(FilterMode::HIGH_PASS)),
            MainField::External => flag(self.route.contains(FilterRoute::EXTERNAL)),
            MainField::Resonance => i64::from(self.resonance),
            MainField::Cutoff => i64::from(self.filter_cutoff),
            MainField::MuteVoice3 => flag(self.mute_voice3()),
        }
    }

    /// Filter routing of one voice as a field value
    pub fn voice_route(&self, voice: u8) -> i64 {
        flag(self.filters_voice(voice))
    }
}
