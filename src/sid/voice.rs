//! Per-voice decoded state.
//!
//! A voice owns seven consecutive registers. Every write re-decodes the
//! affected fields from the raw register bytes, so the decoded view is
//! always consistent with the register file.

use super::flags::{nibbles, ControlFlags};
use super::registers::RegisterOp;

/// Decoded state of one SID voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceState {
    voice: u8,
    /// Oscillator frequency (16-bit)
    pub frequency: u16,
    /// Pulse width (12-bit)
    pub pulse_width: u16,
    /// Gate, sync, ring, test and waveform bits
    pub control: ControlFlags,
    /// Attack rate (0-15)
    pub attack: u8,
    /// Decay rate (0-15)
    pub decay: u8,
    /// Sustain level (0-15)
    pub sustain: u8,
    /// Release rate (0-15)
    pub release: u8,
}

/// Tracked per-voice fields, in canonical column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VoiceField {
    /// Oscillator frequency
    Frequency,
    /// Pulse width
    PulseWidth,
    /// Gate bit
    Gate,
    /// Sync bit
    Sync,
    /// Ring modulation bit
    Ring,
    /// Test bit
    Test,
    /// Triangle waveform
    Triangle,
    /// Sawtooth waveform
    Sawtooth,
    /// Pulse waveform
    Pulse,
    /// Noise waveform
    Noise,
    /// Attack nibble
    Attack,
    /// Decay nibble
    Decay,
    /// Sustain nibble
    Sustain,
    /// Release nibble
    Release,
    /// Voice routed through the filter
    Filter,
}

impl VoiceField {
    /// All fields in canonical order
    pub const ALL: [VoiceField; 15] = [
        VoiceField::Frequency,
        VoiceField::PulseWidth,
        VoiceField::Gate,
        VoiceField::Sync,
        VoiceField::Ring,
        VoiceField::Test,
        VoiceField::Triangle,
        VoiceField::Sawtooth,
        VoiceField::Pulse,
        VoiceField::Noise,
        VoiceField::Attack,
        VoiceField::Decay,
        VoiceField::Sustain,
        VoiceField::Release,
        VoiceField::Filter,
    ];

    /// Column name prefix (voice number is appended)
    pub fn name(&self) -> &'static str {
        match self {
            VoiceField::Frequency => "freq",
            VoiceField::PulseWidth => "pwduty",
            VoiceField::Gate => "gate",
            VoiceField::Sync => "sync",
            VoiceField::Ring => "ring",
            VoiceField::Test => "test",
            VoiceField::Triangle => "tri",
            VoiceField::Sawtooth => "saw",
            VoiceField::Pulse => "pulse",
            VoiceField::Noise => "noise",
            VoiceField::Attack => "atk",
            VoiceField::Decay => "dec",
            VoiceField::Sustain => "sus",
            VoiceField::Release => "rel",
            VoiceField::Filter => "flt",
        }
    }

    /// Parse a column name prefix
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.name() == name)
    }

    /// Waveform fields
    pub fn is_waveform(&self) -> bool {
        matches!(
            self,
            VoiceField::Triangle | VoiceField::Sawtooth | VoiceField::Pulse | VoiceField::Noise
        )
    }
}

fn bit(flags: ControlFlags, flag: ControlFlags) -> i64 {
    i64::from(flags.contains(flag))
}

impl VoiceState {
    /// Create a silent voice (all registers zero)
    pub fn new(voice: u8) -> Self {
        Self {
            voice,
            frequency: 0,
            pulse_width: 0,
            control: ControlFlags::empty(),
            attack: 0,
            decay: 0,
            sustain: 0,
            release: 0,
        }
    }

    /// Voice number (1-3)
    pub fn voice(&self) -> u8 {
        self.voice
    }

    /// Re-decode the fields owned by `op` from this voice's seven registers
    pub(crate) fn decode(&mut self, op: RegisterOp, regs: &[u8]) {
        match op {
            RegisterOp::FrequencyLo | RegisterOp::FrequencyHi => {
                self.frequency = u16::from_le_bytes([regs[0], regs[1]]);
            }
            RegisterOp::PulseWidthLo | RegisterOp::PulseWidthHi => {
                self.pulse_width = u16::from_le_bytes([regs[2], regs[3]]) & 0x0FFF;
            }
            RegisterOp::Control => {
                self.control = ControlFlags::from_register(regs[4]);
            }
            RegisterOp::AttackDecay => {
                (self.decay, self.attack) = nibbles(regs[5]);
            }
            RegisterOp::SustainRelease => {
                (self.release, self.sustain) = nibbles(regs[6]);
            }
            _ => {}
        }
    }

    /// Human-readable decoded fields affected by `op`
    pub(crate) fn describe(&self, op: RegisterOp) -> Vec<(&'static str, String)> {
        match op {
            RegisterOp::FrequencyLo | RegisterOp::FrequencyHi => {
                vec![("frequency", format!("{:02x}", self.frequency))]
            }
            RegisterOp::PulseWidthLo | RegisterOp::PulseWidthHi => {
                vec![("pw_duty", format!("{:02x}", self.pulse_width))]
            }
            RegisterOp::Control => [
                ("gate", ControlFlags::GATE),
                ("sync", ControlFlags::SYNC),
                ("ring", ControlFlags::RING),
                ("test", ControlFlags::TEST),
                ("triangle", ControlFlags::TRIANGLE),
                ("sawtooth", ControlFlags::SAWTOOTH),
                ("pulse", ControlFlags::PULSE),
                ("noise", ControlFlags::NOISE),
            ]
            .into_iter()
            .map(|(name, flag)| (name, bit(self.control, flag).to_string()))
            .collect(),
            RegisterOp::AttackDecay => vec![
                ("decay", format!("{:02x}", self.decay)),
                ("attack", format!("{:02x}", self.attack)),
            ],
            RegisterOp::SustainRelease => vec![
                ("release", format!("{:02x}", self.release)),
                ("sustain", format!("{:02x}", self.sustain)),
            ],
            _ => Vec::new(),
        }
    }

    /// Gate bit as written
    pub fn gate(&self) -> bool {
        self.control.contains(ControlFlags::GATE)
    }

    /// Test bit as written
    pub fn test(&self) -> bool {
        self.control.contains(ControlFlags::TEST)
    }

    /// Effective gate: the test bit is a hard-restart override that
    /// suppresses the gate regardless of its own bit
    pub fn gate_on(&self) -> bool {
        self.gate() && !self.test()
    }

    /// Selected waveforms only
    pub fn waveforms(&self) -> ControlFlags {
        self.control & ControlFlags::WAVEFORMS
    }

    /// Check if any waveform is selected
    pub fn any_waveform(&self) -> bool {
        self.control.any_waveform()
    }

    /// Gate effectively on with an oscillator selected
    pub fn sounding(&self) -> bool {
        self.gate_on() && self.any_waveform()
    }

    /// Voice whose oscillator drives this voice's sync and ring modulation
    ///
    /// Voice 1 is modulated by voice 3, voice 2 by voice 1, voice 3 by voice 2.
    pub fn sync_source(&self) -> u8 {
        ((self.voice + 1) % 3) + 1
    }

    /// Modulating voice, if sync or ring is enabled
    pub fn synced_voice(&self) -> Option<u8> {
        self.control.is_modulated().then(|| self.sync_source())
    }

    /// Numeric value of a tracked field (`Filter` is owned by the main block)
    pub fn field(&self, field: VoiceField) -> i64 {
        match field {
            VoiceField::Frequency => i64::from(self.frequency),
            VoiceField::PulseWidth => i64::from(self.pulse_width),
            VoiceField::Gate => bit(self.control, ControlFlags::GATE),
            VoiceField::Sync => bit(self.control, ControlFlags::SYNC),
            VoiceField::Ring => bit(self.control, ControlFlags::RING),
            VoiceField::Test => bit(self.control, ControlFlags::TEST),
            VoiceField::Triangle => bit(self.control, ControlFlags::TRIANGLE),
            VoiceField::Sawtooth => bit(self.control, ControlFlags::SAWTOOTH),
            VoiceField::Pulse => bit(self.control, ControlFlags::PULSE),
            VoiceField::Noise => bit(self.control, ControlFlags::NOISE),
            VoiceField::Attack => i64::from(self.attack),
            VoiceField::Decay => i64::from(self.decay),
            VoiceField::Sustain => i64::from(self.sustain),
            VoiceField::Release => i64::from(self.release),
            VoiceField::Filter => 0,
        }
    }
}
