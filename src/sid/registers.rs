//! SID Register Map
//!
//! Fixed dispatch table from register address to its owner and decode
//! operation.
//!
//! - 0x00-0x06: Voice 1 (freq lo/hi, pw lo/hi, control, AD, SR)
//! - 0x07-0x0D: Voice 2
//! - 0x0E-0x14: Voice 3
//! - 0x15-0x16: Filter cutoff (lo 3 bits, hi 8 bits)
//! - 0x17: Resonance (hi nibble) / filter routing (lo nibble)
//! - 0x18: Filter mode and voice 3 mute (hi nibble) / volume (lo nibble)

use crate::{Result, SidError};

/// Number of writable registers
pub const REGISTER_COUNT: usize = 25;

/// Registers per voice
pub const VOICE_REGISTERS: u8 = 7;

/// First register of the filter/main block
pub const MAIN_REGBASE: u8 = 21;

/// Voice numbers in address order
pub const VOICES: [u8; 3] = [1, 2, 3];

/// Decode operation attached to a register address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterOp {
    /// Oscillator frequency, low byte
    FrequencyLo,
    /// Oscillator frequency, high byte
    FrequencyHi,
    /// Pulse width, low byte
    PulseWidthLo,
    /// Pulse width, high nibble
    PulseWidthHi,
    /// Gate/sync/ring/test and waveform bits
    Control,
    /// Attack (hi nibble) / decay (lo nibble)
    AttackDecay,
    /// Sustain (hi nibble) / release (lo nibble)
    SustainRelease,
    /// Filter cutoff, low 3 bits
    CutoffLo,
    /// Filter cutoff, high 8 bits
    CutoffHi,
    /// Resonance and filter routing
    ResonanceRoute,
    /// Filter mode and main volume
    ModeVolume,
}

/// Which part of the chip state a register belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterOwner {
    /// One of the three voices (1-3)
    Voice(u8),
    /// Filter and volume block
    Main,
}

/// Entry of the register dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterSlot {
    /// Owning state block
    pub owner: RegisterOwner,
    /// Decode operation
    pub op: RegisterOp,
}

const fn voice_slot(voice: u8, op: RegisterOp) -> RegisterSlot {
    RegisterSlot {
        owner: RegisterOwner::Voice(voice),
        op,
    }
}

const fn main_slot(op: RegisterOp) -> RegisterSlot {
    RegisterSlot {
        owner: RegisterOwner::Main,
        op,
    }
}

macro_rules! voice_block {
    ($voice:expr) => {
        [
            voice_slot($voice, RegisterOp::FrequencyLo),
            voice_slot($voice, RegisterOp::FrequencyHi),
            voice_slot($voice, RegisterOp::PulseWidthLo),
            voice_slot($voice, RegisterOp::PulseWidthHi),
            voice_slot($voice, RegisterOp::Control),
            voice_slot($voice, RegisterOp::AttackDecay),
            voice_slot($voice, RegisterOp::SustainRelease),
        ]
    };
}

const VOICE1: [RegisterSlot; 7] = voice_block!(1);
const VOICE2: [RegisterSlot; 7] = voice_block!(2);
const VOICE3: [RegisterSlot; 7] = voice_block!(3);

/// Register address to slot, in address order
pub const REGISTER_MAP: [RegisterSlot; REGISTER_COUNT] = [
    VOICE1[0],
    VOICE1[1],
    VOICE1[2],
    VOICE1[3],
    VOICE1[4],
    VOICE1[5],
    VOICE1[6],
    VOICE2[0],
    VOICE2[1],
    VOICE2[2],
    VOICE2[3],
    VOICE2[4],
    VOICE2[5],
    VOICE2[6],
    VOICE3[0],
    VOICE3[1],
    VOICE3[2],
    VOICE3[3],
    VOICE3[4],
    VOICE3[5],
    VOICE3[6],
    main_slot(RegisterOp::CutoffLo),
    main_slot(RegisterOp::CutoffHi),
    main_slot(RegisterOp::ResonanceRoute),
    main_slot(RegisterOp::ModeVolume),
];

/// Look up the slot for a register address
pub fn slot(register: u8) -> Result<RegisterSlot> {
    REGISTER_MAP
        .get(register as usize)
        .copied()
        .ok_or(SidError::InvalidRegister(register))
}

/// First register address owned by a voice (1-3)
pub fn voice_regbase(voice: u8) -> u8 {
    (voice - 1) * VOICE_REGISTERS
}

impl RegisterOp {
    /// Bits of the register byte the chip actually uses
    pub fn mask(&self) -> u8 {
        match self {
            RegisterOp::PulseWidthHi => 0x0F,
            RegisterOp::CutoffLo => 0x07,
            _ => 0xFF,
        }
    }
}

impl RegisterSlot {
    /// The other half of a lo/hi register pair, if any
    pub fn linked_register(&self, register: u8) -> Option<u8> {
        match self.op {
            RegisterOp::FrequencyLo | RegisterOp::PulseWidthLo | RegisterOp::CutoffLo => {
                Some(register + 1)
            }
            RegisterOp::FrequencyHi | RegisterOp::PulseWidthHi | RegisterOp::CutoffHi => {
                Some(register - 1)
            }
            _ => None,
        }
    }

    /// Voice number for voice-owned registers
    pub fn voice(&self) -> Option<u8> {
        match self.owner {
            RegisterOwner::Voice(voice) => Some(voice),
            RegisterOwner::Main => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_register_has_one_owner() {
        let mut voice_counts = [0usize; 3];
        let mut main_count = 0;
        for register in 0..REGISTER_COUNT as u8 {
            match slot(register).unwrap().owner {
                RegisterOwner::Voice(v) => voice_counts[(v - 1) as usize] += 1,
                RegisterOwner::Main => main_count += 1,
            }
        }
        assert_eq!(voice_counts, [7, 7, 7]);
        assert_eq!(main_count, 4);
    }

    #[test]
    fn test_voice_layout() {
        assert_eq!(slot(11).unwrap(), voice_slot(2, RegisterOp::Control));
        assert_eq!(slot(13).unwrap(), voice_slot(2, RegisterOp::SustainRelease));
        assert_eq!(slot(24).unwrap(), main_slot(RegisterOp::ModeVolume));
        assert_eq!(voice_regbase(3), 14);
    }

    #[test]
    fn test_invalid_register() {
        assert!(matches!(slot(25), Err(SidError::InvalidRegister(25))));
    }

    #[test]
    fn test_linked_registers() {
        let lo = slot(7).unwrap();
        assert_eq!(lo.linked_register(7), Some(8));
        let hi = slot(22).unwrap();
        assert_eq!(hi.linked_register(22), Some(21));
        assert_eq!(slot(11).unwrap().linked_register(11), None);
    }
}
