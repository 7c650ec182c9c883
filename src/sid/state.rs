//! Whole-chip register state.
//!
//! `ChipState` owns the raw register file together with its decoded view
//! (three `VoiceState`s and one `MainState`). Two states with the same
//! register contents are interchangeable; `hashreg` is the canonical key.

use std::fmt::Write as _;
use std::ops::Deref;

use super::main_regs::MainState;
use super::registers::{self, RegisterOwner, MAIN_REGBASE, REGISTER_COUNT, VOICES};
use super::voice::VoiceState;
use crate::Result;

/// Change notification emitted when a write alters a register's value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChangeEvent {
    /// Register that was written
    pub register: u8,
    /// Owner, raw value and the decoded fields that changed
    pub description: String,
    /// Voice owning the register, if any
    pub voice: Option<u8>,
    /// Other half of a lo/hi pair, if any
    pub linked_register: Option<u8>,
}

/// Raw and decoded state of the whole chip
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChipState {
    registers: [u8; REGISTER_COUNT],
    voices: [VoiceState; 3],
    main: MainState,
}

impl ChipState {
    /// Power-on state (all registers zero)
    pub fn new() -> Self {
        Self {
            registers: [0; REGISTER_COUNT],
            voices: VOICES.map(VoiceState::new),
            main: MainState::default(),
        }
    }

    /// Build a state from a full register file
    pub fn from_registers(regs: &[u8; REGISTER_COUNT]) -> Self {
        let mut state = Self::new();
        for (register, value) in regs.iter().enumerate() {
            // every index below REGISTER_COUNT is mapped
            let _ = state.write(register as u8, *value);
        }
        state
    }

    /// Write a register and re-decode its owner
    ///
    /// Returns an event only when the stored value changed.
    pub fn write(&mut self, register: u8, value: u8) -> Result<Option<StateChangeEvent>> {
        let slot = registers::slot(register)?;
        let value = value & slot.op.mask();
        let previous = self.registers[register as usize];
        if previous == value {
            return Ok(None);
        }

        let before = self.describe_owner(slot.owner, slot.op);
        self.registers[register as usize] = value;
        match slot.owner {
            RegisterOwner::Voice(voice) => {
                let base = registers::voice_regbase(voice) as usize;
                let regs = &self.registers[base..base + registers::VOICE_REGISTERS as usize];
                self.voices[(voice - 1) as usize].decode(slot.op, regs);
            }
            RegisterOwner::Main => {
                let base = MAIN_REGBASE as usize;
                self.main.decode(slot.op, &self.registers[base..REGISTER_COUNT]);
            }
        }
        let after = self.describe_owner(slot.owner, slot.op);

        let mut changed: Vec<_> = after
            .iter()
            .filter(|(name, value)| !before.iter().any(|(n, v)| n == name && v == value))
            .collect();
        changed.sort();

        let mut description = match slot.owner {
            RegisterOwner::Voice(voice) => format!("voice {} {:02x} -> {:02x}", voice, value, register),
            RegisterOwner::Main => format!("main {:02x} -> {:02x}", value, register),
        };
        for (name, value) in changed {
            let _ = write!(description, " {}: {}", name, value);
        }

        Ok(Some(StateChangeEvent {
            register,
            description,
            voice: slot.voice(),
            linked_register: slot.linked_register(register),
        }))
    }

    fn describe_owner(
        &self,
        owner: RegisterOwner,
        op: registers::RegisterOp,
    ) -> Vec<(&'static str, String)> {
        match owner {
            RegisterOwner::Voice(voice) => self.voices[(voice - 1) as usize].describe(op),
            RegisterOwner::Main => self.main.describe(op),
        }
    }

    /// Canonical serialization: every register value in address order, hex-encoded
    pub fn hashreg(&self) -> String {
        self.registers.iter().fold(
            String::with_capacity(REGISTER_COUNT * 2),
            |mut out, value| {
                let _ = write!(out, "{:02x}", value);
                out
            },
        )
    }

    /// Raw register file
    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    /// Decoded voice (1-3)
    ///
    /// # Panics
    ///
    /// Panics if `voice` is not 1, 2 or 3.
    pub fn voice(&self, voice: u8) -> &VoiceState {
        &self.voices[(voice - 1) as usize]
    }

    /// All decoded voices in voice order
    pub fn voices(&self) -> &[VoiceState; 3] {
        &self.voices
    }

    /// Decoded filter/volume block
    pub fn main(&self) -> &MainState {
        &self.main
    }

    /// Voices whose effective gate is on
    pub fn gates_on(&self) -> Vec<u8> {
        self.voices
            .iter()
            .filter(|voice| voice.gate_on())
            .map(VoiceState::voice)
            .collect()
    }

    /// Voices that can be heard: main volume up and a waveform selected
    pub fn audible_voices(&self) -> Vec<u8> {
        if self.main.volume == 0 {
            return Vec::new();
        }
        self.voices
            .iter()
            .filter(|voice| voice.any_waveform())
            .map(VoiceState::voice)
            .collect()
    }
}

impl Default for ChipState {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable, shared chip state obtained from the snapshot cache
#[derive(Debug, PartialEq, Eq)]
pub struct FrozenChipState {
    hashreg: String,
    state: ChipState,
}

impl FrozenChipState {
    pub(crate) fn new(hashreg: String, state: ChipState) -> Self {
        Self { hashreg, state }
    }

    /// Canonical serialization this snapshot is keyed by
    pub fn hashreg(&self) -> &str {
        &self.hashreg
    }
}

impl Deref for FrozenChipState {
    type Target = ChipState;

    fn deref(&self) -> &ChipState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_emits_event_only_on_change() {
        let mut state = ChipState::new();
        let event = state.write(11, 0x81).unwrap().unwrap();
        assert_eq!(event.register, 11);
        assert_eq!(event.voice, Some(2));
        assert_eq!(event.linked_register, None);
        assert_eq!(event.description, "voice 2 81 -> 0b gate: 1 noise: 1");

        assert_eq!(state.write(11, 0x81).unwrap(), None);
    }

    #[test]
    fn test_frequency_event_links_pair() {
        let mut state = ChipState::new();
        let event = state.write(8, 0x80).unwrap().unwrap();
        assert_eq!(event.linked_register, Some(7));
        assert_eq!(event.description, "voice 2 80 -> 08 frequency: 8000");
        assert_eq!(state.voice(2).frequency, 0x8000);
    }

    #[test]
    fn test_main_event() {
        let mut state = ChipState::new();
        let event = state.write(24, 0x0F).unwrap().unwrap();
        assert_eq!(event.voice, None);
        assert_eq!(event.description, "main 0f -> 18 main_vol: 0f");
        assert_eq!(state.main().volume, 15);
    }

    #[test]
    fn test_unused_bits_are_ignored() {
        let mut state = ChipState::new();
        assert!(state.write(3, 0x08).unwrap().is_some());
        assert_eq!(state.write(3, 0xF8).unwrap(), None);
        assert_eq!(state.registers()[3], 0x08);
        assert_eq!(state.write(21, 0xF8).unwrap(), None);
    }

    #[test]
    fn test_invalid_register_is_error() {
        let mut state = ChipState::new();
        assert!(state.write(25, 1).is_err());
    }

    #[test]
    fn test_hashreg() {
        let mut state = ChipState::new();
        assert_eq!(state.hashreg(), "00".repeat(REGISTER_COUNT));
        state.write(0, 0xAB).unwrap();
        assert!(state.hashreg().starts_with("ab00"));
        assert_eq!(state.hashreg().len(), REGISTER_COUNT * 2);
    }

    #[test]
    fn test_from_registers_matches_writes() {
        let mut regs = [0u8; REGISTER_COUNT];
        regs[4] = 0x11;
        regs[24] = 0x0F;
        let state = ChipState::from_registers(&regs);
        assert_eq!(state.gates_on(), vec![1]);
        assert_eq!(state.audible_voices(), vec![1]);
        assert_eq!(state.registers(), &regs);
    }

    #[test]
    #[should_panic]
    fn test_voice_out_of_range_panics() {
        ChipState::new().voice(4);
    }
}
