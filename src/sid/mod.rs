//! SID Chip Model
//!
//! Register map, decoded voice and filter state, change events, the
//! register decoder and the snapshot cache.

pub mod cache;
pub mod clock;
pub mod decoder;
pub mod flags;
pub mod main_regs;
pub mod registers;
pub mod state;
pub mod voice;

pub use cache::SnapshotCache;
pub use clock::ClockRate;
pub use decoder::RegisterDecoder;
pub use flags::{ControlFlags, FilterMode, FilterRoute};
pub use main_regs::{MainField, MainState};
pub use registers::{RegisterOp, RegisterOwner, RegisterSlot, REGISTER_COUNT, VOICES};
pub use state::{ChipState, FrozenChipState, StateChangeEvent};
pub use voice::{VoiceField, VoiceState};

use crate::{Result, SidError};

/// Validate a voice number (1-3)
pub fn check_voice(voice: u8) -> Result<u8> {
    if VOICES.contains(&voice) {
        Ok(voice)
    } else {
        Err(SidError::InvalidVoice(voice))
    }
}
