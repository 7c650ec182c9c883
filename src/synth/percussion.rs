//! Percussion classification.

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::ToPrimitive as _;

/// General MIDI percussion sounds a fragment can be classified as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum DrumKind {
    /// Bass drum
    BassDrum = 36,
    /// Acoustic snare
    AcousticSnare = 38,
    /// Electric snare
    ElectricSnare = 40,
    /// Closed hi-hat
    ClosedHihat = 42,
    /// Pedal hi-hat
    PedalHihat = 44,
    /// Low tom
    LowTom = 45,
    /// Open hi-hat
    OpenHihat = 46,
    /// Crash cymbal
    CrashCymbal = 49,
}

/// Noise-only sounds by increasing length
const NOISE_LADDER: [DrumKind; 5] = [
    DrumKind::PedalHihat,
    DrumKind::ClosedHihat,
    DrumKind::OpenHihat,
    DrumKind::AcousticSnare,
    DrumKind::CrashCymbal,
];

impl DrumKind {
    /// General MIDI note number on the percussion channel
    pub fn gm_note(self) -> u8 {
        self.to_u8().unwrap_or(DrumKind::BassDrum as u8)
    }

    /// Pick a noise-only sound by duration
    ///
    /// The first rung covers one frame; every further rung doubles the
    /// threshold. Anything longer than the last threshold is a crash.
    pub fn for_noise_duration(duration: u64, frame_cycles: u64) -> Self {
        let mut threshold = frame_cycles;
        for drum in NOISE_LADDER {
            if duration <= threshold {
                return drum;
            }
            threshold = threshold.saturating_mul(2);
        }
        DrumKind::CrashCymbal
    }
}
