//! Pitch mapping and envelope release timing.

use crate::sid::ClockRate;

/// Release time in milliseconds per release nibble
pub const RELEASE_MS: [u32; 16] = [
    6, 24, 48, 72, 114, 168, 204, 240, 300, 750, 1500, 2400, 3000, 9000, 15000, 24000,
];

/// Tempered note number (A4 = 69) of a frequency register value
///
/// Returns `None` for a stopped oscillator.
pub fn midi_pitch(frequency: u16, rate: ClockRate) -> Option<u8> {
    let hz = rate.frequency_hz(frequency);
    if hz <= 0.0 {
        return None;
    }
    let pitch = (69.0 + 12.0 * (hz / 440.0).log2()).round();
    Some(pitch.clamp(0.0, 127.0) as u8)
}

/// Clock cycles for the envelope to fall from sustain to silence
pub fn release_cycles(release: i64, rate: ClockRate) -> u64 {
    let index = release.clamp(0, 15) as usize;
    rate.ms_to_cycles(RELEASE_MS[index])
}
