//! Frame quantization
//!
//! Buckets chip clocks into display frames (the VBL period the player
//! routine usually runs at). Frames are the coarse time unit used for
//! fragment row offsets and note durations.

use crate::sid::ClockRate;

/// Frame quantizer for a clock rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameClock {
    /// Clock cycles per frame
    frame_cycles: u64,
}

impl FrameClock {
    /// Create a quantizer for a clock rate
    pub fn new(rate: ClockRate) -> Self {
        Self::with_frame_cycles(rate.frame_cycles())
    }

    /// Create a quantizer with an explicit frame length
    pub fn with_frame_cycles(frame_cycles: u64) -> Self {
        FrameClock {
            frame_cycles: frame_cycles.max(1),
        }
    }

    /// Clock cycles per frame
    pub fn frame_cycles(&self) -> u64 {
        self.frame_cycles
    }

    /// Frame a clock falls into
    pub fn frame_of(&self, clock: u64) -> u64 {
        clock / self.frame_cycles
    }

    /// First clock of a frame
    pub fn frame_start(&self, frame: u64) -> u64 {
        frame * self.frame_cycles
    }

    /// Whole frames between two clocks, expressed in clocks
    pub fn quantized_span(&self, start: u64, end: u64) -> u64 {
        self.frame_start(self.frame_of(end).saturating_sub(self.frame_of(start)))
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(ClockRate::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_of() {
        let frames = FrameClock::new(ClockRate::Pal);
        assert_eq!(frames.frame_of(0), 0);
        assert_eq!(frames.frame_of(19_704), 0);
        assert_eq!(frames.frame_of(19_705), 1);
        assert_eq!(frames.frame_start(5), 98_525);
    }

    #[test]
    fn test_quantized_span() {
        let frames = FrameClock::new(ClockRate::Pal);
        assert_eq!(frames.quantized_span(0, 100_000), 98_525);
        assert_eq!(frames.quantized_span(20_000, 100_000), 78_820);
        assert_eq!(frames.quantized_span(100, 200), 0);
        assert_eq!(frames.quantized_span(200, 100), 0);
    }
}
