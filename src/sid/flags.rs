//! SID Register Bitfields
//!
//! Bit layouts of the single-byte registers that pack several switches:
//! the per-voice control register, the routing nibble of the
//! resonance/routing register and the mode nibble of the mode/volume
//! register.

use bitflags::bitflags;

bitflags! {
    /// Voice control register (offset 4 within a voice) bitflags
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct ControlFlags: u8 {
        /// Gate (starts attack on rising edge, release on falling edge)
        const GATE = 0x01;
        /// Hard sync with the modulating voice
        const SYNC = 0x02;
        /// Ring modulation with the modulating voice
        const RING = 0x04;
        /// Test bit (resets and holds the oscillator)
        const TEST = 0x08;
        /// Triangle waveform
        const TRIANGLE = 0x10;
        /// Sawtooth waveform
        const SAWTOOTH = 0x20;
        /// Pulse waveform
        const PULSE = 0x40;
        /// Noise waveform
        const NOISE = 0x80;
        /// Any oscillator waveform
        const WAVEFORMS = Self::TRIANGLE.bits() | Self::SAWTOOTH.bits() | Self::PULSE.bits() | Self::NOISE.bits();
    }
}

impl ControlFlags {
    /// Create control flags from raw register value
    pub fn from_register(value: u8) -> Self {
        ControlFlags::from_bits_truncate(value)
    }

    /// Check if any waveform is selected
    pub fn any_waveform(&self) -> bool {
        self.intersects(ControlFlags::WAVEFORMS)
    }

    /// Check if the voice is modulated by its neighbour (sync or ring)
    pub fn is_modulated(&self) -> bool {
        self.intersects(ControlFlags::SYNC | ControlFlags::RING)
    }
}

bitflags! {
    /// Filter routing (low nibble of the resonance register)
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct FilterRoute: u8 {
        /// Voice 1 through filter
        const VOICE1 = 0x01;
        /// Voice 2 through filter
        const VOICE2 = 0x02;
        /// Voice 3 through filter
        const VOICE3 = 0x04;
        /// External input through filter
        const EXTERNAL = 0x08;
    }
}

impl FilterRoute {
    /// Routing flag for a voice number (1-3)
    pub fn for_voice(voice: u8) -> Self {
        match voice {
            1 => FilterRoute::VOICE1,
            2 => FilterRoute::VOICE2,
            3 => FilterRoute::VOICE3,
            _ => FilterRoute::empty(),
        }
    }
}

bitflags! {
    /// Filter mode (high nibble of the mode/volume register)
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct FilterMode: u8 {
        /// Low-pass output
        const LOW_PASS = 0x01;
        /// Band-pass output
        const BAND_PASS = 0x02;
        /// High-pass output
        const HIGH_PASS = 0x04;
        /// Disconnect voice 3 from the output
        const MUTE_VOICE3 = 0x08;
    }
}

/// Split a register byte into (low nibble, high nibble)
pub fn nibbles(value: u8) -> (u8, u8) {
    (value & 0x0F, value >> 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_bits() {
        let flags = ControlFlags::from_register(0x81);
        assert!(flags.contains(ControlFlags::GATE));
        assert!(flags.contains(ControlFlags::NOISE));
        assert!(flags.any_waveform());
        assert!(!flags.is_modulated());

        let flags = ControlFlags::from_register(0x09);
        assert!(!flags.any_waveform());
        assert!(flags.contains(ControlFlags::TEST));
    }

    #[test]
    fn test_route_for_voice() {
        assert_eq!(FilterRoute::for_voice(2), FilterRoute::VOICE2);
        assert_eq!(FilterRoute::for_voice(4), FilterRoute::empty());
    }

    #[test]
    fn test_nibbles() {
        assert_eq!(nibbles(0xA5), (0x05, 0x0A));
    }
}
