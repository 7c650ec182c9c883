//! State timeline and gate intervals.
//!
//! Folds register writes through the decoder and records a frozen snapshot
//! after every change. Changes sharing a clock collapse into the last state
//! at that clock. Per-voice gate intervals slice the timeline into the units
//! fragments are extracted from.

use std::sync::Arc;

use log::trace;

use super::frame::FrameClock;
use super::RegisterWrite;
use crate::sid::{check_voice, FrozenChipState, RegisterDecoder};
use crate::{Result, SidError};

/// Chip state as of a clock
#[derive(Debug, Clone)]
pub struct TimelineEntry {
    /// Absolute clock of the change
    pub clock: u64,
    /// Frame the clock falls into
    pub frame: u64,
    /// State after all changes at this clock
    pub state: Arc<FrozenChipState>,
}

/// One voice's gated span of the timeline
///
/// Starts at a rising edge of the voice's gate bit and extends to the next
/// rising edge (exclusive) or the end of the trace, so it covers the
/// release phase that follows the gate falling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateInterval {
    /// Voice number (1-3)
    pub voice: u8,
    /// Index of the rising-edge entry
    pub start: usize,
    /// Index one past the last entry
    pub end: usize,
    /// Clock of the rising edge
    pub start_clock: u64,
    /// First clock the effective gate fell (gate cleared or test asserted)
    pub gate_off_clock: Option<u64>,
}

/// Time-ordered sequence of decoded chip states
#[derive(Debug, Clone)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
    frame_clock: FrameClock,
}

impl Timeline {
    /// Fold `writes` through `decoder`, recording snapshots after changes
    pub fn build(
        writes: &[RegisterWrite],
        decoder: &mut RegisterDecoder,
        frame_clock: FrameClock,
    ) -> Result<Self> {
        let mut entries: Vec<TimelineEntry> = Vec::new();
        let mut last_clock = 0u64;

        for write in writes {
            if write.clock < last_clock {
                return Err(SidError::ClockRegression {
                    previous: last_clock,
                    current: write.clock,
                });
            }
            last_clock = write.clock;

            let Some(event) = decoder.apply(write)? else {
                continue;
            };
            trace!("{:>10} {}", write.clock, event.description);

            let state = decoder.snapshot();
            match entries.last_mut() {
                Some(last) if last.clock == write.clock => last.state = state,
                _ => entries.push(TimelineEntry {
                    clock: write.clock,
                    frame: frame_clock.frame_of(write.clock),
                    state,
                }),
            }
        }

        Ok(Timeline {
            entries,
            frame_clock,
        })
    }

    /// All entries in clock order
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// Frame quantizer used for this timeline
    pub fn frame_clock(&self) -> FrameClock {
        self.frame_clock
    }

    /// Number of recorded states
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no change was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gate intervals of one voice (1-3), in clock order
    pub fn gate_intervals(&self, voice: u8) -> Result<Vec<GateInterval>> {
        check_voice(voice)?;
        let starts: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .scan(false, |gate, (index, entry)| {
                let now = entry.state.voice(voice).gate();
                let rising = now && !*gate;
                *gate = now;
                Some(rising.then_some(index))
            })
            .flatten()
            .collect();

        Ok(starts
            .iter()
            .enumerate()
            .map(|(n, &start)| {
                let end = starts.get(n + 1).copied().unwrap_or(self.entries.len());
                let gate_off_clock = self.entries[start..end]
                    .iter()
                    .find(|entry| !entry.state.voice(voice).gate_on())
                    .map(|entry| entry.clock);
                GateInterval {
                    voice,
                    start,
                    end,
                    start_clock: self.entries[start].clock,
                    gate_off_clock,
                }
            })
            .collect())
    }

    /// Timeline entries covered by an interval
    pub fn slice(&self, interval: &GateInterval) -> &[TimelineEntry] {
        &self.entries[interval.start..interval.end]
    }
}
