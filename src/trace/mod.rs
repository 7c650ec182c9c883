//! Trace Input Domain
//!
//! Reads register-write traces, accumulates delta clocks, quantizes them into
//! frames and folds them into a timeline of frozen chip states.

pub mod frame;
pub mod parser;
pub mod timeline;

pub use frame::FrameClock;
pub use parser::TraceParser;
pub use timeline::{GateInterval, Timeline, TimelineEntry};

use serde::{Deserialize, Serialize};

/// One write to a chip register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterWrite {
    /// Absolute chip clock
    pub clock: u64,
    /// Register index (0-24)
    pub register: u8,
    /// Value written
    pub value: u8,
}

/// Encoding of the trace clock column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceClock {
    /// Cycles since the previous write
    #[default]
    Delta,
    /// Absolute, non-decreasing clock
    Absolute,
}
