//! SID Register Trace Analysis
//!
//! Reconstructs musical structure from a raw trace of writes to the MOS
//! 6581/8580 SID registers and compresses it into a catalogue of reusable,
//! deduplicated sound fragments that can be re-synthesized as MIDI notes or
//! drum hits.
//!
//! # Features
//! - Register decoder with per-register change events and an always-current
//!   decoded state of all 3 voices plus the filter/volume block
//! - Content-addressed snapshot cache shared across a trace-processing run
//! - Per-voice gate interval slicing and diff-compressed fragment extraction
//! - Voice-normalized patch catalogue with occurrence counts and CSV tables
//! - Pitch, duration and percussion classification of decoded fragments
//!
//! # Crate feature flags
//! - `cli` (default): `sidfrag` command-line frontend (`clap`, `env_logger`)
//!
//! # Quick start
//! ```no_run
//! use sidfrag::pipeline::{Pipeline, PipelineConfig};
//! use sidfrag::trace::TraceParser;
//!
//! let text = std::fs::read_to_string("vicesnd.sid").unwrap();
//! let config = PipelineConfig::default();
//! let writes = TraceParser::new(config.trace_clock).parse_str(&text).unwrap();
//! let output = Pipeline::new(config).run(&writes).unwrap();
//! for patch in output.catalogue.top_n(10) {
//!     println!("{:016x} x{}", patch.hash_id, patch.occurrence_count);
//! }
//! ```

#![warn(missing_docs)]

pub mod catalogue; // Patch deduplication and persistence
pub mod fragment; // Sound fragment extraction
pub mod pipeline; // End-to-end trace processing
pub mod sid; // SID register model (core)
pub mod synth; // Note and percussion synthesis
pub mod trace; // Trace input and state timeline

/// Error types for trace decoding and fragment processing
#[derive(thiserror::Error, Debug)]
pub enum SidError {
    /// Malformed trace line
    #[error("Parse error at line {line}: {reason} ({content:?})")]
    Parse {
        /// 1-based line number in the trace
        line: usize,
        /// Offending line text
        content: String,
        /// What was wrong with it
        reason: String,
    },

    /// Write to a register outside 0..=24
    #[error("Invalid register index {0}")]
    InvalidRegister(u8),

    /// Voice number outside 1..=3
    #[error("Invalid voice number {0}")]
    InvalidVoice(u8),

    /// Fragment involving more voices than a primary plus one synchronized voice
    #[error("Fragment for voice {voice} spans {voices:?}")]
    TooManyVoices {
        /// Target voice of the fragment
        voice: u8,
        /// All voices the fragment would need
        voices: Vec<u8>,
    },

    /// Clock moved backwards where it must not
    #[error("Clock regression: {current} after {previous}")]
    ClockRegression {
        /// Last accepted clock
        previous: u64,
        /// Offending clock
        current: u64,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Patch table encoding or decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration file decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for trace processing operations
pub type Result<T> = std::result::Result<T, SidError>;

// Public API exports
pub use catalogue::{Patch, PatchCatalogue};
pub use fragment::{FragmentExtractor, SoundFragment};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutput};
pub use sid::{ChipState, ClockRate, FrozenChipState, RegisterDecoder, SnapshotCache};
pub use synth::{synthesize, MusicEvent, Synthesizer};
pub use trace::{RegisterWrite, Timeline, TraceParser};
