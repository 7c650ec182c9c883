//! End-to-end trace processing.
//!
//! Applies the clock window and voice mask, folds the writes into a
//! timeline, extracts fragments from every gate interval (one scoped thread
//! per voice) and interns them into a fresh catalogue. The snapshot cache and
//! catalogue live exactly as long as one run.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::catalogue::{FragmentEvent, PatchCatalogue};
use crate::fragment::FragmentExtractor;
use crate::sid::registers::{slot, RegisterOwner};
use crate::sid::{check_voice, ClockRate, RegisterDecoder, SnapshotCache, VOICES};
use crate::synth::{MusicEvent, SynthConfig, Synthesizer};
use crate::trace::{FrameClock, RegisterWrite, Timeline, TraceClock};
use crate::{Result, SidError};

/// Run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Chip clock rate
    pub clock_rate: ClockRate,
    /// Encoding of the trace clock column
    pub trace_clock: TraceClock,
    /// Tempo for quarter-note conversion
    pub bpm: u32,
    /// Classify noise fragments as drums
    pub percussion: bool,
    /// Shortest emitted event, in quarter notes
    pub min_note_quarter_notes: f64,
    /// Fixed velocity (defaults to 127)
    pub velocity: Option<u8>,
    /// Voices to process
    pub voices: Vec<u8>,
    /// Ignore writes before this clock
    pub min_clock: u64,
    /// Ignore writes after this clock
    pub max_clock: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let synth = SynthConfig::default();
        Self {
            clock_rate: ClockRate::Pal,
            trace_clock: TraceClock::Delta,
            bpm: synth.bpm,
            percussion: synth.percussion,
            min_note_quarter_notes: synth.min_note_quarter_notes,
            velocity: synth.velocity,
            voices: VOICES.to_vec(),
            min_clock: 0,
            max_clock: None,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; missing keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.voices.is_empty() {
            return Err(SidError::Config("no voices selected".to_string()));
        }
        for &voice in &self.voices {
            check_voice(voice)?;
        }
        if self.bpm == 0 {
            return Err(SidError::Config("bpm must be positive".to_string()));
        }
        if self.min_note_quarter_notes.is_nan() || self.min_note_quarter_notes < 0.0 {
            return Err(SidError::Config(format!(
                "min_note_quarter_notes {} must be non-negative",
                self.min_note_quarter_notes
            )));
        }
        if let Some(velocity) = self.velocity {
            if velocity > 127 {
                return Err(SidError::Config(format!("velocity {} above 127", velocity)));
            }
        }
        if self.max_clock.is_some_and(|max| max < self.min_clock) {
            return Err(SidError::Config("max_clock before min_clock".to_string()));
        }
        Ok(())
    }

    /// Synthesis settings
    pub fn synth_config(&self) -> SynthConfig {
        SynthConfig {
            clock_rate: self.clock_rate,
            bpm: self.bpm,
            percussion: self.percussion,
            min_note_quarter_notes: self.min_note_quarter_notes,
            velocity: self.velocity,
        }
    }

    /// Check if a write survives the clock window and voice mask
    ///
    /// Shared filter/volume registers are never masked.
    fn accepts(&self, write: &RegisterWrite) -> Result<bool> {
        if write.clock < self.min_clock || self.max_clock.is_some_and(|max| write.clock > max) {
            return Ok(false);
        }
        Ok(match slot(write.register)?.owner {
            RegisterOwner::Voice(voice) => self.voices.contains(&voice),
            RegisterOwner::Main => true,
        })
    }
}

/// Fragment rejected because it needs more than two voices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFragment {
    /// Clock of the gate rising edge
    pub first_clock: u64,
    /// Target voice
    pub voice: u8,
    /// Voices the fragment would span
    pub voices: Vec<u8>,
}

/// Result of one run
#[derive(Debug)]
pub struct PipelineOutput {
    /// Deduplicated patches
    pub catalogue: PatchCatalogue,
    /// Fragment occurrences ordered by clock, then voice
    pub events: Vec<FragmentEvent>,
    /// Fragments that could not be modeled
    pub rejected: Vec<RejectedFragment>,
    /// Timeline of chip states
    pub timeline: Timeline,
    /// Distinct chip states seen
    pub snapshot_count: usize,
}

/// Trace-processing pipeline
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process a complete trace
    pub fn run(&self, writes: &[RegisterWrite]) -> Result<PipelineOutput> {
        self.config.validate()?;

        let mut accepted = Vec::with_capacity(writes.len());
        for write in writes {
            if self.config.accepts(write)? {
                accepted.push(*write);
            }
        }
        debug!("{} of {} writes in window", accepted.len(), writes.len());

        let cache = Arc::new(SnapshotCache::new());
        let mut decoder = RegisterDecoder::new(Arc::clone(&cache));
        let frame_clock = FrameClock::new(self.config.clock_rate);
        let timeline = Timeline::build(&accepted, &mut decoder, frame_clock)?;
        info!(
            "{} state changes, {} distinct states",
            timeline.len(),
            cache.len()
        );

        let catalogue = PatchCatalogue::new();
        let extractor = FragmentExtractor::new(frame_clock);

        let per_voice: Vec<Result<(Vec<FragmentEvent>, Vec<RejectedFragment>)>> =
            thread::scope(|scope| {
                let handles: Vec<_> = self
                    .config
                    .voices
                    .iter()
                    .map(|&voice| {
                        let (timeline, catalogue) = (&timeline, &catalogue);
                        scope.spawn(move || {
                            let mut events = Vec::new();
                            let mut rejected = Vec::new();
                            for interval in timeline.gate_intervals(voice)? {
                                match extractor.extract(timeline.slice(&interval), voice) {
                                    Ok(Some(extracted)) => events.push(FragmentEvent {
                                        first_clock: extracted.first_clock,
                                        hash_id: catalogue.intern(&extracted.fragment),
                                        voicenum: voice,
                                    }),
                                    Ok(None) => {}
                                    Err(SidError::TooManyVoices { voice, voices }) => {
                                        warn!(
                                            "skipping fragment at {} on voice {}: spans voices {:?}",
                                            interval.start_clock, voice, voices
                                        );
                                        rejected.push(RejectedFragment {
                                            first_clock: interval.start_clock,
                                            voice,
                                            voices,
                                        });
                                    }
                                    Err(err) => return Err(err),
                                }
                            }
                            Ok((events, rejected))
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                    .collect()
            });

        let mut events = Vec::new();
        let mut rejected = Vec::new();
        for result in per_voice {
            let (voice_events, voice_rejected) = result?;
            events.extend(voice_events);
            rejected.extend(voice_rejected);
        }
        events.sort_by_key(|event| (event.first_clock, event.voicenum));
        rejected.sort_by_key(|r| (r.first_clock, r.voice));

        info!(
            "{} fragments, {} patches ({} rejected)",
            events.len(),
            catalogue.len(),
            rejected.len()
        );

        Ok(PipelineOutput {
            catalogue,
            events,
            rejected,
            timeline,
            snapshot_count: cache.len(),
        })
    }

    /// Music events of every fragment occurrence, ordered by start clock
    pub fn music_events(&self, output: &PipelineOutput) -> Vec<MusicEvent> {
        let synth = Synthesizer::new(self.config.synth_config());
        let mut music: Vec<MusicEvent> = output
            .events
            .iter()
            .filter_map(|event| {
                let patch = output.catalogue.get(event.hash_id)?;
                Some(synth.transcribe(&patch.fragment, event.first_clock, event.voicenum))
            })
            .flatten()
            .collect();
        music.sort_by_key(|event| (event.start_clock(), event.voice()));
        music
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writes(lines: &[(u64, u8, u8)]) -> Vec<RegisterWrite> {
        lines
            .iter()
            .map(|&(clock, register, value)| RegisterWrite {
                clock,
                register,
                value,
            })
            .collect()
    }

    fn two_voice_trace() -> Vec<RegisterWrite> {
        writes(&[
            (0, 24, 15),
            (0, 1, 0x10),
            (0, 6, 0xF0),
            (0, 8, 0x10),
            (0, 13, 0xF0),
            (100, 4, 0x11),
            (100, 11, 0x11),
            (60_000, 4, 0x10),
            (60_000, 11, 0x10),
            (120_000, 4, 0x11),
            (200_000, 4, 0x10),
        ])
    }

    #[test]
    fn test_same_shape_on_two_voices() {
        let output = Pipeline::default().run(&two_voice_trace()).unwrap();
        assert_eq!(output.events.len(), 3);
        assert_eq!(output.events[0].voicenum, 1);
        assert_eq!(output.events[1].voicenum, 2);
        assert_eq!(output.events[0].hash_id, output.events[1].hash_id);
        let patch = output.catalogue.get(output.events[0].hash_id).unwrap();
        assert_eq!(patch.occurrence_count, 2);
        assert!(output.rejected.is_empty());
    }

    #[test]
    fn test_voice_mask() {
        let config = PipelineConfig {
            voices: vec![2],
            ..PipelineConfig::default()
        };
        let output = Pipeline::new(config).run(&two_voice_trace()).unwrap();
        assert_eq!(output.events.len(), 1);
        assert_eq!(output.events[0].voicenum, 2);
    }

    #[test]
    fn test_clock_window() {
        let config = PipelineConfig {
            max_clock: Some(100_000),
            ..PipelineConfig::default()
        };
        let output = Pipeline::new(config).run(&two_voice_trace()).unwrap();
        assert_eq!(output.events.len(), 2);
    }

    #[test]
    fn test_music_events() {
        let pipeline = Pipeline::default();
        let output = pipeline.run(&two_voice_trace()).unwrap();
        let music = pipeline.music_events(&output);
        assert_eq!(music.len(), 3);
        assert_eq!(music[0].start_clock(), 100);
        assert_eq!(music[1].voice(), 2);
        assert_eq!(music[2].start_clock(), 120_000);
    }

    #[test]
    fn test_chained_sync_is_reported() {
        let trace = writes(&[
            (0, 24, 15),
            (0, 4, 0x02),
            (0, 11, 0x02),
            (10, 18, 0x23),
        ]);
        let output = Pipeline::default().run(&trace).unwrap();
        assert!(output.events.is_empty());
        assert_eq!(
            output.rejected,
            [RejectedFragment {
                first_clock: 10,
                voice: 3,
                voices: vec![3, 2, 1],
            }]
        );
    }

    #[test]
    fn test_config_validation() {
        let bad_voice = PipelineConfig {
            voices: vec![4],
            ..PipelineConfig::default()
        };
        assert!(matches!(bad_voice.validate(), Err(SidError::InvalidVoice(4))));
        let bad_window = PipelineConfig {
            min_clock: 10,
            max_clock: Some(5),
            ..PipelineConfig::default()
        };
        assert!(matches!(bad_window.validate(), Err(SidError::Config(_))));
        assert!(Pipeline::new(bad_window).run(&[]).is_err());
    }

    #[test]
    fn test_config_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"clock_rate": "ntsc", "bpm": 90, "voices": [1, 3]}"#).unwrap();
        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.clock_rate, ClockRate::Ntsc);
        assert_eq!(config.bpm, 90);
        assert_eq!(config.voices, [1, 3]);
        assert!(config.percussion);
        assert_eq!(config.trace_clock, TraceClock::Delta);
    }
}
