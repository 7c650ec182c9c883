//! Note and Percussion Synthesis
//!
//! Turns a decoded fragment into timed musical events: tonal notes with a
//! pitch and a frame-quantized duration, or a single percussion hit when
//! the noise waveform takes part. Works on the fragment's primary voice.

pub mod percussion;
pub mod pitch;

pub use percussion::DrumKind;
pub use pitch::{midi_pitch, release_cycles, RELEASE_MS};

use serde::{Deserialize, Serialize};

use crate::fragment::{Field, SoundFragment, UndiffedRow};
use crate::sid::{ClockRate, ControlFlags, VoiceField};
use crate::trace::FrameClock;

/// Notes starting before this clock count towards the initial pitch drop
const INITIAL_PITCH_WINDOW: u64 = 100_000;

/// Drop (in semitones) between the first two initial pitches that marks a
/// kick drum
const PITCH_DROP_SEMITONES: i16 = 12;

/// Default MIDI velocity
pub const DEFAULT_VELOCITY: u8 = 127;

/// Tonal note
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiNoteEvent {
    /// Start clock (fragment-relative until transcribed)
    pub start_clock: u64,
    /// Voice (relative until transcribed)
    pub voice: u8,
    /// MIDI note number
    pub pitch: u8,
    /// Duration in clock cycles
    pub duration: u64,
    /// MIDI velocity
    pub velocity: u8,
    /// Start in quarter notes
    pub quarter_note_time: f64,
}

/// Percussion hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrumEvent {
    /// Start clock (fragment-relative until transcribed)
    pub start_clock: u64,
    /// Voice (relative until transcribed)
    pub voice: u8,
    /// Classified sound
    pub drum: DrumKind,
    /// Duration in clock cycles
    pub duration: u64,
    /// MIDI velocity
    pub velocity: u8,
    /// Start in quarter notes
    pub quarter_note_time: f64,
}

/// Event handed to renderers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MusicEvent {
    /// Pitched note
    Note(MidiNoteEvent),
    /// Percussion hit
    Drum(DrumEvent),
}

impl MusicEvent {
    /// Start clock
    pub fn start_clock(&self) -> u64 {
        match self {
            MusicEvent::Note(note) => note.start_clock,
            MusicEvent::Drum(drum) => drum.start_clock,
        }
    }

    /// Voice number
    pub fn voice(&self) -> u8 {
        match self {
            MusicEvent::Note(note) => note.voice,
            MusicEvent::Drum(drum) => drum.voice,
        }
    }

    /// Duration in clock cycles
    pub fn duration(&self) -> u64 {
        match self {
            MusicEvent::Note(note) => note.duration,
            MusicEvent::Drum(drum) => drum.duration,
        }
    }

    /// Move the event to an absolute clock on a physical voice
    fn placed(mut self, first_clock: u64, voice: u8, rate: ClockRate, bpm: u32) -> Self {
        let (start, event_voice, qn) = match &mut self {
            MusicEvent::Note(note) => (&mut note.start_clock, &mut note.voice, &mut note.quarter_note_time),
            MusicEvent::Drum(drum) => (&mut drum.start_clock, &mut drum.voice, &mut drum.quarter_note_time),
        };
        *start += first_clock;
        *event_voice = voice;
        *qn = rate.cycles_to_quarter_notes(*start, bpm);
        self
    }
}

/// Synthesis parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Pitch mapping and frame size
    pub clock_rate: ClockRate,
    /// Tempo for quarter-note conversion
    pub bpm: u32,
    /// Classify noise fragments as drums (otherwise they are dropped)
    pub percussion: bool,
    /// Shortest emitted event, in quarter notes
    pub min_note_quarter_notes: f64,
    /// Fixed velocity (defaults to 127)
    pub velocity: Option<u8>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            clock_rate: ClockRate::Pal,
            bpm: 125,
            percussion: true,
            min_note_quarter_notes: 0.1,
            velocity: None,
        }
    }
}

/// Everything derived from a fragment
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentAnalysis {
    /// All tonal notes before classification and duration filtering
    pub notes: Vec<MidiNoteEvent>,
    /// Union of waveforms used by the primary voice
    pub waveforms: ControlFlags,
    /// Distinct consecutive waveform sets
    pub waveform_order: Vec<ControlFlags>,
    /// How many entries of `waveform_order` include noise
    pub noise_phase_count: usize,
    /// Sum of note durations
    pub total_duration: u64,
    /// First early pitch is more than an octave above the second
    pub initial_pitch_drop: bool,
    /// Events to emit
    pub events: Vec<MusicEvent>,
}

impl FragmentAnalysis {
    /// Note pitches in order
    pub fn pitches(&self) -> Vec<u8> {
        self.notes.iter().map(|note| note.pitch).collect()
    }
}

/// Primary voice register view of an undiffed row
struct VoiceRow {
    offset: u64,
    frequency: u16,
    gate: bool,
    test: bool,
    release: i64,
    waveforms: ControlFlags,
}

impl VoiceRow {
    fn read(fragment: &SoundFragment, row: &UndiffedRow) -> Self {
        let get = |field| row.get(fragment, Field::Voice(field, 1));
        let mut waveforms = ControlFlags::empty();
        for (field, flag) in [
            (VoiceField::Triangle, ControlFlags::TRIANGLE),
            (VoiceField::Sawtooth, ControlFlags::SAWTOOTH),
            (VoiceField::Pulse, ControlFlags::PULSE),
            (VoiceField::Noise, ControlFlags::NOISE),
        ] {
            waveforms.set(flag, get(field) > 0);
        }
        Self {
            offset: row.offset,
            frequency: u16::try_from(get(VoiceField::Frequency)).unwrap_or(0),
            gate: get(VoiceField::Gate) > 0,
            test: get(VoiceField::Test) > 0,
            release: get(VoiceField::Release),
            waveforms,
        }
    }

    fn sounding(&self) -> bool {
        self.gate && !self.test && !self.waveforms.is_empty()
    }
}

/// Note being tracked while walking rows
struct OpenNote {
    start: u64,
    pitch: u8,
    release_end: Option<u64>,
}

/// Fragment to music event converter
#[derive(Debug, Clone, Copy, Default)]
pub struct Synthesizer {
    config: SynthConfig,
}

impl Synthesizer {
    /// Create a synthesizer
    pub fn new(config: SynthConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    fn velocity(&self) -> u8 {
        self.config.velocity.unwrap_or(DEFAULT_VELOCITY)
    }

    fn frame_clock(&self) -> FrameClock {
        FrameClock::new(self.config.clock_rate)
    }

    /// Analyse a fragment; events are fragment-relative on voice 1
    pub fn synthesize(&self, fragment: &SoundFragment) -> FragmentAnalysis {
        let undiffed = fragment.undiff();
        let rows: Vec<VoiceRow> = undiffed
            .iter()
            .map(|row| VoiceRow::read(fragment, row))
            .collect();

        let notes = self.notes(&rows, fragment.last_offset());
        let total_duration: u64 = notes.iter().map(|note| note.duration).sum();

        let mut waveforms = ControlFlags::empty();
        let mut waveform_order: Vec<ControlFlags> = Vec::new();
        for row in &rows {
            waveforms |= row.waveforms;
            let changed = match waveform_order.last() {
                Some(last) => *last != row.waveforms,
                None => !row.waveforms.is_empty(),
            };
            if changed {
                waveform_order.push(row.waveforms);
            }
        }
        let noise_phase_count = waveform_order
            .iter()
            .filter(|set| set.contains(ControlFlags::NOISE))
            .count();

        let initial: Vec<i16> = notes
            .iter()
            .filter(|note| note.start_clock < INITIAL_PITCH_WINDOW)
            .map(|note| i16::from(note.pitch))
            .collect();
        let initial_pitch_drop = initial.len() >= 2 && initial[0] - initial[1] > PITCH_DROP_SEMITONES;

        let mut analysis = FragmentAnalysis {
            notes,
            waveforms,
            waveform_order,
            noise_phase_count,
            total_duration,
            initial_pitch_drop,
            events: Vec::new(),
        };
        analysis.events = self.classify(&analysis);
        analysis
    }

    /// Events of a fragment placed at `first_clock` on a physical voice
    pub fn transcribe(&self, fragment: &SoundFragment, first_clock: u64, voice: u8) -> Vec<MusicEvent> {
        self.synthesize(fragment)
            .events
            .into_iter()
            .map(|event| event.placed(first_clock, voice, self.config.clock_rate, self.config.bpm))
            .collect()
    }

    fn note(&self, open: &OpenNote, end: u64) -> Option<MidiNoteEvent> {
        let duration = self.frame_clock().quantized_span(open.start, end);
        (duration > 0).then(|| MidiNoteEvent {
            start_clock: open.start,
            voice: 1,
            pitch: open.pitch,
            duration,
            velocity: self.velocity(),
            quarter_note_time: self
                .config
                .clock_rate
                .cycles_to_quarter_notes(open.start, self.config.bpm),
        })
    }

    /// Walk rows into notes
    ///
    /// A note opens when the voice starts sounding and closes at the earliest
    /// of a pitch change, a test assertion, the end of the release after the
    /// gate falls, or the last row.
    fn notes(&self, rows: &[VoiceRow], last_offset: u64) -> Vec<MidiNoteEvent> {
        let rate = self.config.clock_rate;
        let mut notes = Vec::new();
        let mut open: Option<OpenNote> = None;

        for row in rows {
            let pitch = midi_pitch(row.frequency, rate);
            if let Some(note) = open.take() {
                let end = match note.release_end {
                    Some(end) if row.offset >= end => Some(end),
                    _ if row.test || pitch != Some(note.pitch) => Some(row.offset),
                    _ => None,
                };
                match end {
                    Some(end) => notes.extend(self.note(&note, end)),
                    None => {
                        let release_end = match (row.gate, note.release_end) {
                            (false, None) => Some(row.offset + release_cycles(row.release, rate)),
                            (false, end) => end,
                            (true, _) => None,
                        };
                        open = Some(OpenNote {
                            release_end,
                            ..note
                        });
                    }
                }
            }
            if open.is_none() && row.sounding() {
                if let Some(pitch) = pitch {
                    open = Some(OpenNote {
                        start: row.offset,
                        pitch,
                        release_end: None,
                    });
                }
            }
        }

        if let Some(note) = open {
            let end = note.release_end.map_or(last_offset, |end| end.min(last_offset));
            notes.extend(self.note(&note, end));
        }
        notes
    }

    fn classify(&self, analysis: &FragmentAnalysis) -> Vec<MusicEvent> {
        let Some(first) = analysis.notes.first() else {
            return Vec::new();
        };
        let drum = |drum| {
            MusicEvent::Drum(DrumEvent {
                start_clock: first.start_clock,
                voice: first.voice,
                drum,
                duration: analysis.total_duration,
                velocity: self.velocity(),
                quarter_note_time: first.quarter_note_time,
            })
        };

        let events = if analysis.noise_phase_count > 0 {
            if !self.config.percussion {
                return Vec::new();
            }
            let kind = if analysis.waveforms == ControlFlags::NOISE && analysis.noise_phase_count == 1 {
                DrumKind::for_noise_duration(analysis.total_duration, self.frame_clock().frame_cycles())
            } else if analysis.noise_phase_count > 1 {
                DrumKind::ElectricSnare
            } else if analysis.initial_pitch_drop {
                DrumKind::BassDrum
            } else {
                DrumKind::LowTom
            };
            vec![drum(kind)]
        } else if analysis.waveforms == ControlFlags::PULSE && analysis.initial_pitch_drop {
            vec![drum(DrumKind::BassDrum)]
        } else {
            analysis.notes.iter().copied().map(MusicEvent::Note).collect()
        };

        let rate = self.config.clock_rate;
        events
            .into_iter()
            .filter(|event| {
                rate.cycles_to_quarter_notes(event.duration(), self.config.bpm)
                    >= self.config.min_note_quarter_notes
            })
            .collect()
    }
}

/// Music events of a fragment at a clock rate, with default settings
pub fn synthesize(fragment: &SoundFragment, clock_rate: ClockRate) -> Vec<MusicEvent> {
    let config = SynthConfig {
        clock_rate,
        ..SynthConfig::default()
    };
    let voice = fragment.voices().first().copied().unwrap_or(1);
    Synthesizer::new(config)
        .synthesize(fragment)
        .events
        .into_iter()
        .map(|event| event.placed(0, voice, clock_rate, config.bpm))
        .collect()
}
