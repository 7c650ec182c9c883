//! End-to-end trace scenarios.

use std::sync::Arc;

use sidfrag::fragment::Field;
use sidfrag::sid::{ClockRate, RegisterDecoder, SnapshotCache};
use sidfrag::synth::{MusicEvent, SynthConfig, Synthesizer};
use sidfrag::trace::{FrameClock, TraceClock};
use sidfrag::{Pipeline, PipelineConfig, Timeline, TraceParser};

const NOISE_TRACE: &str = "1 24 15\n1 7 255\n1 8 128\n1 13 255\n100 11 129\n100000 11 0\n";

fn parse(text: &str) -> Vec<sidfrag::RegisterWrite> {
    TraceParser::new(TraceClock::Delta).parse_str(text).unwrap()
}

#[test]
fn test_noise_note_on_voice2() {
    let writes = parse(NOISE_TRACE);
    let output = Pipeline::default().run(&writes).unwrap();

    assert_eq!(output.events.len(), 1);
    let event = output.events[0];
    assert_eq!(event.first_clock, 103);
    assert_eq!(event.voicenum, 2);

    let patch = output.catalogue.get(event.hash_id).unwrap();
    assert_eq!(patch.occurrence_count, 1);
    let names: Vec<String> = patch.fragment.fields().iter().map(Field::name).collect();
    assert_eq!(names, ["freq1", "gate1", "noise1", "sus1", "rel1", "vol"]);
    assert_eq!(patch.fragment.voices(), &[2]);

    let analysis = Synthesizer::default().synthesize(&patch.fragment);
    assert_eq!(analysis.pitches(), [95]);
    assert_eq!(analysis.total_duration, 98_525);
}

#[test]
fn test_noise_note_without_percussion() {
    let config = PipelineConfig {
        percussion: false,
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(config);
    let output = pipeline.run(&parse(NOISE_TRACE)).unwrap();
    assert!(pipeline.music_events(&output).is_empty());

    let pipeline = Pipeline::default();
    let music = pipeline.music_events(&output);
    assert!(matches!(music.as_slice(), [MusicEvent::Drum(drum)] if drum.start_clock == 103 && drum.voice == 2));
}

#[test]
fn test_triangle_note_from_trace() {
    let writes = parse("0 24 15\n0 1 4\n0 6 240\n0 4 17\n100000 4 16\n");
    let output = Pipeline::default().run(&writes).unwrap();
    assert_eq!(output.events.len(), 1);
    let patch = output.catalogue.get(output.events[0].hash_id).unwrap();
    let analysis = Synthesizer::default().synthesize(&patch.fragment);
    assert_eq!(analysis.pitches(), [35]);
    assert_eq!(analysis.total_duration, 98_525);
}

#[test]
fn test_test_bit_note_from_trace() {
    let writes = parse("0 24 15\n0 1 4\n0 6 240\n0 4 25\n20000 4 17\n80000 4 16\n");
    let output = Pipeline::default().run(&writes).unwrap();
    let patch = output.catalogue.get(output.events[0].hash_id).unwrap();
    let analysis = Synthesizer::default().synthesize(&patch.fragment);
    assert_eq!(analysis.pitches(), [35]);
    assert_eq!(analysis.notes[0].start_clock, 19_705);
    assert_eq!(analysis.total_duration, 78_820);
}

#[test]
fn test_replay_is_deterministic() {
    let text = "1 24 15\n1 0 17\n1 1 37\n1 5 9\n1 6 160\n100 4 65\n900 2 128\n\
                20000 1 40\n19000 4 64\n5 14 3\n5 15 9\n1 20 240\n100 18 33\n40000 18 32\n";
    let writes = parse(text);

    let run = || {
        let mut decoder = RegisterDecoder::new(Arc::new(SnapshotCache::new()));
        let timeline = Timeline::build(&writes, &mut decoder, FrameClock::new(ClockRate::Pal)).unwrap();
        timeline
            .entries()
            .iter()
            .map(|entry| (entry.clock, entry.state.hashreg().to_string()))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());

    let first = Pipeline::default().run(&writes).unwrap();
    let second = Pipeline::default().run(&writes).unwrap();
    assert_eq!(first.events, second.events);
    assert_eq!(first.catalogue.top_n(10), second.catalogue.top_n(10));
}

#[test]
fn test_identical_states_share_snapshots() {
    let cache = Arc::new(SnapshotCache::new());
    let mut a = RegisterDecoder::new(Arc::clone(&cache));
    let mut b = RegisterDecoder::new(Arc::clone(&cache));
    for write in parse("0 0 1\n0 0 7\n0 24 15\n") {
        a.apply(&write).unwrap();
    }
    for write in parse("0 24 15\n0 0 7\n") {
        b.apply(&write).unwrap();
    }
    assert!(Arc::ptr_eq(&a.snapshot(), &b.snapshot()));
}

#[test]
fn test_ntsc_frames() {
    let config = PipelineConfig {
        clock_rate: ClockRate::Ntsc,
        ..PipelineConfig::default()
    };
    let output = Pipeline::new(config.clone()).run(&parse(NOISE_TRACE)).unwrap();
    let patch = output.catalogue.get(output.events[0].hash_id).unwrap();
    assert_eq!(patch.fragment.last_offset(), 5 * 17_045);
    let synth = Synthesizer::new(SynthConfig {
        clock_rate: ClockRate::Ntsc,
        ..config.synth_config()
    });
    assert_eq!(synth.synthesize(&patch.fragment).total_duration, 5 * 17_045);
}
