#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!(
        "The sidfrag CLI requires the \"cli\" feature. Rebuild with `--features cli` to enable it."
    );
}

#[cfg(feature = "cli")]
mod cli {
    use std::fs::{self, File};
    use std::io::{BufReader, BufWriter, Write};
    use std::path::{Path, PathBuf};

    use anyhow::{Context, Result};
    use clap::Parser;
    use log::info;

    use sidfrag::catalogue::{write_events, write_patches, Arity};
    use sidfrag::sid::ClockRate;
    use sidfrag::synth::MusicEvent;
    use sidfrag::{Pipeline, PipelineConfig, TraceParser};

    #[derive(Parser)]
    #[command(name = "sidfrag")]
    #[command(about = "Extract and deduplicate sound fragments from a SID register trace")]
    struct Args {
        /// Register trace (`<clock> <register> <value>` per line)
        trace: PathBuf,

        /// Use the NTSC clock instead of PAL
        #[arg(long)]
        ntsc: bool,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory (defaults to the trace's directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Tempo for quarter-note conversion
        #[arg(long)]
        bpm: Option<u32>,

        /// Emit noise fragments as nothing instead of drums
        #[arg(long)]
        no_percussion: bool,

        /// Comma separated voices to process
        #[arg(long, value_delimiter = ',')]
        voices: Option<Vec<u8>>,

        /// Number of patches to summarize
        #[arg(long, default_value_t = 10)]
        top: usize,
    }

    fn load_config(args: &Args) -> Result<PipelineConfig> {
        let mut config = match &args.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if args.ntsc {
            config.clock_rate = ClockRate::Ntsc;
        }
        if let Some(bpm) = args.bpm {
            config.bpm = bpm;
        }
        if args.no_percussion {
            config.percussion = false;
        }
        if let Some(voices) = &args.voices {
            config.voices = voices.clone();
        }
        config.validate()?;
        Ok(config)
    }

    fn output_path(dir: &Path, stem: &str, suffix: &str) -> PathBuf {
        dir.join(format!("{}.{}.csv", stem, suffix))
    }

    fn write_notes(path: &Path, music: &[MusicEvent]) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "start_clock,voice,kind,pitch,duration,velocity,quarter_note_time")?;
        for event in music {
            match event {
                MusicEvent::Note(note) => writeln!(
                    out,
                    "{},{},note,{},{},{},{:.4}",
                    note.start_clock,
                    note.voice,
                    note.pitch,
                    note.duration,
                    note.velocity,
                    note.quarter_note_time
                )?,
                MusicEvent::Drum(drum) => writeln!(
                    out,
                    "{},{},{:?},{},{},{},{:.4}",
                    drum.start_clock,
                    drum.voice,
                    drum.drum,
                    drum.drum.gm_note(),
                    drum.duration,
                    drum.velocity,
                    drum.quarter_note_time
                )?,
            }
        }
        out.flush()?;
        Ok(())
    }

    pub fn run() -> Result<()> {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        let args = Args::parse();
        let config = load_config(&args)?;

        let file = File::open(&args.trace)
            .with_context(|| format!("opening trace {}", args.trace.display()))?;
        let writes = TraceParser::new(config.trace_clock)
            .parse_reader(BufReader::new(file))
            .with_context(|| format!("parsing trace {}", args.trace.display()))?;
        info!("{} register writes", writes.len());

        let pipeline = Pipeline::new(config);
        let output = pipeline.run(&writes)?;

        let stem = args
            .trace
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "trace".to_string());
        let dir = match &args.out_dir {
            Some(dir) => dir.clone(),
            None => args
                .trace
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

        for arity in [Arity::Single, Arity::Multi] {
            let patches = output.catalogue.patches(arity);
            if patches.is_empty() {
                continue;
            }
            let path = output_path(&dir, &stem, arity.table_suffix());
            write_patches(BufWriter::new(File::create(&path)?), &patches)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {} patches to {}", patches.len(), path.display());
        }

        let path = output_path(&dir, &stem, "ssf");
        write_events(BufWriter::new(File::create(&path)?), &output.events)
            .with_context(|| format!("writing {}", path.display()))?;

        let music = pipeline.music_events(&output);
        let path = output_path(&dir, &stem, "notes");
        write_notes(&path, &music).with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {} music events to {}", music.len(), path.display());

        for patch in output.catalogue.top_n(args.top) {
            let names: Vec<String> = patch.fragment.fields().iter().map(|f| f.name()).collect();
            info!(
                "{:016x} x{:<5} {} rows [{}]",
                patch.hash_id,
                patch.occurrence_count,
                patch.fragment.rows().len(),
                names.join(",")
            );
        }
        Ok(())
    }
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    cli::run()
}
