use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use polystep::{ScaleKind, SequencerEvent, Session, SessionConfig, VoiceType};

#[derive(Parser)]
#[command(name = "polystep")]
#[command(about = "Polyrhythmic step sequencer with a built-in synthesizer")]
struct Cli {
    /// Tempo in beats per minute (40-300)
    #[arg(long, default_value_t = 120.0)]
    bpm: f32,

    /// Scale name, e.g. minor, dorian, minor_pentatonic
    #[arg(long, default_value = "minor")]
    scale: String,

    /// Root MIDI note (24-72)
    #[arg(long, default_value_t = 48)]
    root: i32,

    /// Swing amount (0-1)
    #[arg(long, default_value_t = 0.0)]
    swing: f32,

    /// Evolve patterns every N beats while playing
    #[arg(long)]
    evolve_every: Option<u32>,

    /// Seed for reproducible pattern generation
    #[arg(long)]
    seed: Option<u64>,

    /// Load a preset instead of building the demo tracks
    #[arg(long)]
    preset: Option<PathBuf>,

    /// Save the session as a preset before playing
    #[arg(long)]
    save_preset: Option<PathBuf>,

    /// Randomize sounds and patterns of every track
    #[arg(long)]
    randomize: bool,

    /// Master output volume (0-1)
    #[arg(long, default_value_t = 0.8)]
    volume: f32,

    /// Seconds to play before exiting
    #[arg(long, default_value_t = 16)]
    seconds: u64,

    /// Run the clock without opening an audio device
    #[arg(long)]
    headless: bool,
}

const DEMO_TRACKS: [VoiceType; 6] = [
    VoiceType::Kick,
    VoiceType::Snare,
    VoiceType::HiHat,
    VoiceType::Bass,
    VoiceType::Lead,
    VoiceType::Pad,
];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("polystep=info")),
        )
        .init();

    let cli = Cli::parse();
    let scale = ScaleKind::from_name(&cli.scale)
        .with_context(|| format!("unknown scale '{}'", cli.scale))?;

    let config = SessionConfig {
        bpm: cli.bpm,
        scale,
        root_note: cli.root,
        swing: cli.swing,
        evolution_enabled: cli.evolve_every.is_some(),
        evolution_interval: cli.evolve_every.unwrap_or(4),
        seed: cli.seed,
        ..SessionConfig::default()
    };
    let mut session = Session::new(config);

    if let Some(path) = &cli.preset {
        session
            .load_preset_file(path)
            .with_context(|| format!("failed to load preset {}", path.display()))?;
    } else {
        for voice_type in DEMO_TRACKS {
            if let Some(id) = session.add_track(voice_type, None) {
                session.generate_smart(id);
            }
        }
    }
    if cli.randomize {
        session.randomize_everything();
    }
    session.sync_delay_to_tempo();
    session.set_master_volume(cli.volume);

    if let Some(path) = &cli.save_preset {
        session
            .save_preset("polystep", path)
            .with_context(|| format!("failed to save preset {}", path.display()))?;
    }

    if !cli.headless {
        session.start_audio().context("could not open audio output")?;
    }
    session.start()?;

    let started = Instant::now();
    let mut steps_fired = 0u64;
    while started.elapsed() < Duration::from_secs(cli.seconds) {
        std::thread::sleep(Duration::from_millis(250));
        for event in session.poll_events() {
            match event {
                SequencerEvent::StepChanged { .. } => steps_fired += 1,
                SequencerEvent::Evolved { tick } => tracing::info!(tick, "patterns evolved"),
                _ => {}
            }
        }
        session.collect_garbage();
    }

    session.stop();
    tracing::info!(
        beats = session.global_beat(),
        steps = steps_fired,
        tracks = session.track_count(),
        "done"
    );
    Ok(())
}
