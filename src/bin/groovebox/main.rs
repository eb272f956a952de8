//! groovebox - sixteen-track groovebox in the terminal
//!
//! Run with: cargo run -- --bpm 128
//! Headless: cargo run -- --no-device --seconds 8 --wav take.wav

mod app;
mod ui;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use groovebox::{EngineConfig, OverflowMode};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "groovebox", version, about = "Sixteen-track groovebox renderer")]
pub struct Cli {
    /// Tempo in beats per minute
    #[arg(long, default_value_t = 120.0)]
    pub bpm: f64,

    /// Frames per render block (power of two)
    #[arg(long, default_value_t = groovebox::DEFAULT_BLOCK_FRAMES)]
    pub block_frames: usize,

    /// WAV file written when playback stops
    #[arg(long, default_value = "groovebox.wav")]
    pub wav: PathBuf,

    /// Raw PCM capture written while playing
    #[arg(long, default_value = "groovebox.raw")]
    pub raw: PathBuf,

    /// Delete the raw capture once the WAV is written
    #[arg(long)]
    pub discard_raw: bool,

    /// Clamp loud mixes instead of wrapping them
    #[arg(long)]
    pub saturate: bool,

    /// Render without opening an audio device
    #[arg(long)]
    pub no_device: bool,

    /// Standard MIDI File played on track 1
    #[arg(long, value_name = "FILE")]
    pub midi: Option<PathBuf>,

    /// Render for this many seconds without the terminal UI, then stop
    #[arg(long, value_name = "N")]
    pub seconds: Option<f64>,

    /// Log file used while the terminal UI is active
    #[arg(long, default_value = "groovebox.log")]
    pub log: PathBuf,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .bpm(self.bpm)
            .block_frames(self.block_frames)
            .overflow(if self.saturate {
                OverflowMode::Saturate
            } else {
                OverflowMode::Wrap
            })
            .capture_paths(&self.raw, &self.wav)
            .keep_raw_capture(!self.discard_raw)
    }
}

fn init_logging(cli: &Cli) -> EyreResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.seconds.is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        // the terminal belongs to the UI
        let file = File::create(&cli.log)
            .wrap_err_with(|| format!("failed to create log file {}", cli.log.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = cli.engine_config();
    config.validate()?;

    let app = app::App::new(&cli, config)?;
    match cli.seconds {
        Some(seconds) => app.run_headless(seconds),
        None => app.run_interactive(),
    }
}
