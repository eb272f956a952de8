//! groovebox - a sample-synchronous multi-track rendering engine.
//!
//! Sequencers tick once per frame and trigger synthesizer voices; every voice
//! is mixed on its channel through a delay and a reverb, panned, scaled by its
//! track volume and packed to 16-bit PCM. The per-channel streams are summed by
//! the multiplexer and written to a live device and a raw capture file, which
//! is turned into a WAV container when the render loop stops.
//!
//! ```ignore
//! use groovebox::{engine::{RenderLoop, Session}, output, EngineConfig};
//!
//! let config = EngineConfig::default();
//! let session = Session::groovebox(&config)?;
//! let mut render = RenderLoop::new(session, output::default_device());
//! render.start()?;
//! // ...
//! let summary = render.stop()?;
//! println!("wrote {} bytes to {}", summary.data_len, summary.wav_path.display());
//! ```

pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod io;
pub mod mix;
pub mod output;
pub mod sequencing; // Step clocks, patterns and sequencer variants
pub mod synth; // Voices driven by sequencer triggers

pub use config::{DelaySettings, EngineConfig, OverflowMode, ReverbSettings};
pub use error::{EngineError, Result};

/// Fixed engine sample rate in Hz.
pub const SAMPLE_RATE: u32 = 44_100;

/// Number of addressable effect/pan channels.
pub const CHANNEL_COUNT: usize = 16;

/// Default render block length in frames (8192 bytes of stereo s16).
pub const DEFAULT_BLOCK_FRAMES: usize = 2048;

/// Steps per bar for every step-pattern sequencer (sixteenth notes).
pub const STEPS_PER_BAR: usize = 16;
