use std::path::PathBuf;

/// Errors surfaced by the engine.
///
/// Per-block I/O trouble inside the render thread is logged and rendering
/// carries on; only setup and shutdown paths return these to the caller.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("audio device error: {0}")]
    Device(String),

    #[error("capture file {}: {source}", path.display())]
    Capture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to finalize WAV container {}: {source}", path.display())]
    Finalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid MIDI data: {0}")]
    Midi(String),

    #[error("render loop already started")]
    AlreadyStarted,

    #[error("render loop has terminated and cannot be restarted")]
    Terminated,

    #[error("render loop was never started")]
    NotStarted,

    #[error("control queue is full")]
    ControlQueueFull,

    #[error("render thread failed: {0}")]
    RenderThread(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
