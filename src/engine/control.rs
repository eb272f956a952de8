use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};

use rtrb::Producer;
use tracing::warn;

use super::render_loop::Transport;
use crate::error::{EngineError, Result};
use crate::io::midi::MidiEvent;
use crate::synth::SynthMessage;

/// Queued changes applied by the render thread at the next block boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMessage {
    SetVolume { track: usize, volume: f64 },
    /// Pan by MIDI value, 0 hard left to 127 hard right.
    SetPan { channel: usize, value: u8 },
    SetTempo(f64),
    /// Deliver a message straight to a track's synthesizer.
    Trigger { track: usize, message: SynthMessage },
    /// Route through the session's [`MidiMap`](crate::io::MidiMap).
    Midi(MidiEvent),
}

/// Cloneable remote for a [`RenderLoop`](super::RenderLoop).
///
/// Transport changes are atomic flags and take effect at the next block.
/// Everything else goes through a bounded queue; a full queue rejects the
/// message rather than blocking the caller.
#[derive(Clone)]
pub struct Controller {
    transport: Arc<Transport>,
    queue: Arc<Mutex<Producer<ControlMessage>>>,
}

impl Controller {
    pub(crate) fn new(transport: Arc<Transport>, producer: Producer<ControlMessage>) -> Self {
        Self {
            transport,
            queue: Arc::new(Mutex::new(producer)),
        }
    }

    pub fn pause(&self) {
        self.transport.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.transport.paused.store(false, Ordering::Release);
    }

    /// Ask the render thread to finish its current block and exit. The
    /// capture is finalised by [`RenderLoop::stop`](super::RenderLoop::stop).
    pub fn request_stop(&self) {
        self.transport.running.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.transport.paused.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.transport.running.load(Ordering::Acquire)
    }

    /// Blocks rendered since start, not counting paused time.
    pub fn blocks_rendered(&self) -> u64 {
        self.transport.blocks.load(Ordering::Relaxed)
    }

    pub fn set_volume(&self, track: usize, volume: f64) -> Result<()> {
        self.send(ControlMessage::SetVolume { track, volume })
    }

    pub fn set_pan(&self, channel: usize, value: u8) -> Result<()> {
        self.send(ControlMessage::SetPan { channel, value })
    }

    pub fn set_tempo(&self, bpm: f64) -> Result<()> {
        self.send(ControlMessage::SetTempo(bpm))
    }

    pub fn trigger(&self, track: usize, message: SynthMessage) -> Result<()> {
        self.send(ControlMessage::Trigger { track, message })
    }

    pub fn forward_midi(&self, event: MidiEvent) -> Result<()> {
        self.send(ControlMessage::Midi(event))
    }

    pub fn send(&self, message: ControlMessage) -> Result<()> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.push(message).map_err(|_| {
            warn!(?message, "control queue full, message dropped");
            EngineError::ControlQueueFull
        })
    }
}
