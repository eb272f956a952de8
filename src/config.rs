//! Engine configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::DEFAULT_BLOCK_FRAMES;

/// How a mixed sample that does not fit in 16 bits is packed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowMode {
    /// Keep the low 16 bits of the truncated integer. Loud mixes wrap around,
    /// which is bit-exact with the capture format this engine replaces.
    #[default]
    Wrap,
    /// Clamp to `i16::MIN..=i16::MAX` before packing.
    Saturate,
}

/// Delay line parameters shared by every channel's delay unit.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelaySettings {
    /// Ring buffer capacity in samples (power of two).
    pub capacity: usize,
    /// Tap distance in samples.
    pub delay_frames: usize,
    /// Gain applied to the tap and fed back into the line (0.0 - 0.99).
    pub feedback: f64,
}

impl Default for DelaySettings {
    fn default() -> Self {
        Self {
            capacity: 1 << 16,
            // dotted eighth at 120 BPM
            delay_frames: 16_537,
            feedback: 0.5,
        }
    }
}

/// Reverb network parameters shared by every channel's reverb unit.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbSettings {
    /// 0.0 - 1.0, scales comb feedback (longer tail when larger).
    pub room_size: f64,
    /// 0.0 - 1.0, high frequency absorption inside the combs.
    pub damping: f64,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.4,
        }
    }
}

/// Everything a [`Session`](crate::engine::Session) and
/// [`RenderLoop`](crate::engine::RenderLoop) need to know up front.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Frames per render block. Must be a power of two.
    pub block_frames: usize,
    /// Initial tempo for every sequencer.
    pub bpm: f64,
    pub overflow: OverflowMode,
    /// Raw PCM capture written once per block.
    pub raw_capture_path: PathBuf,
    /// WAV container produced from the raw capture on stop.
    pub wav_path: PathBuf,
    /// Leave the raw capture on disk after the WAV is written.
    pub keep_raw_capture: bool,
    /// Idle sleep between checks while paused.
    pub pause_poll: Duration,
    pub delay: DelaySettings,
    pub reverb: ReverbSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_frames: DEFAULT_BLOCK_FRAMES,
            bpm: 120.0,
            overflow: OverflowMode::Wrap,
            raw_capture_path: PathBuf::from("capture.raw"),
            wav_path: PathBuf::from("capture.wav"),
            keep_raw_capture: true,
            pause_poll: Duration::from_millis(25),
            delay: DelaySettings::default(),
            reverb: ReverbSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_frames(mut self, frames: usize) -> Self {
        self.block_frames = frames;
        self
    }

    pub fn bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }

    pub fn overflow(mut self, overflow: OverflowMode) -> Self {
        self.overflow = overflow;
        self
    }

    /// Set both capture paths at once.
    pub fn capture_paths(mut self, raw: impl AsRef<Path>, wav: impl AsRef<Path>) -> Self {
        self.raw_capture_path = raw.as_ref().to_path_buf();
        self.wav_path = wav.as_ref().to_path_buf();
        self
    }

    pub fn keep_raw_capture(mut self, keep: bool) -> Self {
        self.keep_raw_capture = keep;
        self
    }

    pub fn pause_poll(mut self, poll: Duration) -> Self {
        self.pause_poll = poll;
        self
    }

    pub fn delay(mut self, delay: DelaySettings) -> Self {
        self.delay = delay;
        self
    }

    pub fn reverb(mut self, reverb: ReverbSettings) -> Self {
        self.reverb = reverb;
        self
    }

    /// Bytes in one render block of stereo s16 PCM.
    pub fn block_bytes(&self) -> usize {
        self.block_frames * crate::io::pcm::PcmFormat::CD.bytes_per_frame()
    }

    /// Reject settings the render path cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.block_frames == 0 || !self.block_frames.is_power_of_two() {
            return Err(EngineError::Config(format!(
                "block_frames must be a power of two, got {}",
                self.block_frames
            )));
        }
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(EngineError::Config(format!(
                "bpm must be positive, got {}",
                self.bpm
            )));
        }
        if !self.delay.capacity.is_power_of_two() {
            return Err(EngineError::Config(format!(
                "delay capacity must be a power of two, got {}",
                self.delay.capacity
            )));
        }
        if self.delay.delay_frames == 0 || self.delay.delay_frames >= self.delay.capacity {
            return Err(EngineError::Config(format!(
                "delay length {} must be within 1..{}",
                self.delay.delay_frames, self.delay.capacity
            )));
        }
        if !(0.0..1.0).contains(&self.delay.feedback) {
            return Err(EngineError::Config(format!(
                "delay feedback must be in [0, 1), got {}",
                self.delay.feedback
            )));
        }
        if !(0.0..=1.0).contains(&self.reverb.room_size) || !(0.0..=1.0).contains(&self.reverb.damping)
        {
            return Err(EngineError::Config(
                "reverb room size and damping must be in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}
