//! Where rendered blocks go: the live playback device and the capture file.
//!
//! Devices are opened on the render thread through a [`DeviceFactory`],
//! because platform audio streams are generally not `Send`.

pub mod cpal_device;
pub mod sink;

use std::thread;
use std::time::{Duration, Instant};

use tracing::info;

use crate::error::Result;
use crate::io::pcm::PcmFormat;

pub use cpal_device::CpalDevice;
pub use sink::{CaptureSummary, OutputSink};

/// A blocking sink for interleaved s16le stereo PCM at 44.1 kHz.
pub trait PcmDevice {
    /// Write one block. Blocks until the device has accepted all of it;
    /// this is what paces the render loop to real time.
    fn write(&mut self, block: &[u8]) -> Result<()>;

    /// Wait for queued audio to play out.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Opens a device on the thread that will use it.
pub type DeviceFactory = Box<dyn FnOnce() -> Result<Box<dyn PcmDevice>> + Send>;

/// The host's default output device via cpal.
pub fn default_device() -> DeviceFactory {
    Box::new(|| Ok(Box::new(CpalDevice::open_default()?) as Box<dyn PcmDevice>))
}

/// Discarding device; `paced` sleeps to keep real time like hardware would.
pub fn null_device(paced: bool) -> DeviceFactory {
    Box::new(move || Ok(Box::new(NullDevice::new(paced)) as Box<dyn PcmDevice>))
}

/// Drops every block. Used headless, in tests, and as the fallback when the
/// real device cannot be opened.
#[derive(Debug)]
pub struct NullDevice {
    paced: bool,
    /// Pacing anchor and frames written since it.
    anchor: Option<(Instant, u64)>,
    frames: u64,
}

impl NullDevice {
    pub fn new(paced: bool) -> Self {
        Self {
            paced,
            anchor: None,
            frames: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }
}

impl PcmDevice for NullDevice {
    fn write(&mut self, block: &[u8]) -> Result<()> {
        let format = PcmFormat::CD;
        let frames = (block.len() / format.bytes_per_frame()) as u64;
        self.frames += frames;
        if !self.paced {
            return Ok(());
        }

        let to_duration = |frames: u64| Duration::from_secs_f64(frames as f64 / format.sample_rate as f64);
        let now = Instant::now();
        let (started, sent) = self.anchor.get_or_insert((now, 0));
        *sent += frames;
        let mut due = *started + to_duration(*sent);
        // more than a block behind (after a pause, say): drop the lost time
        if now > due + to_duration(frames) {
            *started = now;
            *sent = frames;
            due = now + to_duration(frames);
        }
        if due > now {
            thread::sleep(due - now);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        if self.paced {
            "null (paced)"
        } else {
            "null"
        }
    }
}

/// Open the device from `factory`, or fall back to a paced [`NullDevice`].
pub(crate) fn open_or_fallback(factory: DeviceFactory) -> Box<dyn PcmDevice> {
    match factory() {
        Ok(device) => {
            info!(device = device.name(), "audio device opened");
            device
        }
        Err(err) => {
            tracing::error!(error = %err, "audio device unavailable, rendering to a paced null device");
            Box::new(NullDevice::new(true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineError;

    #[test]
    fn null_device_counts_frames() {
        let mut device = NullDevice::new(false);
        device.write(&[0u8; 4096]).unwrap();
        device.write(&[0u8; 4096]).unwrap();
        assert_eq!(device.frames_written(), 2048);
    }

    #[test]
    fn paced_null_device_keeps_real_time() {
        let mut device = NullDevice::new(true);
        let start = Instant::now();
        // 4410 frames = 100 ms
        device.write(&[0u8; 4410 * 4]).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(95));
    }

    #[test]
    fn paced_null_device_does_not_catch_up_after_a_stall() {
        // 441 frames = 10 ms
        let block = [0u8; 441 * 4];
        let mut device = NullDevice::new(true);
        device.write(&block).unwrap();
        thread::sleep(Duration::from_millis(300));

        let start = Instant::now();
        for _ in 0..20 {
            device.write(&block).unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(150));
        assert_eq!(device.frames_written(), 21 * 441);
    }

    #[test]
    fn failing_factory_falls_back() {
        let factory: DeviceFactory = Box::new(|| Err(EngineError::Device("unplugged".into())));
        let device = open_or_fallback(factory);
        assert_eq!(device.name(), "null (paced)");
    }
}
