//! Live playback through cpal.
//!
//! cpal pulls audio from its own callback thread, so the render thread pushes
//! samples into an `rtrb` ring and the callback drains it. When the ring is
//! full the render thread sleeps in short polls until the callback has made
//! room: that wait is the blocking device write that paces the engine.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{debug, error, info, warn};

use super::PcmDevice;
use crate::error::{EngineError, Result};
use crate::io::pcm::{self, PcmFormat};

/// Ring size in frames; a little over two default blocks.
const RING_FRAMES: usize = 6144;
const POLL: Duration = Duration::from_millis(1);
/// How long a full ring may stay full before the device counts as stalled.
const STALL_TIMEOUT: Duration = Duration::from_secs(2);

pub struct CpalDevice {
    name: String,
    producer: Producer<i16>,
    failed: Arc<AtomicBool>,
    underruns: Arc<AtomicU64>,
    _stream: cpal::Stream,
}

impl CpalDevice {
    /// Open the host's default output at 44.1 kHz stereo.
    pub fn open_default() -> Result<Self> {
        let host = cpal::default_host();
        debug!(host = ?host.id(), "audio host");

        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::Device("no default output device available".into()))?;
        let name = device.name().unwrap_or_else(|_| "default output".to_string());

        let format = PcmFormat::CD;
        let supported = device
            .supported_output_configs()
            .map_err(|e| EngineError::Device(e.to_string()))?
            .filter(|c| {
                c.channels() >= format.channels
                    && c.min_sample_rate().0 <= format.sample_rate
                    && c.max_sample_rate().0 >= format.sample_rate
            })
            .min_by_key(|c| match c.sample_format() {
                SampleFormat::I16 => 0,
                SampleFormat::F32 => 1,
                _ => 2,
            })
            .ok_or_else(|| {
                EngineError::Device(format!("{name} cannot play {} Hz stereo", format.sample_rate))
            })?
            .with_sample_rate(cpal::SampleRate(format.sample_rate));

        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let channels = config.channels as usize;

        let (producer, consumer) = RingBuffer::<i16>::new(RING_FRAMES * format.channels as usize);
        let failed = Arc::new(AtomicBool::new(false));
        let underruns = Arc::new(AtomicU64::new(0));

        let stream = match sample_format {
            SampleFormat::I16 => build_stream::<i16>(&device, &config, consumer, channels, &failed, &underruns),
            SampleFormat::F32 => build_stream::<f32>(&device, &config, consumer, channels, &failed, &underruns),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, consumer, channels, &failed, &underruns),
            other => {
                return Err(EngineError::Device(format!("unsupported sample format {other}")));
            }
        }?;
        stream.play().map_err(|e| EngineError::Device(e.to_string()))?;

        info!(device = %name, channels, ?sample_format, "output stream started");
        Ok(Self {
            name,
            producer,
            failed,
            underruns,
            _stream: stream,
        })
    }

    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    fn check_failed(&self) -> Result<()> {
        if self.failed.load(Ordering::Acquire) {
            return Err(EngineError::Device(format!("{} reported a stream error", self.name)));
        }
        Ok(())
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut consumer: Consumer<i16>,
    channels: usize,
    failed: &Arc<AtomicBool>,
    underruns: &Arc<AtomicU64>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<i16>,
{
    let failed = Arc::clone(failed);
    let underruns = Arc::clone(underruns);
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut starved = false;
                for frame in data.chunks_mut(channels) {
                    let (left, right) = if consumer.slots() >= 2 {
                        (consumer.pop().unwrap_or(0), consumer.pop().unwrap_or(0))
                    } else {
                        starved = true;
                        (0, 0)
                    };
                    for (ch, out) in frame.iter_mut().enumerate() {
                        *out = match ch {
                            0 => T::from_sample(left),
                            1 => T::from_sample(right),
                            _ => T::EQUILIBRIUM,
                        };
                    }
                }
                if starved {
                    underruns.fetch_add(1, Ordering::Relaxed);
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
                failed.store(true, Ordering::Release);
            },
            None,
        )
        .map_err(|e| EngineError::Device(e.to_string()))
}

impl PcmDevice for CpalDevice {
    fn write(&mut self, block: &[u8]) -> Result<()> {
        self.check_failed()?;

        let mut samples = block.chunks_exact(2).map(pcm::read_sample);
        let mut remaining = block.len() / 2;
        let mut waiting_since: Option<Instant> = None;

        while remaining > 0 {
            let free = self.producer.slots();
            if free == 0 {
                let since = *waiting_since.get_or_insert_with(Instant::now);
                if since.elapsed() > STALL_TIMEOUT {
                    return Err(EngineError::Device(format!("{} stopped consuming audio", self.name)));
                }
                self.check_failed()?;
                thread::sleep(POLL);
                continue;
            }
            waiting_since = None;

            let chunk = self
                .producer
                .write_chunk_uninit(free.min(remaining))
                .map_err(|e| EngineError::Device(e.to_string()))?;
            remaining -= chunk.fill_from_iter(&mut samples);
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let capacity = self.producer.buffer().capacity();
        let deadline = Instant::now() + STALL_TIMEOUT;
        while self.producer.slots() < capacity {
            if Instant::now() > deadline {
                warn!(device = %self.name, "gave up waiting for the output ring to drain");
                break;
            }
            thread::sleep(POLL);
        }
        let underruns = self.underruns();
        if underruns > 0 {
            warn!(device = %self.name, underruns, "output underran during the session");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
