//! Interleaved signed 16-bit little-endian stereo PCM.

use crate::config::OverflowMode;
use crate::SAMPLE_RATE;

/// Full-scale multiplier from the `f64` mix domain to 16-bit samples.
pub const FULL_SCALE: f64 = 32767.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl PcmFormat {
    /// Stereo, 16-bit, 44.1 kHz: the only format the engine renders.
    pub const CD: Self = Self {
        sample_rate: SAMPLE_RATE,
        channels: 2,
        bits_per_sample: 16,
    };

    pub const fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample / 8) as usize
    }

    pub const fn bytes_per_frame(&self) -> usize {
        self.channels as usize * self.bytes_per_sample()
    }

    /// sample_rate * channels * bits_per_sample / 8
    pub const fn byte_rate(&self) -> u32 {
        self.sample_rate * self.channels as u32 * self.bits_per_sample as u32 / 8
    }

    /// channels * bits_per_sample / 8
    pub const fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }
}

/// Fold a truncated integer sample into 16 bits.
#[inline]
pub fn fold(value: i32, overflow: OverflowMode) -> i16 {
    match overflow {
        // keep the low 16 bits, exactly what byte-packing an int does
        OverflowMode::Wrap => value as i16,
        OverflowMode::Saturate => value.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
    }
}

/// Scale a mix-domain sample by `volume`, truncate toward zero and fold.
///
/// The multiplication order (`sample * 32767 * volume`) is part of the
/// rendered output and must not be reassociated.
#[inline]
pub fn quantize(sample: f64, volume: f64, overflow: OverflowMode) -> i16 {
    fold((sample * FULL_SCALE * volume) as i32, overflow)
}

/// Write one stereo frame as 4 little-endian bytes at the start of `out`.
#[inline]
pub fn write_frame(out: &mut [u8], left: i16, right: i16) {
    out[..2].copy_from_slice(&left.to_le_bytes());
    out[2..4].copy_from_slice(&right.to_le_bytes());
}

#[inline]
pub fn read_sample(bytes: &[u8]) -> i16 {
    i16::from_le_bytes([bytes[0], bytes[1]])
}

/// Decode an interleaved byte block into `(left, right)` pairs.
pub fn frames(block: &[u8]) -> impl Iterator<Item = (i16, i16)> + '_ {
    block
        .chunks_exact(4)
        .map(|f| (read_sample(&f[..2]), read_sample(&f[2..])))
}
