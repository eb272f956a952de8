/*
Audio Oscillator
================

Phase-accumulator oscillators. The phase runs 0.0 → 1.0 and wraps once per
cycle; each waveform is a function of the phase:

  Sine       sin(2π·phase)                 fundamental only
  Saw        2·phase - 1                   all harmonics, 1/n
  Square     ±1 around phase 0.5           odd harmonics, 1/n
  Triangle   folded saw                    odd harmonics, 1/n²
  Noise      xorshift white noise          no pitch

The waveforms are naive (not band-limited). The bassline filter and the
envelope sweeps sit right after them, which keeps aliasing in check for the
pitches a groovebox plays.

Noise is deterministic: every generator starts from a fixed seed so two
sessions built the same way render identical PCM.
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::f64::consts::TAU;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Saw,
    Square,
    Triangle,
    Noise,
}

impl Waveform {
    /// Map a 0-127 controller value onto the pitched waveforms.
    pub fn from_controller(value: u8) -> Self {
        match value / 32 {
            0 => Waveform::Saw,
            1 => Waveform::Square,
            2 => Waveform::Triangle,
            _ => Waveform::Sine,
        }
    }
}

/// 32-bit xorshift white noise in [-1, 1).
#[derive(Debug, Clone)]
pub struct Noise {
    state: u32,
}

impl Noise {
    pub const DEFAULT_SEED: u32 = 0x9E37_79B9;

    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { Self::DEFAULT_SEED } else { seed },
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x as f64 / u32::MAX as f64) * 2.0 - 1.0
    }
}

impl Default for Noise {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}

#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f64,
    noise: Noise,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
            noise: Noise::default(),
        }
    }

    pub fn sine() -> Self {
        Self::new(Waveform::Sine)
    }

    pub fn saw() -> Self {
        Self::new(Waveform::Saw)
    }

    pub fn square() -> Self {
        Self::new(Waveform::Square)
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Restart the cycle (drum hits want a consistent transient).
    pub fn reset_phase(&mut self) {
        self.phase = 0.0;
    }

    /// Produce one sample at `frequency` and advance the phase.
    #[inline]
    pub fn next_sample(&mut self, frequency: f64, sample_rate: f64) -> f64 {
        let out = match self.waveform {
            Waveform::Sine => (TAU * self.phase).sin(),
            Waveform::Saw => 2.0 * self.phase - 1.0,
            Waveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 1.0 - 4.0 * (self.phase - 0.5).abs(),
            Waveform::Noise => self.noise.next_sample(),
        };

        self.phase += frequency / sample_rate;
        self.phase -= self.phase.floor();

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_sine() {
        let sample_rate = 48_000.0;
        let frequency = 440.0;
        let mut osc = Oscillator::sine();

        let samples: Vec<f64> = (0..128).map(|_| osc.next_sample(frequency, sample_rate)).collect();

        let n = 12;
        let expected = (TAU * frequency * n as f64 / sample_rate).sin();
        assert!((samples[n] - expected).abs() < 1e-9, "expected {expected}, got {}", samples[n]);
    }

    #[test]
    fn pitched_waveforms_stay_in_range() {
        for waveform in [Waveform::Saw, Waveform::Square, Waveform::Triangle] {
            let mut osc = Oscillator::new(waveform);
            for _ in 0..1000 {
                let s = osc.next_sample(1234.5, 44_100.0);
                assert!((-1.0..=1.0).contains(&s), "{waveform:?} produced {s}");
            }
        }
    }

    #[test]
    fn noise_is_deterministic() {
        let mut a = Noise::default();
        let mut b = Noise::default();
        for _ in 0..100 {
            let x = a.next_sample();
            assert_eq!(x, b.next_sample());
            assert!((-1.0..=1.0).contains(&x));
        }
    }

    #[test]
    fn controller_selects_waveform() {
        assert_eq!(Waveform::from_controller(0), Waveform::Saw);
        assert_eq!(Waveform::from_controller(40), Waveform::Square);
        assert_eq!(Waveform::from_controller(127), Waveform::Sine);
    }
}
