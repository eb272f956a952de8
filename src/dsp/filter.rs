use std::f64::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
| type              | constructed by       | passes          | rejects      |
| ----------------- | -------------------- | --------------- | ------------ |
| low-pass          | LPF                  | below cutoff    | above cutoff |
| high-pass         | HPF                  | above cutoff    | below cutoff |
| band-pass         | LPF ∘ HPF (series)   | between cutoffs | outside      |
| notch / band-stop | LPF + HPF (parallel) | outside         | between      |

Topology-preserving transform state-variable filter. One set of integrator
states yields all four responses, so voices that sweep the cutoff every
sample (bassline env mod) only pay for one `tan` per sample.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

pub struct FilterOutputs {
    pub lowpass: f64,
    pub bandpass: f64,
    pub highpass: f64,
    pub notch: f64,
}

impl FilterOutputs {
    #[inline]
    pub fn select(&self, filter_type: FilterType) -> f64 {
        match filter_type {
            FilterType::LowPass => self.lowpass,
            FilterType::HighPass => self.highpass,
            FilterType::BandPass => self.bandpass,
            FilterType::Notch => self.notch,
        }
    }
}

pub struct SvFilter {
    ic1eq: f64, // First integrator's memory
    ic2eq: f64, // Second integrator's memory

    pub cutoff_hz: f64,
    /// 0.0 (flat) to just under 1.0 (self-oscillation)
    pub resonance: f64,
    filter_type: FilterType,
}

impl SvFilter {
    pub fn new(filter_type: FilterType, cutoff_hz: f64) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz,
            resonance: 0.0,
            filter_type,
        }
    }

    pub fn lowpass(cutoff_hz: f64) -> Self {
        Self::new(FilterType::LowPass, cutoff_hz)
    }

    pub fn highpass(cutoff_hz: f64) -> Self {
        Self::new(FilterType::HighPass, cutoff_hz)
    }

    pub fn bandpass(cutoff_hz: f64) -> Self {
        Self::new(FilterType::BandPass, cutoff_hz)
    }

    pub fn with_resonance(mut self, resonance: f64) -> Self {
        self.resonance = resonance.clamp(0.0, 0.98);
        self
    }

    #[inline]
    fn compute_g(cutoff_hz: f64, sample_rate: f64) -> f64 {
        // keep the prewarped cutoff safely under Nyquist
        let cutoff = cutoff_hz.clamp(10.0, sample_rate * 0.45);
        (TAU * cutoff / (2.0 * sample_rate)).tan()
    }

    pub fn next_sample(&mut self, sample: f64, k: f64, g: f64) -> FilterOutputs {
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - k * v1 - v2,
            notch: sample - k * v1,
        }
    }

    /// Filter one sample at the stored cutoff and resonance.
    #[inline]
    pub fn process(&mut self, sample: f64, sample_rate: f64) -> f64 {
        self.process_at(sample, self.cutoff_hz, sample_rate)
    }

    /// Filter one sample at a per-sample cutoff (envelope sweeps).
    #[inline]
    pub fn process_at(&mut self, sample: f64, cutoff_hz: f64, sample_rate: f64) -> f64 {
        let g = Self::compute_g(cutoff_hz, sample_rate);
        let k = 2.0 - (2.0 * self.resonance);
        let filter_type = self.filter_type;
        self.next_sample(sample, k, g).select(filter_type)
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f64 = 44_100.0;

    fn rms_through(filter: &mut SvFilter, freq: f64) -> f64 {
        let n = 4410;
        let mut sum = 0.0;
        for i in 0..n {
            let x = (TAU * freq * i as f64 / SAMPLE_RATE).sin();
            let y = filter.process(x, SAMPLE_RATE);
            if i > n / 2 {
                sum += y * y;
            }
        }
        (sum / (n / 2) as f64).sqrt()
    }

    #[test]
    fn lowpass_attenuates_highs() {
        let low = rms_through(&mut SvFilter::lowpass(500.0), 100.0);
        let high = rms_through(&mut SvFilter::lowpass(500.0), 8000.0);
        assert!(low > 0.5, "passband rms {low}");
        assert!(high < 0.05, "stopband rms {high}");
    }

    #[test]
    fn highpass_attenuates_lows() {
        let low = rms_through(&mut SvFilter::highpass(5000.0), 60.0);
        let high = rms_through(&mut SvFilter::highpass(5000.0), 15000.0);
        assert!(low < 0.05, "stopband rms {low}");
        assert!(high > 0.5, "passband rms {high}");
    }

    #[test]
    fn resonance_stays_finite() {
        let mut filter = SvFilter::lowpass(1000.0).with_resonance(1.0);
        for i in 0..10_000 {
            let x = if i % 100 == 0 { 1.0 } else { 0.0 };
            assert!(filter.process(x, SAMPLE_RATE).is_finite());
        }
    }
}
