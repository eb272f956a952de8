//! Reverb - Room Simulation via Delay Networks
//!
//! Reverb simulates the sound of a space by creating many delayed, filtered
//! reflections of the input signal. This implementation uses the classic
//! Schroeder reverb algorithm, run twice with slightly different delay lengths
//! to produce a decorrelated stereo pair.
//!
//! # Schroeder Reverb Architecture
//!
//! ```text
//! Input ──┬──→ [Comb 1] ──┐
//!         ├──→ [Comb 2] ──┤
//!         ├──→ [Comb 3] ──┼──→ (+) ──→ [Allpass 1] ──→ [Allpass 2] ──→ Output
//!         └──→ [Comb 4] ──┘
//! ```
//!
//! ## Comb Filters
//!
//! A comb filter creates a series of equally-spaced echoes that decay over time.
//!
//! ```text
//! y[n] = x[n] + feedback * y[n - delay]
//! ```
//!
//! The delay times are chosen to be mutually prime (no common factors) to avoid
//! resonant buildup at specific frequencies.
//!
//! ## Allpass Filters
//!
//! ```text
//! y[n] = -g * x[n] + x[n - delay] + g * y[n - delay]
//! ```
//!
//! # Channel contract
//!
//! The mixer calls [`ReverbUnit::input`] with the voice's reverb send and then
//! [`ReverbUnit::process`] exactly once per frame. Coefficients are fixed when
//! the unit is built; nothing is shared between channels.

use crate::config::ReverbSettings;

/// Comb filter delay times in ms (mutually prime ratios)
const COMB_DELAYS_MS: [f64; 4] = [29.7, 37.1, 41.1, 43.7];
/// Allpass delay times in ms
const ALLPASS_DELAYS_MS: [f64; 2] = [5.0, 1.7];
/// Extra samples on the right-hand network to decorrelate the two sides.
const STEREO_SPREAD: usize = 23;

/// A damped comb filter for reverb
pub struct CombFilter {
    buffer: Vec<f64>,
    write_pos: usize,
    feedback: f64,
    damp: f64,
    filter_state: f64,
}

impl CombFilter {
    pub fn new(delay_samples: usize, feedback: f64, damp: f64) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            write_pos: 0,
            feedback: feedback.clamp(0.0, 0.99),
            damp: damp.clamp(0.0, 1.0),
            filter_state: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.buffer[self.write_pos];

        // One-pole lowpass filter for damping (absorbs high frequencies)
        self.filter_state = output * (1.0 - self.damp) + self.filter_state * self.damp;

        self.buffer[self.write_pos] = input + self.filter_state * self.feedback;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();

        output
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.write_pos = 0;
    }
}

/// An allpass filter for reverb diffusion
pub struct AllpassFilter {
    buffer: Vec<f64>,
    write_pos: usize,
    feedback: f64,
}

impl AllpassFilter {
    pub fn new(delay_samples: usize, feedback: f64) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            write_pos: 0,
            feedback: feedback.clamp(0.0, 0.9),
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let delayed = self.buffer[self.write_pos];

        let output = -self.feedback * input + delayed;
        self.buffer[self.write_pos] = input + self.feedback * output;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();

        output
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// One side of the stereo network: 4 parallel combs into 2 serial allpasses.
struct SchroederNetwork {
    combs: [CombFilter; 4],
    allpasses: [AllpassFilter; 2],
}

impl SchroederNetwork {
    fn new(sample_rate: f64, spread: usize, feedback: f64, damp: f64) -> Self {
        let samples = |ms: f64| (ms * sample_rate / 1000.0) as usize + spread;
        Self {
            combs: COMB_DELAYS_MS.map(|ms| CombFilter::new(samples(ms), feedback, damp)),
            allpasses: ALLPASS_DELAYS_MS.map(|ms| AllpassFilter::new(samples(ms), 0.5)),
        }
    }

    #[inline]
    fn process(&mut self, input: f64) -> f64 {
        // Sum outputs of all comb filters (parallel)
        let mut output = 0.0;
        for comb in &mut self.combs {
            output += comb.process(input);
        }
        output *= 0.25; // Normalize for 4 combs

        // Pass through allpass filters (series)
        for allpass in &mut self.allpasses {
            output = allpass.process(output);
        }

        output
    }

    fn reset(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::reset);
        self.allpasses.iter_mut().for_each(AllpassFilter::reset);
    }
}

/// Per-channel stereo reverb.
pub struct ReverbUnit {
    left: SchroederNetwork,
    right: SchroederNetwork,
    pending: f64,
}

impl ReverbUnit {
    pub fn new(settings: &ReverbSettings, sample_rate: f64) -> Self {
        // room size 0..1 maps to comb feedback 0.7..0.98
        let feedback = 0.7 + settings.room_size.clamp(0.0, 1.0) * 0.28;
        let damp = settings.damping.clamp(0.0, 1.0);
        Self {
            left: SchroederNetwork::new(sample_rate, 0, feedback, damp),
            right: SchroederNetwork::new(sample_rate, STEREO_SPREAD, feedback, damp),
            pending: 0.0,
        }
    }

    /// Queue the wet input for the next [`process`](Self::process) call.
    #[inline]
    pub fn input(&mut self, sample: f64) {
        self.pending = sample;
    }

    /// Advance every tap by one sample and return the stereo output.
    #[inline]
    pub fn process(&mut self) -> (f64, f64) {
        let input = std::mem::take(&mut self.pending);
        (self.left.process(input), self.right.process(input))
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.pending = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f64 = 44_100.0;

    #[test]
    fn comb_filter_creates_echo() {
        let mut comb = CombFilter::new(10, 0.5, 0.0);

        let first = comb.process(1.0);
        assert!(first.abs() < 0.01); // No output yet (delayed)

        for _ in 0..9 {
            comb.process(0.0);
        }

        let echo = comb.process(0.0);
        assert!(echo.abs() > 0.4, "expected echo, got {echo}");
    }

    #[test]
    fn allpass_preserves_energy() {
        let mut allpass = AllpassFilter::new(5, 0.5);

        let mut energy_in = 0.0;
        let mut energy_out = 0.0;
        for i in 0..100 {
            let input = if i < 10 { 1.0 } else { 0.0 };
            let output = allpass.process(input);
            energy_in += input * input;
            energy_out += output * output;
        }

        assert!(energy_out > energy_in * 0.8);
    }

    #[test]
    fn impulse_produces_stereo_tail() {
        let mut reverb = ReverbUnit::new(&ReverbSettings::default(), SAMPLE_RATE);
        reverb.input(1.0);
        let _ = reverb.process();

        let mut left_tail = false;
        let mut right_tail = false;
        for _ in 0..5000 {
            let (l, r) = reverb.process();
            left_tail |= l.abs() > 0.001;
            right_tail |= r.abs() > 0.001;
        }
        assert!(left_tail && right_tail, "reverb should ring on both sides");
    }

    #[test]
    fn sides_are_decorrelated() {
        let mut reverb = ReverbUnit::new(&ReverbSettings::default(), SAMPLE_RATE);
        reverb.input(1.0);
        let mut differs = false;
        for _ in 0..3000 {
            let (l, r) = reverb.process();
            differs |= (l - r).abs() > 1e-6;
        }
        assert!(differs);
    }

    #[test]
    fn input_is_consumed_once() {
        let mut reverb = ReverbUnit::new(&ReverbSettings::default(), SAMPLE_RATE);
        reverb.input(1.0);
        reverb.process();
        // the queued sample must not be fed again
        assert_eq!(reverb.pending, 0.0);
    }

    #[test]
    fn stays_stable_at_max_room() {
        let settings = ReverbSettings {
            room_size: 1.0,
            damping: 0.0,
        };
        let mut reverb = ReverbUnit::new(&settings, SAMPLE_RATE);
        for _ in 0..20_000 {
            reverb.input(0.1);
            let (l, r) = reverb.process();
            assert!(l.is_finite() && r.is_finite());
            assert!(l.abs() < 10.0 && r.abs() < 10.0, "unstable: {l} {r}");
        }
    }
}
