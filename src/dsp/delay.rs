/*
Feedback Delay
==============

Every mix channel owns one delay unit. The voice routes part of its signal
into it through the delay send; the tap comes back into the dry mix.

  write_pos     Next slot to be written. Advances by one per frame and wraps
                with a mask, so the capacity is always a power of two.

  delay_frames  Distance between the slot just written and the tap.

  feedback      Gain applied to the tap. The attenuated tap is the unit's
                output AND is added back into the slot just written, so it
                comes around again `delay_frames` later.


Topology (feedback comb)
------------------------

    input ──→ [ buffer[w] ] ─ ─ ─ delay_frames ─ ─ ─→ tap
                   ↑                                   │
                   └──────────── (+) ←── × feedback ←──┘
                                              │
                                              └──→ output (y, y)

With an impulse of 1.0 at frame 0 the output is 0 until frame D, then
feedback, feedback², feedback³ ... at frames D, 2D, 3D: a geometric decay.

Call order matters: `input` first, then `output`, once per frame. Swapping
them moves every echo one frame later.
*/

use crate::config::DelaySettings;

pub struct DelayUnit {
    buffer: Vec<f64>,
    mask: usize,
    write_pos: usize,
    delay_frames: usize,
    feedback: f64,
}

impl DelayUnit {
    /// Build a delay from engine settings. `capacity` is rounded up to a power
    /// of two and the delay length clamped to fit inside it.
    pub fn new(settings: &DelaySettings) -> Self {
        Self::with_params(settings.capacity, settings.delay_frames, settings.feedback)
    }

    pub fn with_params(capacity: usize, delay_frames: usize, feedback: f64) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        Self {
            buffer: vec![0.0; capacity],
            mask: capacity - 1,
            write_pos: 0,
            delay_frames: delay_frames.clamp(1, capacity - 1),
            feedback: feedback.clamp(0.0, 0.99),
        }
    }

    /// Write one sample at the cursor and advance it.
    #[inline]
    pub fn input(&mut self, sample: f64) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) & self.mask;
    }

    /// Read the tap, feed it back into the line and return it as a stereo pair.
    #[inline]
    pub fn output(&mut self) -> (f64, f64) {
        let last = (self.write_pos + self.mask) & self.mask;
        let tap = (last + self.buffer.len() - self.delay_frames) & self.mask;

        let y = self.buffer[tap] * self.feedback;
        self.buffer[last] += y;

        (y, y)
    }

    pub fn set_feedback(&mut self, feedback: f64) {
        self.feedback = feedback.clamp(0.0, 0.99);
    }

    pub fn set_delay_frames(&mut self, delay_frames: usize) {
        self.delay_frames = delay_frames.clamp(1, self.mask);
    }

    pub fn feedback(&self) -> f64 {
        self.feedback
    }

    pub fn delay_frames(&self) -> usize {
        self.delay_frames
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(delay: &mut DelayUnit, input: &[f64], frames: usize) -> Vec<f64> {
        (0..frames)
            .map(|i| {
                delay.input(input.get(i).copied().unwrap_or(0.0));
                delay.output().0
            })
            .collect()
    }

    #[test]
    fn impulse_decays_geometrically() {
        let feedback = 0.5;
        let mut delay = DelayUnit::with_params(64, 10, feedback);
        let out = run(&mut delay, &[1.0], 45);

        for (i, &sample) in out.iter().enumerate() {
            if i % 10 == 0 && i > 0 {
                let expected = feedback.powi((i / 10) as i32);
                assert!(
                    (sample - expected).abs() < 1e-12,
                    "echo at {i}: expected {expected}, got {sample}"
                );
            } else {
                assert_eq!(sample, 0.0, "frame {i} should be silent");
            }
        }
    }

    #[test]
    fn tap_is_feedback_times_history() {
        let mut delay = DelayUnit::with_params(32, 3, 0.25);
        let input = [0.8, -0.4, 0.2, 0.0, 0.0, 0.0];
        let out = run(&mut delay, &input, 6);
        assert_eq!(&out[..3], &[0.0, 0.0, 0.0]);
        assert!((out[3] - 0.25 * 0.8).abs() < 1e-12);
        assert!((out[4] - 0.25 * -0.4).abs() < 1e-12);
        assert!((out[5] - 0.25 * 0.2).abs() < 1e-12);
    }

    #[test]
    fn write_position_wraps() {
        let mut delay = DelayUnit::with_params(8, 5, 0.9);
        // 3 laps around the ring, output must stay finite and bounded
        for i in 0..24 {
            delay.input(if i == 0 { 1.0 } else { 0.0 });
            let (l, r) = delay.output();
            assert_eq!(l, r);
            assert!(l.abs() <= 1.0);
        }
    }

    #[test]
    fn capacity_rounds_up_and_clamps_length() {
        let delay = DelayUnit::with_params(100, 500, 2.0);
        assert_eq!(delay.capacity(), 128);
        assert_eq!(delay.delay_frames(), 127);
        assert_eq!(delay.feedback(), 0.99);
    }
}
