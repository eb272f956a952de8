/*
Sequencers
==========

Every track owns one sequencer. The render loop calls `tick` exactly once per
frame for every track, in channel order, before any synthesizer is pulled.

Step clock
----------

Step sequencers count frames and move to the next step every
`ticks_per_step` frames, where one step is a sixteenth note:

    ticks_per_step = floor(44100 * 60 / bpm / 4)        (5512 at 120 BPM)

    tick:     0 ... 5511 | 5512 ... 11023 | 11024 ...
    step:     0          | 1              | 2
    boundary: ^          ^                ^

The very first tick is a boundary for step 0, so a pattern's first step
sounds on frame 0. Triggers are only sent on boundaries (and, for the
bassline, at the gate-close point half way through a step), so a tick is
O(1) whatever the pattern holds.

`step()` is what the outside world polls; a caller detects a step change by
comparing against the value it saw last time.
*/

pub mod bassline;
pub mod instrument;
pub mod midi;
pub mod pattern;
pub mod rhythm;

pub use bassline::BasslineSequencer;
pub use instrument::InstrumentSequencer;
pub use midi::MidiSequencer;
pub use pattern::{BassStep, BasslinePattern, DrumVoice, NotePattern, NoteStep, RhythmPattern};
pub use rhythm::RhythmSequencer;

use crate::synth::{SynthMessage, Synthesizer};
use crate::SAMPLE_RATE;

/// Trigger source for one track.
pub trait Sequencer: Send {
    /// Advance one frame, forwarding any due trigger to `synth`.
    fn tick(&mut self, synth: Option<&mut dyn Synthesizer>);

    /// Current step index.
    fn step(&self) -> usize;

    /// Frames ticked so far.
    fn ticks(&self) -> u64;

    /// Track volume in [0.0, 1.0].
    fn volume(&self) -> f64;

    fn set_volume(&mut self, volume: f64);

    /// Change tempo without moving the play position.
    fn set_tempo(&mut self, bpm: f64);

    fn name(&self) -> &str;
}

/// Frames per sixteenth note at `bpm`.
pub fn ticks_per_step(bpm: f64) -> u64 {
    ((SAMPLE_RATE as f64 * 60.0 / bpm / 4.0).floor() as u64).max(1)
}

/// Result of advancing a [`StepClock`] by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    pub step: usize,
    /// Frame offset inside the step; zero on a boundary.
    pub offset: u64,
}

impl ClockTick {
    pub fn is_boundary(&self) -> bool {
        self.offset == 0
    }
}

#[derive(Debug, Clone)]
pub struct StepClock {
    steps: usize,
    ticks_per_step: u64,
    counter: u64,
    step: usize,
    ticks: u64,
}

impl StepClock {
    pub fn new(bpm: f64, steps: usize) -> Self {
        Self {
            steps: steps.max(1),
            ticks_per_step: ticks_per_step(bpm),
            counter: 0,
            step: 0,
            ticks: 0,
        }
    }

    #[inline]
    pub fn advance(&mut self) -> ClockTick {
        let offset = self.counter;
        if offset == 0 && self.ticks > 0 {
            self.step = (self.step + 1) % self.steps;
        }

        self.ticks += 1;
        self.counter += 1;
        if self.counter >= self.ticks_per_step {
            self.counter = 0;
        }

        ClockTick {
            step: self.step,
            offset,
        }
    }

    pub fn set_tempo(&mut self, bpm: f64) {
        self.ticks_per_step = ticks_per_step(bpm);
        if self.counter >= self.ticks_per_step {
            self.counter = 0;
        }
    }

    pub fn set_steps(&mut self, steps: usize) {
        self.steps = steps.max(1);
        self.step %= self.steps;
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn ticks_per_step(&self) -> u64 {
        self.ticks_per_step
    }
}

/// Forward `message` if the track has a synthesizer.
#[inline]
pub(crate) fn send(synth: &mut Option<&mut dyn Synthesizer>, message: SynthMessage) {
    if let Some(synth) = synth.as_deref_mut() {
        synth.handle(message);
    }
}

#[inline]
pub(crate) fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_per_step_at_120_bpm() {
        assert_eq!(ticks_per_step(120.0), 5512);
        assert_eq!(ticks_per_step(60.0), 11025);
    }

    #[test]
    fn first_tick_is_a_boundary() {
        let mut clock = StepClock::new(120.0, 16);
        let tick = clock.advance();
        assert!(tick.is_boundary());
        assert_eq!(tick.step, 0);
        assert!(!clock.advance().is_boundary());
    }

    #[test]
    fn step_advances_every_ticks_per_step() {
        let mut clock = StepClock::new(120.0, 16);
        let tps = clock.ticks_per_step();
        let mut boundaries = Vec::new();
        for frame in 0..tps * 3 {
            let tick = clock.advance();
            if tick.is_boundary() {
                boundaries.push((frame, tick.step));
            }
        }
        assert_eq!(boundaries, vec![(0, 0), (tps, 1), (tps * 2, 2)]);
    }

    #[test]
    fn step_wraps_after_pattern_length() {
        let mut clock = StepClock::new(120.0, 4);
        for _ in 0..clock.ticks_per_step() * 4 {
            clock.advance();
        }
        assert_eq!(clock.step(), 3);
        assert_eq!(clock.advance().step, 0);
    }

    #[test]
    fn tempo_change_keeps_position() {
        let mut clock = StepClock::new(120.0, 16);
        for _ in 0..clock.ticks_per_step() + 10 {
            clock.advance();
        }
        clock.set_tempo(240.0);
        assert_eq!(clock.step(), 1);
        assert_eq!(clock.ticks_per_step(), 2756);
    }

    #[test]
    fn volume_is_clamped() {
        assert_eq!(clamp_volume(1.5), 1.0);
        assert_eq!(clamp_volume(-0.1), 0.0);
        assert_eq!(clamp_volume(f64::NAN), 0.0);
    }
}
