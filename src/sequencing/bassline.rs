use super::{clamp_volume, send, Sequencer, StepClock};
use crate::sequencing::pattern::BasslinePattern;
use crate::synth::{SynthMessage, Synthesizer};

/// Acid-style bassline sequencer.
///
/// A gated step opens on its boundary and closes half way through the step,
/// unless the next step slides, in which case the gate stays open and the
/// next note is sent while the previous one is still held (legato).
pub struct BasslineSequencer {
    name: String,
    clock: StepClock,
    pattern: BasslinePattern,
    volume: f64,
    sounding: Option<u8>,
}

impl BasslineSequencer {
    pub fn new(name: impl Into<String>, pattern: BasslinePattern, bpm: f64) -> Self {
        Self {
            name: name.into(),
            clock: StepClock::new(bpm, pattern.len()),
            pattern,
            volume: 1.0,
            sounding: None,
        }
    }

    pub fn pattern(&self) -> &BasslinePattern {
        &self.pattern
    }

    pub fn set_pattern(&mut self, pattern: BasslinePattern) {
        self.clock.set_steps(pattern.len());
        self.pattern = pattern;
    }
}

impl Sequencer for BasslineSequencer {
    fn tick(&mut self, mut synth: Option<&mut dyn Synthesizer>) {
        let tick = self.clock.advance();
        let step = *self.pattern.get(tick.step);

        if tick.is_boundary() {
            match (self.sounding, step.gate) {
                (Some(_), true) if step.slide => {
                    // legato: the synth glides, the old note is never released
                    send(&mut synth, SynthMessage::note_on(step.note, step.velocity()));
                    self.sounding = Some(step.note);
                }
                (held, true) => {
                    if let Some(held) = held {
                        send(&mut synth, SynthMessage::note_off(held));
                    }
                    send(&mut synth, SynthMessage::note_on(step.note, step.velocity()));
                    self.sounding = Some(step.note);
                }
                (Some(held), false) => {
                    send(&mut synth, SynthMessage::note_off(held));
                    self.sounding = None;
                }
                (None, false) => {}
            }
            return;
        }

        if tick.offset == self.clock.ticks_per_step() / 2 {
            if let Some(held) = self.sounding {
                let next = self.pattern.get(tick.step + 1);
                if !next.ties_previous() {
                    send(&mut synth, SynthMessage::note_off(held));
                    self.sounding = None;
                }
            }
        }
    }

    fn step(&self) -> usize {
        self.clock.step()
    }

    fn ticks(&self) -> u64 {
        self.clock.ticks()
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = clamp_volume(volume);
    }

    fn set_tempo(&mut self, bpm: f64) {
        self.clock.set_tempo(bpm);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencing::pattern::BassStep;
    use crate::sequencing::testing::run;
    use crate::sequencing::ticks_per_step;

    #[test]
    fn gate_closes_half_way() {
        let pattern = BasslinePattern::from_steps(vec![BassStep::note(36), BassStep::REST]);
        let mut seq = BasslineSequencer::new("bass", pattern, 120.0);

        let tps = ticks_per_step(120.0);
        let log = run(&mut seq, tps * 2);

        assert_eq!(
            log,
            vec![
                (0, SynthMessage::note_on(36, 100)),
                (tps / 2, SynthMessage::note_off(36)),
            ]
        );
    }

    #[test]
    fn slide_keeps_gate_open() {
        let pattern = BasslinePattern::from_steps(vec![
            BassStep::note(36).accent(),
            BassStep::note(43).slide(),
            BassStep::REST,
        ]);
        let mut seq = BasslineSequencer::new("bass", pattern, 120.0);

        let tps = ticks_per_step(120.0);
        let log = run(&mut seq, tps * 3);

        assert_eq!(
            log,
            vec![
                (0, SynthMessage::note_on(36, 127)),
                (tps, SynthMessage::note_on(43, 100)),
                (tps + tps / 2, SynthMessage::note_off(43)),
            ]
        );
    }

    #[test]
    fn identical_runs_are_identical() {
        let pattern = BasslinePattern::from_steps(vec![
            BassStep::note(36),
            BassStep::note(48).slide().accent(),
            BassStep::REST,
            BassStep::note(39),
        ]);
        let mut a = BasslineSequencer::new("a", pattern.clone(), 133.0);
        let mut b = BasslineSequencer::new("b", pattern, 133.0);

        let frames = ticks_per_step(133.0) * 12;
        assert_eq!(run(&mut a, frames), run(&mut b, frames));
        assert_eq!(a.step(), b.step());
    }
}
