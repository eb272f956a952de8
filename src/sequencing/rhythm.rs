use super::{clamp_volume, send, Sequencer, StepClock};
use crate::sequencing::pattern::{RhythmPattern, ACCENT_VELOCITY, NORMAL_VELOCITY};
use crate::synth::{SynthMessage, Synthesizer};

/// Drum machine sequencer. Every hit is a one-shot note-on.
pub struct RhythmSequencer {
    name: String,
    clock: StepClock,
    pattern: RhythmPattern,
    volume: f64,
}

impl RhythmSequencer {
    pub fn new(name: impl Into<String>, pattern: RhythmPattern, bpm: f64) -> Self {
        Self {
            name: name.into(),
            clock: StepClock::new(bpm, pattern.len()),
            pattern,
            volume: 1.0,
        }
    }

    pub fn pattern(&self) -> &RhythmPattern {
        &self.pattern
    }

    pub fn pattern_mut(&mut self) -> &mut RhythmPattern {
        &mut self.pattern
    }
}

impl Sequencer for RhythmSequencer {
    fn tick(&mut self, mut synth: Option<&mut dyn Synthesizer>) {
        let tick = self.clock.advance();
        if !tick.is_boundary() {
            return;
        }

        let velocity = if self.pattern.accented(tick.step) {
            ACCENT_VELOCITY
        } else {
            NORMAL_VELOCITY
        };
        for voice in self.pattern.hits(tick.step) {
            send(&mut synth, SynthMessage::note_on(voice.note(), velocity));
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
    use crate::sequencing::pattern::DrumVoice;
    use crate::sequencing::testing::run;
    use crate::sequencing::ticks_per_step;

    #[test]
    fn fires_every_voice_on_its_steps() {
        let pattern = RhythmPattern::new(4)
            .with_row(DrumVoice::Kick, "x.x.")
            .with_row(DrumVoice::ClosedHat, "xxxx")
            .with_accents("x...");
        let mut seq = RhythmSequencer::new("drums", pattern, 120.0);

        let tps = ticks_per_step(120.0);
        let log = run(&mut seq, tps * 2);

        assert_eq!(
            log,
            vec![
                (0, SynthMessage::note_on(36, 127)),
                (0, SynthMessage::note_on(42, 127)),
                (tps, SynthMessage::note_on(42, 100)),
            ]
        );
    }

    #[test]
    fn pattern_loops() {
        let pattern = RhythmPattern::new(2).with_row(DrumVoice::Snare, "x.");
        let mut seq = RhythmSequencer::new("drums", pattern, 120.0);

        let tps = ticks_per_step(120.0);
        let log = run(&mut seq, tps * 4);
        let at: Vec<u64> = log.iter().map(|(t, _)| *t).collect();
        assert_eq!(at, vec![0, tps * 2]);
    }
}
