use super::{clamp_volume, send, Sequencer, StepClock};
use crate::sequencing::pattern::NotePattern;
use crate::synth::{SynthMessage, Synthesizer};

/// Pattern-driven sequencer for pitched instruments.
///
/// In drum mode every hit is a one-shot note-on and no note-offs are sent.
pub struct InstrumentSequencer {
    name: String,
    clock: StepClock,
    pattern: NotePattern,
    drum_mode: bool,
    volume: f64,
    /// Note currently held and the boundaries left until its note-off.
    sounding: Option<(u8, usize)>,
}

impl InstrumentSequencer {
    pub fn new(name: impl Into<String>, pattern: NotePattern, bpm: f64) -> Self {
        Self {
            name: name.into(),
            clock: StepClock::new(bpm, pattern.len()),
            pattern,
            drum_mode: false,
            volume: 1.0,
            sounding: None,
        }
    }

    pub fn drum_mode(mut self, enabled: bool) -> Self {
        self.drum_mode = enabled;
        self
    }

    pub fn is_drum_mode(&self) -> bool {
        self.drum_mode
    }

    pub fn pattern(&self) -> &NotePattern {
        &self.pattern
    }

    /// Swap the pattern; takes effect on the next boundary.
    pub fn set_pattern(&mut self, pattern: NotePattern) {
        self.clock.set_steps(pattern.len());
        self.pattern = pattern;
    }
}

impl Sequencer for InstrumentSequencer {
    fn tick(&mut self, mut synth: Option<&mut dyn Synthesizer>) {
        let tick = self.clock.advance();
        if !tick.is_boundary() {
            return;
        }

        if let Some((note, remaining)) = self.sounding {
            if remaining <= 1 {
                send(&mut synth, SynthMessage::note_off(note));
                self.sounding = None;
            } else {
                self.sounding = Some((note, remaining - 1));
            }
        }

        let Some(step) = self.pattern.get(tick.step).copied() else {
            return;
        };

        if !self.drum_mode {
            if let Some((held, _)) = self.sounding.take() {
                send(&mut synth, SynthMessage::note_off(held));
            }
            self.sounding = Some((step.note, step.length));
        }
        send(&mut synth, SynthMessage::note_on(step.note, step.velocity));
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
