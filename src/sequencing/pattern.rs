/*
Step Patterns
=============

Patterns are one loop of steps, one step per sixteenth note. Position is
implicit: step i plays on the i-th boundary of the step clock.

Three shapes, one per sequencer family:

  NotePattern       [Some(C4), None, Some(E4), None, ...]
                    pitched steps with a velocity and a length in steps

  BasslinePattern   [C2, C2 accent, rest, C3 slide, ...]
                    every step has a note plus gate/accent/slide flags,
                    the classic acid bassline layout

  RhythmPattern     kick  x...x...x...x...
                    snare ....x.......x...
                    hat   x.x.x.x.x.x.x.x.
                    one bit mask per drum voice plus an accent row

Rows are written as strings for readability: 'x' or 'X' is a hit, any other
character is a rest.
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::STEPS_PER_BAR;

/// Velocity used for unaccented steps.
pub const NORMAL_VELOCITY: u8 = 100;
/// Velocity used for accented steps.
pub const ACCENT_VELOCITY: u8 = 127;

/// A pitched step.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteStep {
    /// MIDI note number
    pub note: u8,
    /// Velocity (0-127), defaults to 100
    pub velocity: u8,
    /// How many steps the note holds before its note-off (at least 1)
    pub length: usize,
}

impl NoteStep {
    pub fn new(note: u8) -> Self {
        Self {
            note,
            velocity: NORMAL_VELOCITY,
            length: 1,
        }
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity.min(127);
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length.max(1);
        self
    }
}

impl From<u8> for NoteStep {
    fn from(note: u8) -> Self {
        NoteStep::new(note)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePattern {
    steps: Vec<Option<NoteStep>>,
}

impl NotePattern {
    /// Silent pattern of `len` steps (at least one).
    pub fn new(len: usize) -> Self {
        Self {
            steps: vec![None; len.max(1)],
        }
    }

    /// One step per entry; `None` is a rest.
    pub fn from_notes(notes: &[Option<u8>]) -> Self {
        let mut pattern = Self::new(notes.len());
        for (slot, note) in pattern.steps.iter_mut().zip(notes) {
            *slot = note.map(NoteStep::new);
        }
        pattern
    }

    pub fn set(&mut self, step: usize, note: impl Into<NoteStep>) -> &mut Self {
        if let Some(slot) = self.steps.get_mut(step) {
            *slot = Some(note.into());
        }
        self
    }

    pub fn clear(&mut self, step: usize) -> &mut Self {
        if let Some(slot) = self.steps.get_mut(step) {
            *slot = None;
        }
        self
    }

    pub fn get(&self, step: usize) -> Option<&NoteStep> {
        self.steps.get(step % self.steps.len())?.as_ref()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.iter().all(Option::is_none)
    }
}

impl Default for NotePattern {
    fn default() -> Self {
        Self::new(STEPS_PER_BAR)
    }
}

/// One step of a bassline.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BassStep {
    pub note: u8,
    /// Whether the step sounds at all
    pub gate: bool,
    /// Louder, brighter hit
    pub accent: bool,
    /// Glide into this step from the previous one without retriggering
    pub slide: bool,
}

impl BassStep {
    pub const REST: Self = Self {
        note: 0,
        gate: false,
        accent: false,
        slide: false,
    };

    pub fn note(note: u8) -> Self {
        Self {
            note,
            gate: true,
            accent: false,
            slide: false,
        }
    }

    pub fn accent(mut self) -> Self {
        self.accent = true;
        self
    }

    pub fn slide(mut self) -> Self {
        self.slide = true;
        self
    }

    pub fn velocity(&self) -> u8 {
        if self.accent {
            ACCENT_VELOCITY
        } else {
            NORMAL_VELOCITY
        }
    }

    /// Whether the previous step's gate should stay open into this one.
    pub fn ties_previous(&self) -> bool {
        self.gate && self.slide
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasslinePattern {
    steps: Vec<BassStep>,
}

impl BasslinePattern {
    pub fn new(len: usize) -> Self {
        Self {
            steps: vec![BassStep::REST; len.max(1)],
        }
    }

    pub fn from_steps(steps: Vec<BassStep>) -> Self {
        if steps.is_empty() {
            return Self::new(1);
        }
        Self { steps }
    }

    pub fn set(&mut self, step: usize, value: BassStep) -> &mut Self {
        if let Some(slot) = self.steps.get_mut(step) {
            *slot = value;
        }
        self
    }

    pub fn get(&self, step: usize) -> &BassStep {
        &self.steps[step % self.steps.len()]
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.iter().all(|s| !s.gate)
    }
}

impl Default for BasslinePattern {
    fn default() -> Self {
        Self::new(STEPS_PER_BAR)
    }
}

/// Drum voices of the rhythm synth, keyed by General MIDI percussion notes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrumVoice {
    Kick,
    Snare,
    Clap,
    ClosedHat,
    OpenHat,
}

impl DrumVoice {
    pub const ALL: [DrumVoice; 5] = [
        DrumVoice::Kick,
        DrumVoice::Snare,
        DrumVoice::Clap,
        DrumVoice::ClosedHat,
        DrumVoice::OpenHat,
    ];

    pub fn note(self) -> u8 {
        match self {
            DrumVoice::Kick => 36,
            DrumVoice::Snare => 38,
            DrumVoice::Clap => 39,
            DrumVoice::ClosedHat => 42,
            DrumVoice::OpenHat => 46,
        }
    }

    pub fn from_note(note: u8) -> Option<Self> {
        match note {
            35 | 36 => Some(DrumVoice::Kick),
            38 | 40 => Some(DrumVoice::Snare),
            39 => Some(DrumVoice::Clap),
            42 | 44 => Some(DrumVoice::ClosedHat),
            46 => Some(DrumVoice::OpenHat),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Up to 32 steps of drum hits.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RhythmPattern {
    len: usize,
    rows: [u32; 5],
    accents: u32,
}

impl RhythmPattern {
    pub const MAX_STEPS: usize = 32;

    pub fn new(len: usize) -> Self {
        Self {
            len: len.clamp(1, Self::MAX_STEPS),
            rows: [0; 5],
            accents: 0,
        }
    }

    /// Set a voice's row from a string like `"x...x...x...x..."`.
    pub fn with_row(mut self, voice: DrumVoice, row: &str) -> Self {
        self.rows[voice.index()] = self.parse_row(row);
        self
    }

    pub fn with_accents(mut self, row: &str) -> Self {
        self.accents = self.parse_row(row);
        self
    }

    pub fn toggle(&mut self, voice: DrumVoice, step: usize) {
        if step < self.len {
            self.rows[voice.index()] ^= 1 << step;
        }
    }

    pub fn hit(&self, voice: DrumVoice, step: usize) -> bool {
        step < self.len && self.rows[voice.index()] & (1 << step) != 0
    }

    pub fn accented(&self, step: usize) -> bool {
        step < self.len && self.accents & (1 << step) != 0
    }

    /// Voices hit on `step`, in `DrumVoice::ALL` order.
    pub fn hits(&self, step: usize) -> impl Iterator<Item = DrumVoice> + '_ {
        DrumVoice::ALL
            .into_iter()
            .filter(move |voice| self.hit(*voice, step))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| *row == 0)
    }

    fn parse_row(&self, row: &str) -> u32 {
        row.chars()
            .take(self.len)
            .enumerate()
            .filter(|(_, c)| matches!(c, 'x' | 'X'))
            .fold(0, |mask, (i, _)| mask | 1 << i)
    }
}

impl Default for RhythmPattern {
    fn default() -> Self {
        Self::new(STEPS_PER_BAR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_pattern_from_notes() {
        let pattern = NotePattern::from_notes(&[Some(60), None, Some(64), None]);
        assert_eq!(pattern.len(), 4);
        assert_eq!(pattern.get(0).map(|s| s.note), Some(60));
        assert!(pattern.get(1).is_none());
        // indices wrap
        assert_eq!(pattern.get(6).map(|s| s.note), Some(64));
    }

    #[test]
    fn note_step_length_is_at_least_one() {
        assert_eq!(NoteStep::new(60).with_length(0).length, 1);
    }

    #[test]
    fn bass_step_velocity_follows_accent() {
        assert_eq!(BassStep::note(36).velocity(), NORMAL_VELOCITY);
        assert_eq!(BassStep::note(36).accent().velocity(), ACCENT_VELOCITY);
        assert!(BassStep::note(36).slide().ties_previous());
        assert!(!BassStep::REST.slide().ties_previous());
    }

    #[test]
    fn rhythm_rows_parse() {
        let pattern = RhythmPattern::new(16)
            .with_row(DrumVoice::Kick, "x...x...x...x...")
            .with_row(DrumVoice::ClosedHat, "..x...x...x...x.")
            .with_accents("x...............");

        assert!(pattern.hit(DrumVoice::Kick, 0));
        assert!(pattern.hit(DrumVoice::Kick, 12));
        assert!(!pattern.hit(DrumVoice::Kick, 2));
        assert_eq!(pattern.hits(2).collect::<Vec<_>>(), vec![DrumVoice::ClosedHat]);
        assert!(pattern.accented(0));
        assert!(!pattern.accented(4));
    }

    #[test]
    fn rhythm_row_is_truncated_to_length() {
        let pattern = RhythmPattern::new(4).with_row(DrumVoice::Snare, "xxxxxxxx");
        assert!(pattern.hit(DrumVoice::Snare, 3));
        assert!(!pattern.hit(DrumVoice::Snare, 4));
    }

    #[test]
    fn drum_notes_round_trip() {
        for voice in DrumVoice::ALL {
            assert_eq!(DrumVoice::from_note(voice.note()), Some(voice));
        }
        assert_eq!(DrumVoice::from_note(60), None);
    }
}
