#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Trigger and control events a sequencer (or the controller) sends to a
/// synthesizer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SynthMessage {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    ControlChange { controller: u8, value: u8 },
    ProgramChange { program: u8 },
    PitchBend { cents: f64 },
    AllNotesOff,
}

impl SynthMessage {
    pub fn note_on(note: u8, velocity: u8) -> Self {
        Self::NoteOn { note, velocity }
    }

    pub fn note_off(note: u8) -> Self {
        Self::NoteOff { note }
    }

    pub fn cc(controller: u8, value: u8) -> Self {
        Self::ControlChange { controller, value }
    }
}
