use crate::{io::midi::MidiEvent, synth::message::SynthMessage};

/// Pitch bend range at full deflection, in cents (two semitones).
pub const PITCH_BEND_RANGE_CENTS: f64 = 200.0;

/// Translate a MIDI event on `channel_filter` into a synth message.
///
/// Events on other channels are dropped.
pub fn midi_to_synth(midi: MidiEvent, channel_filter: u8) -> Option<SynthMessage> {
    if midi.channel() != channel_filter {
        return None;
    }
    let message = match midi {
        MidiEvent::NoteOn { key, velocity, .. } => SynthMessage::NoteOn {
            note: key,
            velocity,
        },
        MidiEvent::NoteOff { key, .. } => SynthMessage::NoteOff { note: key },
        MidiEvent::ControlChange {
            controller, value, ..
        } => SynthMessage::ControlChange { controller, value },
        MidiEvent::ProgramChange { program, .. } => SynthMessage::ProgramChange { program },
        MidiEvent::PitchBend { value, .. } => SynthMessage::PitchBend {
            cents: bend_to_cents(value),
        },
    };
    Some(message)
}

/// Map a signed 14-bit bend (-8192..=8191) onto +/- two semitones.
pub fn bend_to_cents(value: i16) -> f64 {
    value as f64 / 8192.0 * PITCH_BEND_RANGE_CENTS
}
