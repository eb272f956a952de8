//! MIDI events, external trigger mapping and looping clips.

use std::collections::HashMap;

use midly::{MidiMessage, Smf, Timing, TrackEventKind};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::synth::message::SynthMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    PitchBend { channel: u8, value: i16 },
    ProgramChange { channel: u8, program: u8 },
}

impl MidiEvent {
    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::PitchBend { channel, .. }
            | MidiEvent::ProgramChange { channel, .. } => channel,
        }
    }

    /// Lift a parsed `midly` channel message.
    pub fn from_midly(channel: u8, message: MidiMessage) -> Option<Self> {
        let event = match message {
            // running-status note-ons with zero velocity are note-offs
            MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => MidiEvent::NoteOff {
                channel,
                key: key.as_int(),
                velocity: 0,
            },
            MidiMessage::NoteOn { key, vel } => MidiEvent::NoteOn {
                channel,
                key: key.as_int(),
                velocity: vel.as_int(),
            },
            MidiMessage::NoteOff { key, vel } => MidiEvent::NoteOff {
                channel,
                key: key.as_int(),
                velocity: vel.as_int(),
            },
            MidiMessage::Controller { controller, value } => MidiEvent::ControlChange {
                channel,
                controller: controller.as_int(),
                value: value.as_int(),
            },
            MidiMessage::PitchBend { bend } => MidiEvent::PitchBend {
                channel,
                value: bend.as_int(),
            },
            MidiMessage::ProgramChange { program } => MidiEvent::ProgramChange {
                channel,
                program: program.as_int(),
            },
            MidiMessage::Aftertouch { .. } | MidiMessage::ChannelAftertouch { .. } => return None,
        };
        Some(event)
    }
}

/// Key an external event is matched on. Values and velocities are not part
/// of the key, so a mapped pad or knob fires however it is hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MidiKey {
    Note { channel: u8, key: u8 },
    Control { channel: u8, controller: u8 },
    Program { channel: u8, program: u8 },
}

impl MidiKey {
    /// Note-offs and pitch bends are never mapped.
    pub fn of(event: &MidiEvent) -> Option<Self> {
        match *event {
            MidiEvent::NoteOn { channel, key, .. } => Some(MidiKey::Note { channel, key }),
            MidiEvent::ControlChange {
                channel,
                controller,
                ..
            } => Some(MidiKey::Control {
                channel,
                controller,
            }),
            MidiEvent::ProgramChange { channel, program } => {
                Some(MidiKey::Program { channel, program })
            }
            MidiEvent::NoteOff { .. } | MidiEvent::PitchBend { .. } => None,
        }
    }
}

/// Where a mapped event goes and what it becomes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedTrigger {
    pub track: usize,
    pub message: SynthMessage,
}

/// Routes external MIDI events to a track's synthesizer.
///
/// Unmapped events resolve to `None` and are dropped by the caller.
#[derive(Debug, Clone, Default)]
pub struct MidiMap {
    bindings: HashMap<MidiKey, MappedTrigger>,
}

impl MidiMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, key: MidiKey, track: usize, message: SynthMessage) -> &mut Self {
        self.bindings.insert(key, MappedTrigger { track, message });
        self
    }

    pub fn bind_note(&mut self, channel: u8, key: u8, track: usize, message: SynthMessage) -> &mut Self {
        self.bind(MidiKey::Note { channel, key }, track, message)
    }

    pub fn bind_control(
        &mut self,
        channel: u8,
        controller: u8,
        track: usize,
        message: SynthMessage,
    ) -> &mut Self {
        self.bind(
            MidiKey::Control {
                channel,
                controller,
            },
            track,
            message,
        )
    }

    pub fn unbind(&mut self, key: &MidiKey) -> Option<MappedTrigger> {
        self.bindings.remove(key)
    }

    pub fn resolve(&self, event: &MidiEvent) -> Option<MappedTrigger> {
        let key = MidiKey::of(event)?;
        let mapped = self.bindings.get(&key).copied();
        if mapped.is_none() {
            debug!(?event, "ignoring unmapped MIDI event");
        }
        mapped
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// A MIDI event at a pulse offset inside a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    pub pulse: u32,
    pub event: MidiEvent,
}

/// A looping run of MIDI events timed in pulses per quarter note.
///
/// Events are kept sorted by pulse; events sharing a pulse keep the order
/// they were added in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiClip {
    ppq: u16,
    length_pulses: u32,
    events: Vec<TimedEvent>,
}

impl MidiClip {
    pub const DEFAULT_PPQ: u16 = 96;

    /// Empty clip looping every `length_pulses` (at least one pulse).
    pub fn new(ppq: u16, length_pulses: u32) -> Self {
        Self {
            ppq: ppq.max(1),
            length_pulses: length_pulses.max(1),
            events: Vec::new(),
        }
    }

    /// Empty clip that loops after `bars` bars of 4/4.
    pub fn bars(ppq: u16, bars: u32) -> Self {
        Self::new(ppq, ppq.max(1) as u32 * 4 * bars.max(1))
    }

    pub fn push(&mut self, pulse: u32, event: MidiEvent) -> &mut Self {
        let idx = self.events.partition_point(|e| e.pulse <= pulse);
        self.events.insert(idx, TimedEvent { pulse, event });
        self
    }

    /// Note-on at `pulse` and matching note-off `length` pulses later.
    pub fn note(&mut self, pulse: u32, length: u32, channel: u8, key: u8, velocity: u8) -> &mut Self {
        self.push(
            pulse,
            MidiEvent::NoteOn {
                channel,
                key,
                velocity,
            },
        );
        self.push(
            pulse + length.max(1),
            MidiEvent::NoteOff {
                channel,
                key,
                velocity: 0,
            },
        )
    }

    pub fn ppq(&self) -> u16 {
        self.ppq
    }

    pub fn length_pulses(&self) -> u32 {
        self.length_pulses
    }

    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Parse a Standard MIDI File, merging every track into one clip.
    ///
    /// The loop length is the last event rounded up to a whole 4/4 bar.
    /// Only metrical timing is supported.
    pub fn from_smf(bytes: &[u8]) -> Result<Self> {
        let smf = Smf::parse(bytes).map_err(|e| EngineError::Midi(e.to_string()))?;
        let ppq = match smf.header.timing {
            Timing::Metrical(ppq) => ppq.as_int(),
            Timing::Timecode(..) => {
                return Err(EngineError::Midi(
                    "timecode-based MIDI files are not supported".to_string(),
                ))
            }
        };
        if ppq == 0 {
            return Err(EngineError::Midi("MIDI file declares zero pulses per quarter".to_string()));
        }

        let mut clip = MidiClip::new(ppq, 1);
        let mut end = 0u32;
        for track in &smf.tracks {
            let mut pulse = 0u32;
            for event in track {
                pulse = pulse.saturating_add(event.delta.as_int());
                if let TrackEventKind::Midi { channel, message } = event.kind {
                    if let Some(event) = MidiEvent::from_midly(channel.as_int(), message) {
                        clip.push(pulse, event);
                    }
                }
                end = end.max(pulse);
            }
        }

        let bar = ppq as u32 * 4;
        clip.length_pulses = end.div_ceil(bar).max(1) * bar;
        debug!(
            ppq,
            events = clip.events.len(),
            length = clip.length_pulses,
            "parsed MIDI clip"
        );
        Ok(clip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midly::num::u7;

    #[test]
    fn clip_keeps_events_sorted() {
        let mut clip = MidiClip::bars(96, 1);
        clip.note(96, 48, 0, 64, 100);
        clip.note(0, 48, 0, 60, 100);

        let pulses: Vec<u32> = clip.events().iter().map(|e| e.pulse).collect();
        assert_eq!(pulses, vec![0, 48, 96, 144]);
        assert_eq!(clip.length_pulses(), 384);
    }

    #[test]
    fn map_resolves_only_bound_events() {
        let mut map = MidiMap::new();
        map.bind_note(9, 36, 15, SynthMessage::note_on(36, 127));

        let hit = MidiEvent::NoteOn {
            channel: 9,
            key: 36,
            velocity: 12,
        };
        let miss = MidiEvent::NoteOn {
            channel: 9,
            key: 37,
            velocity: 12,
        };

        assert_eq!(
            map.resolve(&hit),
            Some(MappedTrigger {
                track: 15,
                message: SynthMessage::note_on(36, 127)
            })
        );
        assert_eq!(map.resolve(&miss), None);
        assert_eq!(
            map.resolve(&MidiEvent::NoteOff {
                channel: 9,
                key: 36,
                velocity: 0
            }),
            None
        );
    }

    #[test]
    fn zero_velocity_note_on_is_note_off() {
        let event = MidiEvent::from_midly(
            2,
            MidiMessage::NoteOn {
                key: u7::from(60),
                vel: u7::from(0),
            },
        );
        assert_eq!(
            event,
            Some(MidiEvent::NoteOff {
                channel: 2,
                key: 60,
                velocity: 0
            })
        );
    }

    #[test]
    fn garbage_is_a_midi_error() {
        assert!(matches!(
            MidiClip::from_smf(b"not a midi file"),
            Err(EngineError::Midi(_))
        ));
    }

    #[test]
    fn parses_minimal_smf() {
        // format 0, one track, 96 ppq: note-on 60 at 0, note-off at 96, end
        let bytes: Vec<u8> = [
            &b"MThd"[..],
            &[0, 0, 0, 6, 0, 0, 0, 1, 0, 96],
            b"MTrk",
            &[0, 0, 0, 13],
            &[0x00, 0x90, 60, 100],
            &[0x60, 0x80, 60, 0],
            &[0x00, 0xFF, 0x2F, 0x00],
        ]
        .concat();

        let clip = MidiClip::from_smf(&bytes).unwrap();
        assert_eq!(clip.ppq(), 96);
        assert_eq!(clip.length_pulses(), 384);
        assert_eq!(
            clip.events(),
            &[
                TimedEvent {
                    pulse: 0,
                    event: MidiEvent::NoteOn {
                        channel: 0,
                        key: 60,
                        velocity: 100
                    }
                },
                TimedEvent {
                    pulse: 96,
                    event: MidiEvent::NoteOff {
                        channel: 0,
                        key: 60,
                        velocity: 0
                    }
                },
            ]
        );
    }

    #[test]
    fn end_on_a_bar_line_loops_on_that_bar() {
        // end-of-track at pulse 384, exactly one bar of 4/4 at 96 ppq
        let bytes: Vec<u8> = [
            &b"MThd"[..],
            &[0, 0, 0, 6, 0, 0, 0, 1, 0, 96],
            b"MTrk",
            &[0, 0, 0, 13],
            &[0x00, 0x90, 60, 100],
            &[0x60, 0x80, 60, 0],
            &[0x82, 0x20, 0xFF, 0x2F, 0x00],
        ]
        .concat();

        let clip = MidiClip::from_smf(&bytes).unwrap();
        assert_eq!(clip.length_pulses(), 384);
    }
}
