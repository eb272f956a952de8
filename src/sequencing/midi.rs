//! MIDI clip playback in sample time.
//!
//! The clip position advances by `bpm / 60 * ppq / 44100` pulses per frame.
//! Every event whose pulse has been reached is dispatched on the frame that
//! reaches it; when the position passes the loop length it wraps, and any
//! note still sounding is released so nothing hangs across the loop seam.

use tracing::trace;

use super::{clamp_volume, send, Sequencer};
use crate::io::converter::midi_to_synth;
use crate::io::midi::{MidiClip, MidiEvent};
use crate::synth::{SynthMessage, Synthesizer};
use crate::{SAMPLE_RATE, STEPS_PER_BAR};

pub struct MidiSequencer {
    name: String,
    clip: MidiClip,
    /// Only dispatch events on this MIDI channel; `None` plays every channel.
    channel: Option<u8>,
    bpm: f64,
    pulses_per_tick: f64,
    position: f64,
    cursor: usize,
    /// Bit per MIDI note currently held on the bound synth.
    sounding: u128,
    step: usize,
    ticks: u64,
    volume: f64,
}

impl MidiSequencer {
    pub fn new(name: impl Into<String>, clip: MidiClip, bpm: f64) -> Self {
        Self {
            name: name.into(),
            pulses_per_tick: pulses_per_tick(bpm, clip.ppq()),
            clip,
            channel: None,
            bpm,
            position: 0.0,
            cursor: 0,
            sounding: 0,
            step: 0,
            ticks: 0,
            volume: 1.0,
        }
    }

    pub fn channel(mut self, channel: u8) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn clip(&self) -> &MidiClip {
        &self.clip
    }

    /// Replace the clip and restart from the top. Held notes are released
    /// on the next tick.
    pub fn set_clip(&mut self, clip: MidiClip) {
        self.pulses_per_tick = pulses_per_tick(self.bpm, clip.ppq());
        self.clip = clip;
        self.position = 0.0;
        self.cursor = 0;
    }

    /// Notes currently held, lowest first.
    pub fn sounding_notes(&self) -> impl Iterator<Item = u8> + '_ {
        (0..128u8).filter(move |n| self.sounding & (1u128 << n) != 0)
    }

    fn dispatch(&mut self, event: MidiEvent, synth: &mut Option<&mut dyn Synthesizer>) {
        let channel = self.channel.unwrap_or_else(|| event.channel());
        let Some(message) = midi_to_synth(event, channel) else {
            return;
        };
        match message {
            SynthMessage::NoteOn { note, .. } => self.sounding |= 1u128 << (note & 0x7F),
            SynthMessage::NoteOff { note } => self.sounding &= !(1u128 << (note & 0x7F)),
            _ => {}
        }
        send(synth, message);
    }

    fn release_all(&mut self, synth: &mut Option<&mut dyn Synthesizer>) {
        while self.sounding != 0 {
            let note = self.sounding.trailing_zeros() as u8;
            self.sounding &= !(1u128 << note);
            send(synth, SynthMessage::note_off(note));
        }
    }
}

fn pulses_per_tick(bpm: f64, ppq: u16) -> f64 {
    bpm / 60.0 * ppq as f64 / SAMPLE_RATE as f64
}

impl Sequencer for MidiSequencer {
    fn tick(&mut self, mut synth: Option<&mut dyn Synthesizer>) {
        if self.cursor == 0 && self.position == 0.0 && self.sounding != 0 {
            self.release_all(&mut synth);
        }

        let pulse = self.position as u32;
        while let Some(timed) = self.clip.events().get(self.cursor).copied() {
            if timed.pulse > pulse {
                break;
            }
            self.dispatch(timed.event, &mut synth);
            self.cursor += 1;
        }

        let sixteenth = pulse as u64 * 4 / self.clip.ppq() as u64;
        self.step = (sixteenth % STEPS_PER_BAR as u64) as usize;

        self.ticks += 1;
        self.position += self.pulses_per_tick;
        let length = self.clip.length_pulses() as f64;
        if self.position >= length {
            self.position -= length;
            self.cursor = 0;
            trace!(track = %self.name, "MIDI clip wrapped");
            self.release_all(&mut synth);
        }
    }

    fn step(&self) -> usize {
        self.step
    }

    fn ticks(&self) -> u64 {
        self.ticks
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = clamp_volume(volume);
    }

    fn set_tempo(&mut self, bpm: f64) {
        self.bpm = bpm;
        self.pulses_per_tick = pulses_per_tick(bpm, self.clip.ppq());
    }

    fn name(&self) -> &str {
        &self.name
    }
}
