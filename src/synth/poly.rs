use super::voice::{Voice, VoiceState};
use super::{cc, OutputStage, StereoFrame, SynthMessage, Synthesizer};
use crate::dsp::Waveform;
use crate::SAMPLE_RATE;

/// Polyphonic synth played by MIDI tracks.
///
/// A note-on takes a free voice, else steals the oldest releasing one, else
/// is dropped. Channel volume (CC 7) and pan (CC 10) apply on top of the
/// shared level/send controllers.
pub struct MidiSynth {
    name: String,
    voices: Vec<Voice>,
    stage: OutputStage,
    frame_counter: u64,
    bend: f64,
    volume: f64,
    pan: (f64, f64),
}

impl MidiSynth {
    pub const DEFAULT_VOICES: usize = 8;

    pub fn new(name: impl Into<String>, max_voices: usize) -> Self {
        let sample_rate = SAMPLE_RATE as f64;
        let voices = (0..max_voices.max(1))
            .map(|_| Voice::new(sample_rate, Waveform::Saw, 0.01, 0.2, 0.7, 0.3))
            .collect();

        Self {
            name: name.into(),
            voices,
            stage: OutputStage::default(),
            frame_counter: 0,
            bend: 1.0,
            volume: 1.0,
            pan: (1.0, 1.0),
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    fn allocate_voice(&mut self) -> Option<&mut Voice> {
        // First pass: find free voice index
        let free_idx = self.voices.iter().position(|v| v.is_free());
        if let Some(idx) = free_idx {
            return Some(&mut self.voices[idx]);
        }

        // Second pass: steal oldest releasing voice
        let steal_idx = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.state() == VoiceState::Releasing)
            .min_by_key(|(_, v)| v.age())
            .map(|(idx, _)| idx);

        steal_idx.map(|idx| &mut self.voices[idx])
    }

    fn find_voice(&mut self, note: u8) -> Option<&mut Voice> {
        self.voices
            .iter_mut()
            .find(|v| v.note() == note && v.state() == VoiceState::Active)
    }

    fn set_pan(&mut self, value: u8) {
        let p = value.min(127) as f64 / 127.0;
        self.pan = ((2.0 * (1.0 - p)).min(1.0), (2.0 * p).min(1.0));
    }
}

impl Synthesizer for MidiSynth {
    fn handle(&mut self, message: SynthMessage) {
        match message {
            SynthMessage::NoteOn { note, velocity } if velocity > 0 => {
                let age = self.frame_counter;
                if let Some(voice) = self.allocate_voice() {
                    voice.start(note, velocity, age);
                }
            }
            SynthMessage::NoteOn { note, .. } | SynthMessage::NoteOff { note } => {
                if let Some(voice) = self.find_voice(note) {
                    voice.release();
                }
            }
            SynthMessage::AllNotesOff => {
                for voice in &mut self.voices {
                    voice.release();
                }
            }
            SynthMessage::ControlChange { controller, value } => {
                if self.stage.control_change(controller, value) {
                    return;
                }
                match controller {
                    cc::VOLUME => self.volume = value.min(127) as f64 / 127.0,
                    cc::PAN => self.set_pan(value),
                    _ => {}
                }
            }
            SynthMessage::ProgramChange { program } => {
                let waveform = match program % 4 {
                    0 => Waveform::Saw,
                    1 => Waveform::Square,
                    2 => Waveform::Triangle,
                    _ => Waveform::Sine,
                };
                for voice in &mut self.voices {
                    voice.set_waveform(waveform);
                }
            }
            SynthMessage::PitchBend { cents } => self.bend = 2.0_f64.powf(cents / 1200.0),
        }
    }

    fn stereo_output(&mut self) -> StereoFrame {
        self.frame_counter += 1;

        let mut mix = 0.0;
        for voice in &mut self.voices {
            if voice.is_active() {
                mix += voice.next_sample(self.bend);
            }
        }

        let mix = mix * self.volume;
        self.stage.stereo(mix * self.pan.0, mix * self.pan.1)
    }

    fn is_active(&self) -> bool {
        self.voices.iter().any(Voice::is_active)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
