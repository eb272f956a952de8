/*
Bassline Voice
==============

  Oscillator (saw/square) → resonant low-pass → amp envelope → output stage

                 cutoff
                   ↑
  base cutoff · (1 + env_mod · 8 · filter_env · accent boost)

Note-ons that arrive while the gate is held glide to the new pitch instead of
retriggering the envelopes (legato slide). Accented notes (velocity above
the normal 100) open the filter further and play louder.
*/

use super::{cc, cc_exp, OutputStage, StereoFrame, SynthMessage, Synthesizer};
use crate::dsp::{midi_note_to_freq, DecayEnvelope, Envelope, Oscillator, SvFilter, Waveform};
use crate::sequencing::pattern::NORMAL_VELOCITY;
use crate::SAMPLE_RATE;

const SLIDE_TIME: f64 = 0.06;
const ACCENT_BOOST: f64 = 1.5;

pub struct BasslineSynth {
    name: String,
    sample_rate: f64,
    osc: Oscillator,
    filter: SvFilter,
    amp_env: Envelope,
    filter_env: DecayEnvelope,
    stage: OutputStage,

    gate: Option<u8>,
    accent: bool,
    frequency: f64,
    target_frequency: f64,
    slide_coeff: f64,
    bend: f64,

    cutoff_hz: f64,
    env_mod: f64,
}

impl BasslineSynth {
    pub fn new(name: impl Into<String>) -> Self {
        let sample_rate = SAMPLE_RATE as f64;
        Self {
            name: name.into(),
            sample_rate,
            osc: Oscillator::saw(),
            filter: SvFilter::lowpass(400.0).with_resonance(0.7),
            amp_env: Envelope::adsr(0.003, 0.8, 0.4, 0.008),
            filter_env: DecayEnvelope::new(0.25, sample_rate),
            stage: OutputStage::default(),
            gate: None,
            accent: false,
            frequency: 0.0,
            target_frequency: 0.0,
            slide_coeff: 1.0 - (-1.0 / (SLIDE_TIME * sample_rate)).exp(),
            bend: 1.0,
            cutoff_hz: 400.0,
            env_mod: 0.5,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.osc.waveform()
    }

    pub fn cutoff_hz(&self) -> f64 {
        self.cutoff_hz
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        let frequency = midi_note_to_freq(note);
        self.accent = velocity > NORMAL_VELOCITY;

        if self.gate.is_some() {
            self.target_frequency = frequency;
        } else {
            self.frequency = frequency;
            self.target_frequency = frequency;
            self.amp_env.note_on();
            let boost = if self.accent { ACCENT_BOOST } else { 1.0 };
            self.filter_env.trigger(boost);
        }
        self.gate = Some(note);
    }

    fn note_off(&mut self, note: u8) {
        if self.gate == Some(note) {
            self.gate = None;
            self.amp_env.note_off(self.sample_rate);
        }
    }

    fn control_change(&mut self, controller: u8, value: u8) {
        if self.stage.control_change(controller, value) {
            return;
        }
        match controller {
            cc::CUTOFF => self.cutoff_hz = cc_exp(value, 60.0, 6_000.0),
            cc::RESONANCE => {
                self.filter.resonance = (value as f64 / 127.0).clamp(0.0, 0.98);
            }
            cc::ENV_MOD => self.env_mod = value as f64 / 127.0,
            cc::DECAY => self
                .filter_env
                .set_decay(cc_exp(value, 0.03, 2.0), self.sample_rate),
            cc::WAVEFORM => self.osc.set_waveform(if value < 64 {
                Waveform::Saw
            } else {
                Waveform::Square
            }),
            _ => {}
        }
    }
}

impl Synthesizer for BasslineSynth {
    fn handle(&mut self, message: SynthMessage) {
        match message {
            SynthMessage::NoteOn { velocity: 0, note } => self.note_off(note),
            SynthMessage::NoteOn { note, velocity } => self.note_on(note, velocity),
            SynthMessage::NoteOff { note } => self.note_off(note),
            SynthMessage::ControlChange { controller, value } => {
                self.control_change(controller, value)
            }
            SynthMessage::PitchBend { cents } => self.bend = 2.0_f64.powf(cents / 1200.0),
            SynthMessage::AllNotesOff => {
                if let Some(note) = self.gate {
                    self.note_off(note);
                }
            }
            SynthMessage::ProgramChange { .. } => {}
        }
    }

    fn stereo_output(&mut self) -> StereoFrame {
        if !self.amp_env.is_active() {
            return StereoFrame::SILENCE;
        }

        self.frequency += (self.target_frequency - self.frequency) * self.slide_coeff;

        let raw = self.osc.next_sample(self.frequency * self.bend, self.sample_rate);
        let boost = if self.accent { ACCENT_BOOST } else { 1.0 };
        let sweep = 1.0 + self.env_mod * 8.0 * self.filter_env.next_sample() * boost;
        let filtered = self
            .filter
            .process_at(raw, self.cutoff_hz * sweep, self.sample_rate);

        let gain = if self.accent { 1.0 } else { 0.75 };
        let amp = self.amp_env.next_sample(self.sample_rate);
        self.stage.mono(filtered * amp * gain)
    }

    fn is_active(&self) -> bool {
        self.amp_env.is_active()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
