use super::{cc, cc_exp, OutputStage, StereoFrame, SynthMessage, Synthesizer};
use crate::dsp::{midi_note_to_freq, Envelope, Oscillator, SvFilter, Waveform};
use crate::SAMPLE_RATE;

/// Monophonic oscillator + ADSR voice for pattern instruments.
///
/// Last note wins; a note-off only releases the note that is sounding.
pub struct InstrumentSynth {
    name: String,
    sample_rate: f64,
    osc: Oscillator,
    filter: SvFilter,
    env: Envelope,
    stage: OutputStage,
    note: Option<u8>,
    velocity: f64,
    bend: f64,
}

impl InstrumentSynth {
    pub fn new(name: impl Into<String>, waveform: Waveform) -> Self {
        Self {
            name: name.into(),
            sample_rate: SAMPLE_RATE as f64,
            osc: Oscillator::new(waveform),
            filter: SvFilter::lowpass(5_000.0),
            env: Envelope::adsr(0.005, 0.15, 0.6, 0.25),
            stage: OutputStage::default(),
            note: None,
            velocity: 0.0,
            bend: 1.0,
        }
    }

    /// Replace the amplitude envelope (seconds, sustain level).
    pub fn with_envelope(mut self, attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        self.env = Envelope::adsr(attack, decay, sustain, release);
        self
    }

    pub fn waveform(&self) -> Waveform {
        self.osc.waveform()
    }
}

impl Synthesizer for InstrumentSynth {
    fn handle(&mut self, message: SynthMessage) {
        match message {
            SynthMessage::NoteOn { note, velocity } if velocity > 0 => {
                self.note = Some(note);
                self.velocity = velocity as f64 / 127.0;
                self.env.note_on();
            }
            SynthMessage::NoteOn { note, .. } | SynthMessage::NoteOff { note } => {
                if self.note == Some(note) {
                    self.env.note_off(self.sample_rate);
                }
            }
            SynthMessage::ControlChange { controller, value } => {
                if self.stage.control_change(controller, value) {
                    return;
                }
                match controller {
                    cc::WAVEFORM => self.osc.set_waveform(Waveform::from_controller(value)),
                    cc::CUTOFF => self.filter.cutoff_hz = cc_exp(value, 100.0, 12_000.0),
                    cc::RESONANCE => self.filter.resonance = (value as f64 / 127.0).min(0.98),
                    _ => {}
                }
            }
            SynthMessage::ProgramChange { program } => {
                self.osc
                    .set_waveform(Waveform::from_controller(program.wrapping_mul(32)));
            }
            SynthMessage::PitchBend { cents } => self.bend = 2.0_f64.powf(cents / 1200.0),
            SynthMessage::AllNotesOff => self.env.note_off(self.sample_rate),
        }
    }

    fn stereo_output(&mut self) -> StereoFrame {
        let Some(note) = self.note else {
            return StereoFrame::SILENCE;
        };
        if !self.env.is_active() {
            return StereoFrame::SILENCE;
        }

        let frequency = midi_note_to_freq(note) * self.bend;
        let raw = self.osc.next_sample(frequency, self.sample_rate);
        let filtered = self.filter.process(raw, self.sample_rate);
        let amp = self.env.next_sample(self.sample_rate) * self.velocity;
        self.stage.mono(filtered * amp)
    }

    fn is_active(&self) -> bool {
        self.env.is_active()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plays_and_releases() {
        let mut synth = InstrumentSynth::new("keys", Waveform::Triangle);
        synth.handle(SynthMessage::note_on(69, 127));
        let loud = (0..4096).any(|_| synth.stereo_output().left.abs() > 0.05);
        assert!(loud);

        synth.handle(SynthMessage::note_off(69));
        for _ in 0..44_100 {
            synth.stereo_output();
        }
        assert!(!synth.is_active());
    }

    #[test]
    fn note_off_for_another_note_is_ignored() {
        let mut synth = InstrumentSynth::new("keys", Waveform::Saw);
        synth.handle(SynthMessage::note_on(60, 100));
        synth.handle(SynthMessage::note_off(62));
        for _ in 0..44_100 {
            synth.stereo_output();
        }
        assert!(synth.is_active());
    }

    #[test]
    fn program_change_selects_waveform() {
        let mut synth = InstrumentSynth::new("keys", Waveform::Saw);
        synth.handle(SynthMessage::ProgramChange { program: 1 });
        assert_eq!(synth.waveform(), Waveform::Square);
        synth.handle(SynthMessage::cc(cc::WAVEFORM, 127));
        assert_eq!(synth.waveform(), Waveform::Sine);
    }
}
