/*
Rhythm Voice
============

Five one-shot drum parts summed into one mono output:

  Kick        sine with a fast downward pitch sweep (160 Hz → 45 Hz)
  Snare       180 Hz body + high-passed noise
  Clap        band-passed noise with a short decay
  Closed hat  high-passed noise, very short
  Open hat    high-passed noise, long; a closed hat chokes it

Velocity scales the hit. Note-offs are ignored; every hit runs its decay out.
*/

use super::{cc, cc_exp, OutputStage, StereoFrame, SynthMessage, Synthesizer};
use crate::dsp::{DecayEnvelope, Noise, Oscillator, SvFilter};
use crate::sequencing::pattern::DrumVoice;
use crate::SAMPLE_RATE;

struct Kick {
    osc: Oscillator,
    amp: DecayEnvelope,
    pitch: DecayEnvelope,
}

impl Kick {
    fn new(sample_rate: f64) -> Self {
        Self {
            osc: Oscillator::sine(),
            amp: DecayEnvelope::new(0.35, sample_rate),
            pitch: DecayEnvelope::new(0.035, sample_rate),
        }
    }

    fn trigger(&mut self, peak: f64) {
        self.osc.reset_phase();
        self.amp.trigger(peak);
        self.pitch.trigger(1.0);
    }

    fn next_sample(&mut self, sample_rate: f64) -> f64 {
        if !self.amp.is_active() {
            return 0.0;
        }
        let frequency = 45.0 + 115.0 * self.pitch.next_sample();
        self.osc.next_sample(frequency, sample_rate) * self.amp.next_sample()
    }
}

struct Snare {
    body: Oscillator,
    body_amp: DecayEnvelope,
    noise_amp: DecayEnvelope,
    filter: SvFilter,
}

impl Snare {
    fn new(sample_rate: f64) -> Self {
        Self {
            body: Oscillator::sine(),
            body_amp: DecayEnvelope::new(0.08, sample_rate),
            noise_amp: DecayEnvelope::new(0.15, sample_rate),
            filter: SvFilter::highpass(1_500.0),
        }
    }

    fn trigger(&mut self, peak: f64) {
        self.body.reset_phase();
        self.body_amp.trigger(peak * 0.6);
        self.noise_amp.trigger(peak * 0.5);
    }

    fn next_sample(&mut self, noise: f64, sample_rate: f64) -> f64 {
        if !self.noise_amp.is_active() && !self.body_amp.is_active() {
            return 0.0;
        }
        let body = self.body.next_sample(180.0, sample_rate) * self.body_amp.next_sample();
        let rattle = self.filter.process(noise, sample_rate) * self.noise_amp.next_sample();
        body + rattle
    }
}

/// Filtered noise burst: clap and both hats.
struct NoiseHit {
    amp: DecayEnvelope,
    filter: SvFilter,
    gain: f64,
}

impl NoiseHit {
    fn new(filter: SvFilter, decay_s: f64, gain: f64, sample_rate: f64) -> Self {
        Self {
            amp: DecayEnvelope::new(decay_s, sample_rate),
            filter,
            gain,
        }
    }

    fn next_sample(&mut self, noise: f64, sample_rate: f64) -> f64 {
        if !self.amp.is_active() {
            return 0.0;
        }
        self.filter.process(noise, sample_rate) * self.amp.next_sample() * self.gain
    }
}

pub struct RhythmSynth {
    name: String,
    sample_rate: f64,
    noise: Noise,
    kick: Kick,
    snare: Snare,
    clap: NoiseHit,
    closed_hat: NoiseHit,
    open_hat: NoiseHit,
    stage: OutputStage,
}

impl RhythmSynth {
    pub fn new(name: impl Into<String>) -> Self {
        let sample_rate = SAMPLE_RATE as f64;
        Self {
            name: name.into(),
            sample_rate,
            noise: Noise::default(),
            kick: Kick::new(sample_rate),
            snare: Snare::new(sample_rate),
            clap: NoiseHit::new(SvFilter::bandpass(1_200.0).with_resonance(0.5), 0.12, 0.8, sample_rate),
            closed_hat: NoiseHit::new(SvFilter::highpass(7_000.0), 0.04, 0.4, sample_rate),
            open_hat: NoiseHit::new(SvFilter::highpass(7_000.0), 0.35, 0.35, sample_rate),
            stage: OutputStage::default(),
        }
    }

    pub fn trigger(&mut self, voice: DrumVoice, velocity: u8) {
        let peak = velocity.min(127) as f64 / 127.0;
        match voice {
            DrumVoice::Kick => self.kick.trigger(peak),
            DrumVoice::Snare => self.snare.trigger(peak),
            DrumVoice::Clap => self.clap.amp.trigger(peak),
            DrumVoice::ClosedHat => {
                self.open_hat.amp.kill();
                self.closed_hat.amp.trigger(peak);
            }
            DrumVoice::OpenHat => self.open_hat.amp.trigger(peak),
        }
    }

    fn silence(&mut self) {
        self.kick.amp.kill();
        self.snare.body_amp.kill();
        self.snare.noise_amp.kill();
        self.clap.amp.kill();
        self.closed_hat.amp.kill();
        self.open_hat.amp.kill();
    }
}

impl Synthesizer for RhythmSynth {
    fn handle(&mut self, message: SynthMessage) {
        match message {
            SynthMessage::NoteOn { note, velocity } if velocity > 0 => {
                if let Some(voice) = DrumVoice::from_note(note) {
                    self.trigger(voice, velocity);
                }
            }
            SynthMessage::ControlChange { controller, value } => {
                if !self.stage.control_change(controller, value) && controller == cc::DECAY {
                    self.open_hat
                        .amp
                        .set_decay(cc_exp(value, 0.1, 1.5), self.sample_rate);
                }
            }
            SynthMessage::AllNotesOff => self.silence(),
            _ => {}
        }
    }

    fn stereo_output(&mut self) -> StereoFrame {
        let sr = self.sample_rate;
        let noise = self.noise.next_sample();
        let mix = self.kick.next_sample(sr)
            + self.snare.next_sample(noise, sr)
            + self.clap.next_sample(noise, sr)
            + self.closed_hat.next_sample(noise, sr)
            + self.open_hat.next_sample(noise, sr);
        self.stage.mono(mix)
    }

    fn is_active(&self) -> bool {
        self.kick.amp.is_active()
            || self.snare.body_amp.is_active()
            || self.snare.noise_amp.is_active()
            || self.clap.amp.is_active()
            || self.closed_hat.amp.is_active()
            || self.open_hat.amp.is_active()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
