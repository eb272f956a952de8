use crate::dsp::{midi_note_to_freq, Envelope, Oscillator, Waveform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,      // Available for allocation
    Active,    // Playing, envelope in attack/decay/sustain
    Releasing, // Key released, envelope in release phase
}

/// One oscillator + ADSR voice of the polyphonic MIDI synth.
pub struct Voice {
    note: u8,
    velocity: f64,
    state: VoiceState,
    age: u64,
    sample_rate: f64,
    osc: Oscillator,
    env: Envelope,
}

impl Voice {
    pub fn new(sample_rate: f64, waveform: Waveform, attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            note: 0,
            velocity: 0.0,
            state: VoiceState::Free,
            age: 0,
            sample_rate,
            osc: Oscillator::new(waveform),
            env: Envelope::adsr(attack, decay, sustain, release),
        }
    }

    pub fn start(&mut self, note: u8, velocity: u8, age: u64) {
        self.note = note;
        self.velocity = velocity as f64 / 127.0;
        self.state = VoiceState::Active;
        self.age = age;
        self.osc.reset_phase();
        self.env.note_on();
    }

    pub fn release(&mut self) {
        if self.state == VoiceState::Active {
            self.state = VoiceState::Releasing;
            self.env.note_off(self.sample_rate);
        }
    }

    /// Render one sample at the voice's pitch times `bend`.
    pub fn next_sample(&mut self, bend: f64) -> f64 {
        if self.is_free() {
            return 0.0;
        }

        let frequency = midi_note_to_freq(self.note) * bend;
        let out = self.osc.next_sample(frequency, self.sample_rate)
            * self.env.next_sample(self.sample_rate)
            * self.velocity;

        // If voice is releasing and envelope has finished, mark as free
        if self.state == VoiceState::Releasing && !self.env.is_active() {
            self.free();
        }
        out
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.osc.set_waveform(waveform);
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Free
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, VoiceState::Active | VoiceState::Releasing)
    }

    pub fn envelope_level(&self) -> f64 {
        self.env.level()
    }

    pub fn free(&mut self) {
        self.state = VoiceState::Free;
        self.note = 0;
        self.velocity = 0.0;
        self.env.reset();
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }
}
