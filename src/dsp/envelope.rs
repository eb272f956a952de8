/*
Envelopes
=========

Two envelope shapes live here:

  Envelope        Linear ADSR, the workhorse for pitched instrument voices.
  DecayEnvelope   Instant attack, exponential decay. Used by the drum and
                  bassline voices where every hit is a one-shot.


ADSR (linear)
-------------

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
        Attack Decay  Sustain  Release

The key calculation converts a time duration into a per-sample increment:

    increment = target_change / (time_seconds * sample_rate)

note_off triggers Release from ANY stage, starting from the CURRENT level, so
releasing during the attack does not click. Release snapshots the start level
and sample count at note_off and interpolates, which lands exactly on 0.0.


Exponential decay
-----------------

    level[n] = level[n-1] * coeff,   coeff = exp(-1 / (decay_s * sample_rate))

After `decay_s` seconds the level is 1/e of where it started. Once it drops
below SILENCE the envelope snaps to zero and reports itself idle.
*/

/// Shortest stage time accepted by the envelopes, in seconds.
const MIN_TIME: f64 = 1.0 / 48_000.0;

/// Level below which a decaying envelope is treated as finished.
const SILENCE: f64 = 1.0e-5;

/// The current stage of the ADSR state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,    // Gate low, envelope inactive, level = 0
    Attack,  // Gate just went high, ramping up to 1.0
    Decay,   // Reached peak, ramping down to sustain level
    Sustain, // Holding at sustain level while gate is high
    Release, // Gate went low, ramping down to 0
}

pub struct Envelope {
    attack_time: f64,
    decay_time: f64,
    sustain_level: f64,
    release_time: f64,

    stage: EnvelopeState,
    level: f64,

    decay_start_level: f64,

    release_start_level: f64,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl Envelope {
    pub fn adsr(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack_time: attack.max(MIN_TIME),
            decay_time: decay.max(MIN_TIME),
            sustain_level: sustain.clamp(0.0, 1.0),
            release_time: release.max(MIN_TIME),

            stage: EnvelopeState::Idle,
            level: 0.0,
            decay_start_level: 0.0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        }
    }

    /// Gate high: start the attack phase from zero.
    pub fn note_on(&mut self) {
        self.level = 0.0;
        self.stage = EnvelopeState::Attack;
        self.release_elapsed_samples = 0;
    }

    /// Gate low: start the release phase from current level.
    pub fn note_off(&mut self, sample_rate: f64) {
        if self.stage == EnvelopeState::Idle {
            return;
        }

        self.release_start_level = self.level;
        self.release_total_samples = (self.release_time * sample_rate).round().max(1.0) as u32;
        self.release_elapsed_samples = 0;
        self.stage = EnvelopeState::Release;
    }

    /// Advance the envelope by one sample and return the new level.
    pub fn next_sample(&mut self, sample_rate: f64) -> f64 {
        match self.stage {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                self.level += 1.0 / (self.attack_time * sample_rate);

                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.decay_start_level = 1.0;
                    self.stage = EnvelopeState::Decay;
                }
            }

            EnvelopeState::Decay => {
                let target = self.sustain_level;
                let total_drop = self.decay_start_level - target;
                self.level -= total_drop / (self.decay_time * sample_rate);

                if self.level <= target {
                    self.level = target;
                    self.stage = EnvelopeState::Sustain;
                }
            }

            EnvelopeState::Sustain => {
                self.level = self.sustain_level;
            }

            EnvelopeState::Release => {
                let progress =
                    self.release_elapsed_samples as f64 / self.release_total_samples as f64;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);

                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);

                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeState::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    /// Returns true if the envelope is producing output (not idle).
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeState::Idle
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeState::Idle;
        self.level = 0.0;
        self.decay_start_level = 0.0;
        self.release_elapsed_samples = 0;
        self.release_start_level = 0.0;
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }
}

/// Instant-attack exponential decay.
#[derive(Debug, Clone)]
pub struct DecayEnvelope {
    level: f64,
    coeff: f64,
}

impl DecayEnvelope {
    pub fn new(decay_s: f64, sample_rate: f64) -> Self {
        let mut env = Self {
            level: 0.0,
            coeff: 0.0,
        };
        env.set_decay(decay_s, sample_rate);
        env
    }

    pub fn set_decay(&mut self, decay_s: f64, sample_rate: f64) {
        self.coeff = (-1.0 / (decay_s.max(MIN_TIME) * sample_rate)).exp();
    }

    /// Jump to `peak` (usually velocity scaled).
    pub fn trigger(&mut self, peak: f64) {
        self.level = peak;
    }

    /// Cut the envelope immediately (hat choke, gate close).
    pub fn kill(&mut self) {
        self.level = 0.0;
    }

    /// Return the current level, then decay one sample.
    #[inline]
    pub fn next_sample(&mut self) -> f64 {
        let out = self.level;
        self.level *= self.coeff;
        if self.level < SILENCE {
            self.level = 0.0;
        }
        out
    }

    pub fn is_active(&self) -> bool {
        self.level > 0.0
    }

    pub fn level(&self) -> f64 {
        self.level
    }
}
