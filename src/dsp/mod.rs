//! Low-level DSP primitives used by the channel mixer and the voices.
//!
//! These components are allocation-free once constructed and realtime-safe,
//! so every channel and voice can own its own instances without any shared
//! state. They stay focused on the signal-processing math; routing and
//! scheduling live in `mix` and `sequencing`.

/// Single-tap feedback delay line (one per channel).
pub mod delay;
/// Attack/decay/sustain/release and one-shot decay envelopes.
pub mod envelope;
/// State-variable filter implementation with multiple responses.
pub mod filter;
/// Oscillator waveforms and noise sources.
pub mod oscillator;
/// Schroeder comb/all-pass reverb (one per channel).
pub mod reverb;

pub use delay::DelayUnit;
pub use envelope::{DecayEnvelope, Envelope, EnvelopeState};
pub use filter::{FilterType, SvFilter};
pub use oscillator::{Noise, Oscillator, Waveform};
pub use reverb::ReverbUnit;

/// Convert MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn midi_note_to_freq(note: u8) -> f64 {
    440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}
