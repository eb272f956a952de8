// Purpose: Voices driven by sequencer triggers
// Every synthesizer produces one StereoFrame per frame; the channel mixer
// downstream owns the effects, pan law and clipping.

pub mod bassline;
pub mod instrument;
pub mod message;
pub mod poly;
pub mod rhythm;
pub mod voice;

pub use bassline::BasslineSynth;
pub use instrument::InstrumentSynth;
pub use message::SynthMessage;
pub use poly::MidiSynth;
pub use rhythm::RhythmSynth;

/// Controller numbers understood by the shipped voices.
pub mod cc {
    pub const VOLUME: u8 = 7;
    pub const PAN: u8 = 10;
    /// Output level of the voice, before the sends are tapped.
    pub const LEVEL: u8 = 39;
    pub const WAVEFORM: u8 = 70;
    pub const RESONANCE: u8 = 71;
    pub const DECAY: u8 = 72;
    pub const CUTOFF: u8 = 74;
    pub const ENV_MOD: u8 = 75;
    pub const REVERB_SEND: u8 = 91;
    pub const DELAY_SEND: u8 = 94;
}

/// One frame of synthesizer output: the dry pair plus the aux sends.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f64,
    pub right: f64,
    pub delay_send: f64,
    pub reverb_send: f64,
}

impl StereoFrame {
    pub const SILENCE: Self = Self {
        left: 0.0,
        right: 0.0,
        delay_send: 0.0,
        reverb_send: 0.0,
    };
}

/// A signal generator bound to one track.
///
/// `stereo_output` is called exactly once per frame, right after the owning
/// sequencer's `tick`. Output is nominally [-1, 1] but never clamped here.
pub trait Synthesizer: Send {
    fn handle(&mut self, message: SynthMessage);

    fn stereo_output(&mut self) -> StereoFrame;

    /// Whether any voice is still sounding.
    fn is_active(&self) -> bool;

    fn name(&self) -> &str;
}

/// Level and aux-send amounts shared by all shipped voices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputStage {
    pub level: f64,
    pub delay_send: f64,
    pub reverb_send: f64,
}

impl Default for OutputStage {
    fn default() -> Self {
        Self {
            // MIDI's customary default of 100
            level: 100.0 / 127.0,
            delay_send: 0.0,
            reverb_send: 0.0,
        }
    }
}

impl OutputStage {
    /// Apply a level/send controller. Returns false if `controller` is not
    /// one of them.
    pub fn control_change(&mut self, controller: u8, value: u8) -> bool {
        let amount = value.min(127) as f64 / 127.0;
        match controller {
            cc::LEVEL => self.level = amount,
            cc::DELAY_SEND => self.delay_send = amount,
            cc::REVERB_SEND => self.reverb_send = amount,
            _ => return false,
        }
        true
    }

    /// Spread a mono voice sample across both sides and tap the sends.
    #[inline]
    pub fn mono(&self, sample: f64) -> StereoFrame {
        self.stereo(sample, sample)
    }

    #[inline]
    pub fn stereo(&self, left: f64, right: f64) -> StereoFrame {
        let left = left * self.level;
        let right = right * self.level;
        let mid = 0.5 * (left + right);
        StereoFrame {
            left,
            right,
            delay_send: mid * self.delay_send,
            reverb_send: mid * self.reverb_send,
        }
    }
}

/// Map a 0-127 controller value exponentially onto `min..=max`.
#[inline]
pub(crate) fn cc_exp(value: u8, min: f64, max: f64) -> f64 {
    let t = value.min(127) as f64 / 127.0;
    min * (max / min).powf(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_stage_taps_sends_after_level() {
        let mut stage = OutputStage::default();
        assert!(stage.control_change(cc::LEVEL, 127));
        assert!(stage.control_change(cc::DELAY_SEND, 127));
        assert!(!stage.control_change(cc::CUTOFF, 10));

        let frame = stage.mono(0.5);
        assert_eq!(frame.left, 0.5);
        assert_eq!(frame.right, 0.5);
        assert_eq!(frame.delay_send, 0.5);
        assert_eq!(frame.reverb_send, 0.0);
    }

    #[test]
    fn cc_exp_spans_range() {
        assert!((cc_exp(0, 50.0, 5000.0) - 50.0).abs() < 1e-9);
        assert!((cc_exp(127, 50.0, 5000.0) - 5000.0).abs() < 1e-6);
    }
}
