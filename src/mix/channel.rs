/*
Channel Strip
=============

One strip per channel index (16 in total). Per frame, for an effects-routed
bus:

  StereoFrame ──┬── dry L/R ─────────────────────────┐
                ├── delay_send  → DelayUnit.input ─── output() → (dl, dr)
                └── reverb_send → ReverbUnit.input ── process() → (rl, rr)
                                                      │
          left  = dry_l + dl + rl                     │
          right = dry_r + dr + rr   ←─────────────────┘
          left *= pan_left, right *= pan_right
          pcm   = (x * 32767 * volume) as i32 → 16 bits (wrap or saturate)

Pan law
-------

The pan control is stored as an offset from centre, p ∈ [-63.5, 63.5]
(0 is centre). The gains are linear and clamp at unity on each side:

  pan_left  = 2 · min(0.5, (127 − (p + 63.5)) / 127)
  pan_right = 2 · min(0.5, (p + 63.5) / 127)

    p = -63.5   →  (1.0, 0.0)     hard left
    p =   0.0   →  (1.0, 1.0)     centre, both sides at unity
    p = +63.5   →  (0.0, 1.0)     hard right

The gains are evaluated in f32 and widened when applied, which keeps the
rendered output bit-identical to the capture format this engine replaces.
*/

use std::io::{self, Cursor, Read};

use crate::config::{DelaySettings, OverflowMode, ReverbSettings};
use crate::dsp::{DelayUnit, ReverbUnit};
use crate::io::pcm::{self, PcmFormat};
use crate::synth::StereoFrame;
use crate::SAMPLE_RATE;

/// MIDI pan value that maps to the centre offset.
pub const PAN_CENTER: f32 = 63.5;

/// Left/right gains for a pan offset in `[-63.5, 63.5]`.
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let left = 2.0 * f32::min(0.5, (127.0 - (pan + 63.5)) / 127.0);
    let right = 2.0 * f32::min(0.5, (pan + 63.5) / 127.0);
    (left, right)
}

/// How a bus passes through its channel strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Routing {
    /// Sends feed the channel's delay and reverb, the returns are summed in.
    #[default]
    Effects,
    /// Pan and volume only, for externally rendered instrument streams.
    Dry,
}

pub struct Channel {
    index: usize,
    delay: DelayUnit,
    reverb: ReverbUnit,
    pan: f32,
    gains: (f32, f32),
}

impl Channel {
    pub fn new(index: usize, delay: &DelaySettings, reverb: &ReverbSettings) -> Self {
        Self {
            index,
            delay: DelayUnit::new(delay),
            reverb: ReverbUnit::new(reverb, SAMPLE_RATE as f64),
            pan: 0.0,
            gains: pan_gains(0.0),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Pan as an offset from centre, clamped to `[-63.5, 63.5]`.
    pub fn set_pan_offset(&mut self, pan: f32) {
        self.pan = if pan.is_nan() {
            0.0
        } else {
            pan.clamp(-PAN_CENTER, PAN_CENTER)
        };
        self.gains = pan_gains(self.pan);
    }

    /// Pan from a MIDI controller value (0 hard left, 127 hard right).
    pub fn set_pan(&mut self, value: u8) {
        self.set_pan_offset(value.min(127) as f32 - PAN_CENTER);
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    /// The pan as the nearest MIDI controller value.
    pub fn pan_value(&self) -> u8 {
        (self.pan + PAN_CENTER).round().clamp(0.0, 127.0) as u8
    }

    pub fn gains(&self) -> (f32, f32) {
        self.gains
    }

    pub fn delay(&self) -> &DelayUnit {
        &self.delay
    }

    pub fn delay_mut(&mut self) -> &mut DelayUnit {
        &mut self.delay
    }

    pub fn reverb_mut(&mut self) -> &mut ReverbUnit {
        &mut self.reverb
    }

    /// Run one synthesizer frame through the strip and pack it to 16 bits.
    #[inline]
    pub fn mix_frame(
        &mut self,
        frame: StereoFrame,
        routing: Routing,
        volume: f64,
        overflow: OverflowMode,
    ) -> (i16, i16) {
        let (mut left, mut right) = (frame.left, frame.right);

        if routing == Routing::Effects {
            // input before output, or the delay is one sample short
            self.delay.input(frame.delay_send);
            let (delay_left, delay_right) = self.delay.output();
            self.reverb.input(frame.reverb_send);
            let (reverb_left, reverb_right) = self.reverb.process();

            left = left + delay_left + reverb_left;
            right = right + delay_right + reverb_right;
        }

        left *= self.gains.0 as f64;
        right *= self.gains.1 as f64;

        (
            pcm::quantize(left, volume, overflow),
            pcm::quantize(right, volume, overflow),
        )
    }

    /// Clear the effect tails.
    pub fn reset(&mut self) {
        self.delay.reset();
        self.reverb.reset();
    }
}

/// One block of a bus's packed PCM, readable through [`Read`].
#[derive(Debug, Clone)]
pub struct ChannelBuffer {
    cursor: Cursor<Vec<u8>>,
}

impl ChannelBuffer {
    pub fn new(block_frames: usize) -> Self {
        Self {
            cursor: Cursor::new(vec![0; block_frames * PcmFormat::CD.bytes_per_frame()]),
        }
    }

    /// Store a frame at `frame` (in frames from the block start).
    #[inline]
    pub fn write_frame(&mut self, frame: usize, left: i16, right: i16) {
        let offset = frame * PcmFormat::CD.bytes_per_frame();
        pcm::write_frame(&mut self.cursor.get_mut()[offset..], left, right);
    }

    /// Move the read cursor back to the block start.
    pub fn rewind(&mut self) {
        self.cursor.set_position(0);
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.cursor.get_ref()
    }

    pub fn frames(&self) -> usize {
        self.cursor.get_ref().len() / PcmFormat::CD.bytes_per_frame()
    }
}

impl Read for ChannelBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> Channel {
        Channel::new(0, &DelaySettings::default(), &ReverbSettings::default())
    }

    #[test]
    fn centre_pan_is_unity_on_both_sides() {
        assert_eq!(pan_gains(0.0), (1.0, 1.0));
    }

    #[test]
    fn extremes_clamp_at_unity() {
        assert_eq!(pan_gains(-63.5), (1.0, 0.0));
        assert_eq!(pan_gains(63.5), (0.0, 1.0));
    }

    #[test]
    fn partial_pan_attenuates_the_far_side() {
        let (left, right) = pan_gains(-31.75);
        assert_eq!(left, 1.0);
        assert!((right - 0.5).abs() < 1e-6);
    }

    #[test]
    fn midi_pan_maps_to_offset() {
        let mut ch = channel();
        ch.set_pan(0);
        assert_eq!(ch.gains(), (1.0, 0.0));
        ch.set_pan(127);
        assert_eq!(ch.gains(), (0.0, 1.0));
        assert_eq!(ch.pan_value(), 127);
    }

    #[test]
    fn dry_frame_is_scaled_and_truncated() {
        let mut ch = channel();
        let frame = StereoFrame {
            left: 0.5,
            right: -0.25,
            ..StereoFrame::SILENCE
        };
        let (l, r) = ch.mix_frame(frame, Routing::Dry, 1.0, OverflowMode::Wrap);
        assert_eq!(l, 16383);
        assert_eq!(r, -8191);
    }

    #[test]
    fn silent_sends_leave_the_dry_signal_alone() {
        let mut ch = channel();
        let frame = StereoFrame {
            left: 0.5,
            right: 0.5,
            ..StereoFrame::SILENCE
        };
        let (l, r) = ch.mix_frame(frame, Routing::Effects, 0.5, OverflowMode::Wrap);
        assert_eq!((l, r), (8191, 8191));
    }

    #[test]
    fn loud_frames_wrap_or_saturate() {
        let mut ch = channel();
        let frame = StereoFrame {
            left: 1.5,
            right: 1.5,
            ..StereoFrame::SILENCE
        };
        let wrapped = ch.mix_frame(frame, Routing::Dry, 1.0, OverflowMode::Wrap);
        let clamped = ch.mix_frame(frame, Routing::Dry, 1.0, OverflowMode::Saturate);
        assert_eq!(wrapped.0, -16386);
        assert_eq!(clamped.0, i16::MAX);
    }

    #[test]
    fn delay_send_returns_after_delay_length() {
        let delay = DelaySettings {
            capacity: 64,
            delay_frames: 8,
            feedback: 0.5,
        };
        let mut ch = Channel::new(3, &delay, &ReverbSettings::default());
        let impulse = StereoFrame {
            delay_send: 1.0,
            ..StereoFrame::SILENCE
        };

        let mut out = vec![ch.mix_frame(impulse, Routing::Effects, 1.0, OverflowMode::Wrap)];
        for _ in 0..10 {
            out.push(ch.mix_frame(StereoFrame::SILENCE, Routing::Effects, 1.0, OverflowMode::Wrap));
        }

        assert_eq!(out[0], (0, 0));
        assert_eq!(out[8], (16383, 16383));
        assert_eq!(out[9], (0, 0));
    }

    #[test]
    fn buffer_reads_back_what_was_written() {
        let mut buf = ChannelBuffer::new(2);
        buf.write_frame(1, 7, -7);
        buf.rewind();
        let mut bytes = Vec::new();
        buf.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0, 7, 0, 0xF9, 0xFF]);
    }
}
