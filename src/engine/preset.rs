//! The default sixteen-track groovebox.
//!
//! # Layout
//!
//! | Tracks | Sequencer                        | Synth           | Channel |
//! |--------|----------------------------------|-----------------|---------|
//! | 0-7    | MIDI clip (one per MIDI channel) | none            | 0-7     |
//! | 8-11   | note pattern (9 in drum mode)    | none            | 8-11    |
//! | 12, 13 | bassline A, B                    | bassline A, B   | 12, 13  |
//! | 14, 15 | rhythm A, B                      | rhythm A, B     | 14, 15  |
//!
//! Tracks without a synthesizer still tick and keep their step position;
//! a synthesizer can be attached later with
//! [`Session::attach_synth`](super::Session::attach_synth), and a clip
//! loaded with [`Session::load_midi_clip`](super::Session::load_midi_clip).
//!
//! Every synthesizer starts with its output level (CC 39) at 127. The demo
//! patterns make the preset audible as soon as it starts.

use super::session::Session;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::io::midi::{MidiClip, MidiKey};
use crate::mix::Routing;
use crate::sequencing::{
    BassStep, BasslinePattern, BasslineSequencer, DrumVoice, InstrumentSequencer, MidiSequencer,
    NotePattern, RhythmPattern, RhythmSequencer,
};
use crate::synth::{cc, BasslineSynth, RhythmSynth, SynthMessage};
use crate::STEPS_PER_BAR;

pub const BASS_A: usize = 12;
pub const BASS_B: usize = 13;
pub const RHYTHM_A: usize = 14;
pub const RHYTHM_B: usize = 15;

/// General MIDI percussion channel, zero based.
const GM_DRUM_CHANNEL: u8 = 9;

impl Session {
    /// Build the default groovebox wiring.
    pub fn groovebox(config: &EngineConfig) -> Result<Self> {
        let bpm = config.bpm;
        let mut session = Session::new(config)?;

        for channel in 0..8u8 {
            let clip = MidiClip::bars(MidiClip::DEFAULT_PPQ, 1);
            let sequencer = MidiSequencer::new(format!("midi {}", channel + 1), clip, bpm).channel(channel);
            session.add_track(channel as usize, Box::new(sequencer))?;
        }

        for channel in 8..12 {
            let sequencer = InstrumentSequencer::new(
                format!("inst {}", channel - 7),
                NotePattern::new(STEPS_PER_BAR),
                bpm,
            )
            .drum_mode(channel == 9);
            session.add_track(channel, Box::new(sequencer))?;
        }

        session.add_voiced_track(
            BASS_A,
            Box::new(BasslineSequencer::new("bass A", acid_line(), bpm)),
            Box::new(BasslineSynth::new("bassline A")),
            Routing::Effects,
        )?;
        session.add_voiced_track(
            BASS_B,
            Box::new(BasslineSequencer::new("bass B", BasslinePattern::new(STEPS_PER_BAR), bpm)),
            Box::new(BasslineSynth::new("bassline B")),
            Routing::Effects,
        )?;
        session.add_voiced_track(
            RHYTHM_A,
            Box::new(RhythmSequencer::new("drums A", four_on_the_floor(), bpm)),
            Box::new(RhythmSynth::new("rhythm A")),
            Routing::Effects,
        )?;
        session.add_voiced_track(
            RHYTHM_B,
            Box::new(RhythmSequencer::new("drums B", offbeat_claps(), bpm)),
            Box::new(RhythmSynth::new("rhythm B")),
            Routing::Effects,
        )?;

        session.set_levels(127);
        session.trigger(BASS_A, SynthMessage::cc(cc::DELAY_SEND, 40));
        session.trigger(RHYTHM_B, SynthMessage::cc(cc::REVERB_SEND, 50));

        // pads on the GM drum channel play rhythm A
        for voice in DrumVoice::ALL {
            session.midi_map_mut().bind(
                MidiKey::Note {
                    channel: GM_DRUM_CHANNEL,
                    key: voice.note(),
                },
                RHYTHM_A,
                SynthMessage::note_on(voice.note(), 127),
            );
        }

        Ok(session)
    }
}

fn acid_line() -> BasslinePattern {
    BasslinePattern::from_steps(vec![
        BassStep::note(36).accent(),
        BassStep::REST,
        BassStep::note(36),
        BassStep::note(48).slide(),
        BassStep::REST,
        BassStep::note(36),
        BassStep::note(39).accent(),
        BassStep::REST,
        BassStep::note(36),
        BassStep::note(36),
        BassStep::note(43).slide(),
        BassStep::note(41).slide(),
        BassStep::REST,
        BassStep::note(36).accent(),
        BassStep::REST,
        BassStep::note(46),
    ])
}

fn four_on_the_floor() -> RhythmPattern {
    RhythmPattern::new(STEPS_PER_BAR)
        .with_row(DrumVoice::Kick, "x...x...x...x...")
        .with_row(DrumVoice::Snare, "....x.......x...")
        .with_row(DrumVoice::ClosedHat, "x.x.x.x.x.x.x.x.")
        .with_accents("x...x...x...x...")
}

fn offbeat_claps() -> RhythmPattern {
    RhythmPattern::new(STEPS_PER_BAR)
        .with_row(DrumVoice::Clap, "....x.......x..x")
        .with_row(DrumVoice::OpenHat, "..x...x...x...x.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MidiEvent;

    #[test]
    fn preset_has_sixteen_tracks_in_channel_order() {
        let session = Session::groovebox(&EngineConfig::default()).unwrap();
        let tracks = session.track_info();
        assert_eq!(tracks.len(), 16);
        for (index, track) in tracks.iter().enumerate() {
            assert_eq!(track.channel, index);
        }
        assert!(tracks[..12].iter().all(|t| t.synth.is_none()));
        assert_eq!(tracks[RHYTHM_B].synth.as_deref(), Some("rhythm B"));
        assert_eq!(tracks[BASS_A].synth.as_deref(), Some("bassline A"));
    }

    #[test]
    fn preset_is_audible() {
        let mut session = Session::groovebox(&EngineConfig::default()).unwrap();
        let block = session.render_block();
        assert!(block.iter().any(|&b| b != 0));
    }

    #[test]
    fn drum_pads_are_mapped() {
        let session = Session::groovebox(&EngineConfig::default()).unwrap();
        let pad = MidiEvent::NoteOn {
            channel: GM_DRUM_CHANNEL,
            key: 38,
            velocity: 64,
        };
        let mapped = session.midi_map().resolve(&pad).unwrap();
        assert_eq!(mapped.track, RHYTHM_A);
        assert_eq!(mapped.message, SynthMessage::note_on(38, 127));
    }
}
