//! Session - every track, channel strip and bus buffer of one render.
//!
//! Model: one track = one sequencer on a channel, optionally driving one
//! synthesizer. A track with a synthesizer owns a bus, the per-block byte
//! buffer that its channel strip writes into. Blocks are produced by ticking
//! every sequencer in lockstep, one frame at a time, and then summing the
//! bus buffers through the [`StreamMultiplexer`].

use std::io::Read;

use tracing::{debug, info};

use super::control::ControlMessage;
use crate::config::{EngineConfig, OverflowMode};
use crate::error::{EngineError, Result};
use crate::io::midi::{MidiClip, MidiMap};
use crate::io::pcm::PcmFormat;
use crate::mix::{Channel, ChannelBuffer, Routing, StreamMultiplexer};
use crate::sequencing::{MidiSequencer, Sequencer};
use crate::synth::{cc, SynthMessage, Synthesizer};
use crate::CHANNEL_COUNT;

struct Track {
    sequencer: Box<dyn Sequencer>,
    channel: usize,
    bus: Option<usize>,
}

struct Bus {
    synth: Box<dyn Synthesizer>,
    routing: Routing,
}

/// A read-only view of one track, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub name: String,
    pub channel: usize,
    pub volume: f64,
    /// Channel pan as a MIDI value (64 is centre).
    pub pan: u8,
    pub step: usize,
    pub synth: Option<String>,
}

pub struct Session {
    config: EngineConfig,
    block_frames: usize,
    overflow: OverflowMode,
    bpm: f64,
    tracks: Vec<Track>,
    buses: Vec<Bus>,
    // kept apart from `buses` so the multiplexer can read them as a slice
    bus_buffers: Vec<ChannelBuffer>,
    channels: Vec<Channel>,
    multiplexer: StreamMultiplexer,
    midi_map: MidiMap,
    mixed: Vec<u8>,
}

impl Session {
    /// An empty session with all channel strips built from `config`.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let channels = (0..CHANNEL_COUNT)
            .map(|index| Channel::new(index, &config.delay, &config.reverb))
            .collect();

        Ok(Self {
            config: config.clone(),
            block_frames: config.block_frames,
            overflow: config.overflow,
            bpm: config.bpm,
            tracks: Vec::new(),
            buses: Vec::new(),
            bus_buffers: Vec::new(),
            channels,
            multiplexer: StreamMultiplexer::new(PcmFormat::CD, config.overflow),
            midi_map: MidiMap::new(),
            mixed: vec![0; config.block_bytes()],
        })
    }

    /// Add a track that only sequences (no synthesizer, nothing mixed).
    pub fn add_track(&mut self, channel: usize, sequencer: Box<dyn Sequencer>) -> Result<usize> {
        check_channel(channel)?;
        self.tracks.push(Track {
            sequencer,
            channel,
            bus: None,
        });
        Ok(self.tracks.len() - 1)
    }

    /// Add a track whose synthesizer is mixed on `channel`.
    pub fn add_voiced_track(
        &mut self,
        channel: usize,
        sequencer: Box<dyn Sequencer>,
        synth: Box<dyn Synthesizer>,
        routing: Routing,
    ) -> Result<usize> {
        let track = self.add_track(channel, sequencer)?;
        self.attach_synth(track, synth, routing)?;
        Ok(track)
    }

    /// Bind `synth` to an existing track, replacing any synthesizer it had.
    pub fn attach_synth(
        &mut self,
        track: usize,
        synth: Box<dyn Synthesizer>,
        routing: Routing,
    ) -> Result<()> {
        let slot = self.tracks.get_mut(track).ok_or_else(|| unknown_track(track))?;
        debug!(track, synth = synth.name(), ?routing, "synth attached");
        match slot.bus {
            Some(bus) => self.buses[bus] = Bus { synth, routing },
            None => {
                self.buses.push(Bus { synth, routing });
                self.bus_buffers.push(ChannelBuffer::new(self.block_frames));
                slot.bus = Some(self.buses.len() - 1);
            }
        }
        Ok(())
    }

    /// Swap a track's sequencer. The bound synthesizer is silenced so no note
    /// of the old sequencer is left hanging.
    pub fn set_sequencer(&mut self, track: usize, sequencer: Box<dyn Sequencer>) -> Result<()> {
        let slot = self.tracks.get_mut(track).ok_or_else(|| unknown_track(track))?;
        let volume = slot.sequencer.volume();
        slot.sequencer = sequencer;
        slot.sequencer.set_volume(volume);
        if let Some(bus) = slot.bus {
            self.buses[bus].synth.handle(SynthMessage::AllNotesOff);
        }
        Ok(())
    }

    /// Play `clip` on `track` from the top at the session tempo.
    pub fn load_midi_clip(&mut self, track: usize, clip: MidiClip) -> Result<()> {
        let name = self
            .tracks
            .get(track)
            .map(|t| t.sequencer.name().to_string())
            .ok_or_else(|| unknown_track(track))?;
        info!(track, events = clip.events().len(), pulses = clip.length_pulses(), "MIDI clip loaded");
        self.set_sequencer(track, Box::new(MidiSequencer::new(name, clip, self.bpm)))
    }

    /// Mix an externally rendered s16le stereo stream into every block.
    pub fn add_stream(&mut self, stream: Box<dyn Read + Send>) {
        self.multiplexer.add_stream(stream);
    }

    pub fn midi_map(&self) -> &MidiMap {
        &self.midi_map
    }

    pub fn midi_map_mut(&mut self) -> &mut MidiMap {
        &mut self.midi_map
    }

    /// The configuration the session was built from; capture paths and the
    /// pause poll are read from here at start.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn block_frames(&self) -> usize {
        self.block_frames
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn overflow(&self) -> OverflowMode {
        self.overflow
    }

    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut Channel> {
        self.channels.get_mut(index)
    }

    /// Step of the first track, which drives the step-change callback.
    pub fn current_step(&self) -> Option<usize> {
        self.tracks.first().map(|t| t.sequencer.step())
    }

    pub fn track_info(&self) -> Vec<TrackInfo> {
        self.tracks
            .iter()
            .map(|t| TrackInfo {
                name: t.sequencer.name().to_string(),
                channel: t.channel,
                volume: t.sequencer.volume(),
                pan: self.channels[t.channel].pan_value(),
                step: t.sequencer.step(),
                synth: t.bus.map(|b| self.buses[b].synth.name().to_string()),
            })
            .collect()
    }

    /// Apply one queued control message. Messages naming a track or channel
    /// that does not exist are dropped.
    pub fn apply(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::SetVolume { track, volume } => match self.tracks.get_mut(track) {
                Some(t) => t.sequencer.set_volume(volume),
                None => debug!(track, "volume for unknown track dropped"),
            },
            ControlMessage::SetPan { channel, value } => match self.channels.get_mut(channel) {
                Some(ch) => ch.set_pan(value),
                None => debug!(channel, "pan for unknown channel dropped"),
            },
            ControlMessage::SetTempo(bpm) => self.set_tempo(bpm),
            ControlMessage::Trigger { track, message } => self.trigger(track, message),
            ControlMessage::Midi(event) => {
                if let Some(mapped) = self.midi_map.resolve(&event) {
                    self.trigger(mapped.track, mapped.message);
                }
            }
        }
    }

    /// Retime every sequencer without moving its position.
    pub fn set_tempo(&mut self, bpm: f64) {
        if !(bpm.is_finite() && bpm > 0.0) {
            debug!(bpm, "invalid tempo dropped");
            return;
        }
        self.bpm = bpm;
        for track in &mut self.tracks {
            track.sequencer.set_tempo(bpm);
        }
    }

    /// Send `message` straight to a track's synthesizer.
    pub fn trigger(&mut self, track: usize, message: SynthMessage) {
        match self.tracks.get(track).and_then(|t| t.bus) {
            Some(bus) => self.buses[bus].synth.handle(message),
            None => debug!(track, ?message, "trigger for a track without a synth dropped"),
        }
    }

    /// Send `message` to every synthesizer, e.g. the initial CC 39 = 127.
    pub fn broadcast(&mut self, message: SynthMessage) {
        for bus in &mut self.buses {
            bus.synth.handle(message);
        }
    }

    /// Render one block of interleaved s16le stereo.
    pub fn render_block(&mut self) -> &[u8] {
        for frame in 0..self.block_frames {
            for track in &mut self.tracks {
                let synth = match track.bus {
                    Some(bus) => Some(self.buses[bus].synth.as_mut() as &mut dyn Synthesizer),
                    None => None,
                };
                track.sequencer.tick(synth);
            }

            for track in &self.tracks {
                let Some(bus) = track.bus else {
                    continue;
                };
                let Bus { synth, routing } = &mut self.buses[bus];
                let (left, right) = self.channels[track.channel].mix_frame(
                    synth.stereo_output(),
                    *routing,
                    track.sequencer.volume(),
                    self.overflow,
                );
                self.bus_buffers[bus].write_frame(frame, left, right);
            }
        }

        for buffer in &mut self.bus_buffers {
            buffer.rewind();
        }

        let buses = self.bus_buffers.as_mut_slice();
        let filled = match self.multiplexer.read_mixed(buses, &mut self.mixed) {
            Ok(filled) => filled,
            Err(err) => {
                // in-memory buses cannot fail, so this is an internal bug
                tracing::error!(error = %err, "bus read failed, emitting silence");
                0
            }
        };
        self.mixed[filled..].fill(0);
        &self.mixed
    }

    /// Shortcut for `set_pan` on a channel by MIDI value, as CC 10 would.
    pub fn set_pan(&mut self, channel: usize, value: u8) {
        self.apply(ControlMessage::SetPan { channel, value });
    }

    /// Shortcut for CC 39 on every synthesizer.
    pub fn set_levels(&mut self, value: u8) {
        self.broadcast(SynthMessage::cc(cc::LEVEL, value));
    }
}

fn check_channel(channel: usize) -> Result<()> {
    if channel >= CHANNEL_COUNT {
        return Err(EngineError::Config(format!(
            "channel {channel} out of range 0..{CHANNEL_COUNT}"
        )));
    }
    Ok(())
}

fn unknown_track(track: usize) -> EngineError {
    EngineError::Config(format!("no track {track}"))
}
