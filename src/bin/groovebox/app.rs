//! App - wires a session to the render loop and either the terminal UI or a
//! timed headless run.

use std::thread;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use rtrb::RingBuffer;
use tracing::info;

use groovebox::engine::{RenderLoop, Session};
use groovebox::io::{pcm, MidiClip};
use groovebox::mix::Routing;
use groovebox::output::{self, CaptureSummary};
use groovebox::synth::{cc, MidiSynth, SynthMessage};
use groovebox::EngineConfig;

use crate::ui::{UiApp, UiState};
use crate::Cli;

/// Samples kept for the waveform and spectrum views.
pub const VIS_BLOCK_LEN: usize = 1024;
/// Capacity in visualisation blocks for the render → UI ring.
const VIS_RING_BLOCKS: usize = 16;

/// Track that plays `--midi`.
const MIDI_TRACK: usize = 0;

pub struct App {
    render: RenderLoop,
    state: UiState,
    vis_rx: rtrb::Consumer<f32>,
    step_rx: rtrb::Consumer<usize>,
}

impl App {
    pub fn new(cli: &Cli, config: EngineConfig) -> EyreResult<Self> {
        let mut session = Session::groovebox(&config)?;

        if let Some(path) = &cli.midi {
            let bytes = std::fs::read(path)
                .wrap_err_with(|| format!("failed to read {}", path.display()))?;
            let clip = MidiClip::from_smf(&bytes)?;
            session.load_midi_clip(MIDI_TRACK, clip)?;
            session.attach_synth(MIDI_TRACK, Box::new(MidiSynth::new("midi synth", 8)), Routing::Dry)?;
            session.trigger(MIDI_TRACK, SynthMessage::cc(cc::LEVEL, 127));
        }

        let state = UiState::new(&session, cli.no_device);
        let device = if cli.no_device {
            output::null_device(true)
        } else {
            output::default_device()
        };

        let (mut vis_tx, vis_rx) = RingBuffer::<f32>::new(VIS_BLOCK_LEN * VIS_RING_BLOCKS);
        let (mut step_tx, step_rx) = RingBuffer::<usize>::new(64);
        let render = RenderLoop::new(session, device)
            .on_visualize(move |block| {
                // mono mixdown for the scope, dropped when the UI falls behind
                for (left, right) in pcm::frames(block) {
                    let mono = (left as f32 + right as f32) / (2.0 * pcm::FULL_SCALE as f32);
                    if vis_tx.push(mono).is_err() {
                        break;
                    }
                }
            })
            .on_step_change(move |step| {
                let _ = step_tx.push(step);
            });

        Ok(Self {
            render,
            state,
            vis_rx,
            step_rx,
        })
    }

    pub fn run_headless(mut self, seconds: f64) -> EyreResult<()> {
        if !(seconds.is_finite() && seconds >= 0.0) {
            return Err(eyre!("--seconds must be a non-negative number, got {seconds}"));
        }
        self.render.start()?;
        info!(seconds, "rendering headless");
        thread::sleep(Duration::from_secs_f64(seconds));
        let summary = self.render.stop()?;
        print_summary(&summary);
        Ok(())
    }

    pub fn run_interactive(mut self) -> EyreResult<()> {
        self.render.start()?;
        let controller = self.render.controller();

        let terminal = ratatui::init();
        let mut ui = UiApp::new(self.vis_rx, self.step_rx, controller, self.state);
        let res = ui.run(terminal);
        ratatui::restore();

        // finalise even when the UI failed, the capture is still worth keeping
        let summary = self.render.stop();
        res?;
        print_summary(&summary?);
        Ok(())
    }
}

fn print_summary(summary: &CaptureSummary) {
    let seconds = summary.data_len as f64 / pcm::PcmFormat::CD.byte_rate() as f64;
    println!(
        "Wrote {} ({:.1} s, {} bytes)",
        summary.wav_path.display(),
        seconds,
        summary.data_len
    );
    if let Some(raw) = &summary.raw_path {
        println!("Raw capture kept at {}", raw.display());
    }
}
