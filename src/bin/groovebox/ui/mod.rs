//! Terminal transport view for groovebox
//!
//! Shows the transport, the sixteen tracks, and a scope and spectrum of the
//! latest rendered audio. Keys go straight to the render loop's controller.

mod mixer;
mod spectrum;
pub mod state;
mod transport;
mod waveform;

use std::time::{Duration, Instant};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use groovebox::engine::Controller;
use groovebox::synth::SynthMessage;
use groovebox::SAMPLE_RATE;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::Consumer;

pub use state::UiState;

use crate::app::VIS_BLOCK_LEN;
use mixer::render_mixer;
use spectrum::{render_spectrum, SpectrumAnalyzer};
use transport::{render_transport, AudioStats};
use waveform::render_waveform;

/// Note sent by the manual trigger key (C2: kick on the drum voices).
const TRIGGER_NOTE: u8 = 36;
const TRIGGER_VELOCITY: u8 = 110;
/// How long a manually triggered note is held.
const TRIGGER_HOLD: Duration = Duration::from_millis(150);
const VOLUME_STEP: f64 = 0.05;
const PAN_STEP: u8 = 8;

pub struct UiApp {
    vis_rx: Consumer<f32>,
    step_rx: Consumer<usize>,
    controller: Controller,
    state: UiState,
    audio_buffer: Vec<f32>,
    spectrum: SpectrumAnalyzer,
    /// Manual note waiting for its note-off: (track, release time).
    pending_release: Option<(usize, Instant)>,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        vis_rx: Consumer<f32>,
        step_rx: Consumer<usize>,
        controller: Controller,
        state: UiState,
    ) -> Self {
        Self {
            vis_rx,
            step_rx,
            controller,
            state,
            audio_buffer: vec![0.0; VIS_BLOCK_LEN],
            spectrum: SpectrumAnalyzer::new(VIS_BLOCK_LEN, SAMPLE_RATE as f32),
            pending_release: None,
            should_quit: false,
        }
    }

    pub fn run(&mut self, mut terminal: DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_audio();
            self.poll_steps();
            self.release_due_note();

            terminal.draw(|frame| self.render(frame))?;

            // ~60 fps
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        Ok(())
    }

    /// Keep the newest `VIS_BLOCK_LEN` samples.
    fn poll_audio(&mut self) {
        let available = self.vis_rx.slots();
        if available == 0 {
            return;
        }
        self.audio_buffer.extend(std::iter::from_fn(|| self.vis_rx.pop().ok()).take(available));
        if self.audio_buffer.len() > VIS_BLOCK_LEN {
            let excess = self.audio_buffer.len() - VIS_BLOCK_LEN;
            self.audio_buffer.drain(..excess);
        }
        self.spectrum.update(&self.audio_buffer);
    }

    fn poll_steps(&mut self) {
        while let Ok(step) = self.step_rx.pop() {
            self.state.step = step;
        }
    }

    fn release_due_note(&mut self) {
        if let Some((track, at)) = self.pending_release {
            if Instant::now() >= at {
                self.pending_release = None;
                self.send(|c| c.trigger(track, SynthMessage::note_off(TRIGGER_NOTE)));
            }
        }
    }

    /// Run a controller call, surfacing a rejected message in the help bar.
    fn send(&mut self, call: impl FnOnce(&Controller) -> groovebox::Result<()>) {
        if let Err(err) = call(&self.controller) {
            self.state.status = Some(err.to_string());
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        self.state.status = None;
        let selected = self.state.selected;
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char(' ') => {
                if self.state.paused {
                    self.controller.resume();
                } else {
                    self.controller.pause();
                }
                self.state.paused = !self.state.paused;
            }
            KeyCode::Up | KeyCode::Char('k') => self.state.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => self.state.select_next(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.nudge_volume(VOLUME_STEP),
            KeyCode::Char('-') => self.nudge_volume(-VOLUME_STEP),
            KeyCode::Left | KeyCode::Char('h') => self.nudge_pan(false),
            KeyCode::Right | KeyCode::Char('l') => self.nudge_pan(true),
            KeyCode::Char('[') => self.nudge_tempo(-1.0),
            KeyCode::Char(']') => self.nudge_tempo(1.0),
            KeyCode::Enter | KeyCode::Char('t') => {
                let voiced = self.state.selected_track().is_some_and(|t| t.voiced);
                if !voiced {
                    self.state.status = Some("track has no synth".to_string());
                    return;
                }
                self.send(|c| c.trigger(selected, SynthMessage::note_on(TRIGGER_NOTE, TRIGGER_VELOCITY)));
                self.pending_release = Some((selected, Instant::now() + TRIGGER_HOLD));
            }
            _ => {}
        }
    }

    fn nudge_volume(&mut self, delta: f64) {
        let selected = self.state.selected;
        let Some(track) = self.state.selected_track_mut() else {
            return;
        };
        track.volume = (track.volume + delta).clamp(0.0, 1.0);
        let volume = track.volume;
        self.send(|c| c.set_volume(selected, volume));
    }

    fn nudge_pan(&mut self, right: bool) {
        let Some(track) = self.state.selected_track_mut() else {
            return;
        };
        track.pan = if right {
            track.pan.saturating_add(PAN_STEP).min(127)
        } else {
            track.pan.saturating_sub(PAN_STEP)
        };
        let (channel, pan) = (track.channel, track.pan);
        self.send(|c| c.set_pan(channel, pan));
    }

    fn nudge_tempo(&mut self, delta: f64) {
        self.state.bpm = (self.state.bpm + delta).clamp(20.0, 300.0);
        let bpm = self.state.bpm;
        self.send(|c| c.set_tempo(bpm));
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),  // Transport bar
                Constraint::Min(8),     // Tracks
                Constraint::Length(10), // Scope + spectrum
                Constraint::Length(1),  // Help bar
            ])
            .split(area);

        let stats = AudioStats::from_buffer(&self.audio_buffer);
        render_transport(frame, rows[0], &self.state, &stats);
        render_mixer(frame, rows[1], &self.state);

        let scopes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[2]);
        render_waveform(frame, scopes[0], &self.audio_buffer);
        render_spectrum(frame, scopes[1], self.spectrum.data());

        let help = match &self.state.status {
            Some(status) => Paragraph::new(format!(" {status}")).style(Style::default().fg(Color::Red)),
            None => Paragraph::new(
                " [Q] Quit  [Space] Pause  [↑↓] Track  [+/-] Volume  [←→] Pan  [T] Trigger  [ [ ] ] Tempo",
            )
            .style(Style::default().fg(Color::DarkGray)),
        };
        frame.render_widget(help, rows[3]);
    }
}
