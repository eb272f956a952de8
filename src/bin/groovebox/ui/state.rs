//! What the UI shows, mirrored on the UI thread.
//!
//! The render thread only reports steps and audio; volume, pan and tempo
//! are changed from here, so the UI keeps its own copy and updates it as it
//! sends each change through the controller.

use groovebox::engine::Session;
use groovebox::STEPS_PER_BAR;

#[derive(Clone, Debug)]
pub struct TrackRow {
    pub name: String,
    pub channel: usize,
    pub volume: f64,
    /// MIDI pan value, 64 is centre.
    pub pan: u8,
    /// Whether the track drives a synthesizer.
    pub voiced: bool,
}

#[derive(Clone, Debug)]
pub struct UiState {
    pub bpm: f64,
    pub paused: bool,
    /// Step of the first track, as last reported.
    pub step: usize,
    pub steps: usize,
    pub selected: usize,
    pub tracks: Vec<TrackRow>,
    pub device: &'static str,
    /// One-line message shown in the help bar.
    pub status: Option<String>,
}

impl UiState {
    pub fn new(session: &Session, no_device: bool) -> Self {
        let tracks = session
            .track_info()
            .into_iter()
            .map(|t| TrackRow {
                name: t.name,
                channel: t.channel,
                volume: t.volume,
                pan: t.pan,
                voiced: t.synth.is_some(),
            })
            .collect();

        Self {
            bpm: session.bpm(),
            paused: false,
            step: 0,
            steps: STEPS_PER_BAR,
            selected: 0,
            tracks,
            device: if no_device { "no device" } else { "default output" },
            status: None,
        }
    }

    pub fn selected_track(&self) -> Option<&TrackRow> {
        self.tracks.get(self.selected)
    }

    pub fn selected_track_mut(&mut self) -> Option<&mut TrackRow> {
        self.tracks.get_mut(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.tracks.is_empty() {
            self.selected = (self.selected + 1) % self.tracks.len();
        }
    }

    pub fn select_previous(&mut self) {
        if !self.tracks.is_empty() {
            self.selected = (self.selected + self.tracks.len() - 1) % self.tracks.len();
        }
    }
}
