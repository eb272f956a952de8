//! Transport bar widget - tempo, play state, step position and levels

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::UiState;

pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

pub fn render_transport(frame: &mut Frame, area: Rect, state: &UiState, stats: &AudioStats) {
    let block = Block::default().title(" groovebox ").borders(Borders::ALL);

    let (symbol, label, color) = if state.paused {
        ("⏸", "Paused", Color::Yellow)
    } else {
        ("▶", "Running", Color::Green)
    };

    // one cell per sixteenth, beats marked
    let steps: String = (0..state.steps)
        .map(|i| match (i == state.step, i % 4 == 0) {
            (true, _) => '●',
            (false, true) => '○',
            (false, false) => '·',
        })
        .collect();

    let line = Line::from(vec![
        Span::styled(format!(" BPM: {:.0}  ", state.bpm), Style::default().fg(Color::Cyan)),
        Span::styled(format!("{symbol} {label}  "), Style::default().fg(color)),
        Span::styled(format!("{steps}  "), Style::default().fg(Color::White)),
        Span::styled(
            format!("Step {:>2}/{}  ", state.step + 1, state.steps),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(format!("{}  ", state.device), Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}", stats.peak, stats.rms),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}
