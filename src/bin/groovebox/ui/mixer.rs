//! Track list widget - one row per track with volume and pan

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::UiState;

const VOLUME_CELLS: usize = 20;
const PAN_CELLS: usize = 9;

pub fn render_mixer(frame: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default().title(" Tracks ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    // keep the selection in view on short terminals
    let visible = inner.height as usize;
    let first = state.selected.saturating_sub(visible.saturating_sub(1));

    let lines: Vec<Line> = state
        .tracks
        .iter()
        .enumerate()
        .skip(first)
        .take(visible)
        .map(|(index, track)| {
            let selected = index == state.selected;
            let name_style = match (selected, track.voiced) {
                (true, _) => Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
                (false, true) => Style::default().fg(Color::White),
                (false, false) => Style::default().fg(Color::DarkGray),
            };

            let filled = (track.volume * VOLUME_CELLS as f64).round() as usize;
            let volume = format!("{}{}", "█".repeat(filled), "░".repeat(VOLUME_CELLS - filled.min(VOLUME_CELLS)));

            let knob = (track.pan as usize * (PAN_CELLS - 1) + 63) / 127;
            let pan: String = (0..PAN_CELLS).map(|i| if i == knob { '┃' } else { '─' }).collect();

            Line::from(vec![
                Span::styled(format!(" {:<10.10}", track.name), name_style),
                Span::styled(format!(" ch{:>2} ", track.channel + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(volume, Style::default().fg(Color::Green)),
                Span::raw(format!(" {:>3.0}%  L", track.volume * 100.0)),
                Span::styled(pan, Style::default().fg(Color::Yellow)),
                Span::raw("R"),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}
