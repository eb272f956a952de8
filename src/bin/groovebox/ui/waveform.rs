//! Oscilloscope of the latest mono mixdown

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

pub fn render_waveform(frame: &mut Frame, area: Rect, samples: &[f32]) {
    let len = samples.len().max(1) as f64;
    let data: Vec<(f64, f64)> = samples
        .iter()
        .enumerate()
        .map(|(i, &s)| (i as f64 / len, s as f64))
        .collect();

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(Block::default().title(" Scope ").borders(Borders::ALL))
        .x_axis(Axis::default().bounds([0.0, 1.0]).style(Style::default().fg(Color::DarkGray)))
        .y_axis(Axis::default().bounds([-1.0, 1.0]).style(Style::default().fg(Color::DarkGray)));

    frame.render_widget(chart, area);
}
