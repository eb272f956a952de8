//! Spectrum widget
//!
//! Hann-windowed FFT of the scope buffer, folded into log-spaced bands. Each
//! band shows the strongest FFT bin it covers, in dB relative to a full-scale
//! sine.

use std::f32::consts::PI;
use std::sync::Arc;

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

const BANDS: usize = 48;
const LOW_HZ: f32 = 20.0;
const FLOOR_DB: f64 = -96.0;

pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    /// FFT bin range covered by each band.
    bands: Vec<(usize, usize)>,
    /// (log10 of band centre in Hz, level in dB)
    levels: Vec<(f64, f64)>,
    /// Normalises magnitudes so a full-scale sine reads 0 dB.
    reference: f32,
}

impl SpectrumAnalyzer {
    pub fn new(len: usize, sample_rate: f32) -> Self {
        let len = len.max(2);
        let fft = FftPlanner::new().plan_fft_forward(len);
        let window: Vec<f32> = (0..len)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (len - 1) as f32).cos()))
            .collect();
        let reference = window.iter().sum::<f32>() / 2.0;

        let half = len / 2;
        let hz_per_bin = sample_rate / len as f32;
        let high = (sample_rate / 2.0).min(20_000.0);
        let edge = |i: usize| LOW_HZ * (high / LOW_HZ).powf(i as f32 / BANDS as f32);

        let mut bands = Vec::with_capacity(BANDS);
        let mut levels = Vec::with_capacity(BANDS);
        for i in 0..BANDS {
            let (lo, hi) = (edge(i), edge(i + 1));
            let first = ((lo / hz_per_bin).floor() as usize).clamp(1, half - 1);
            let last = ((hi / hz_per_bin).ceil() as usize).clamp(first + 1, half);
            bands.push((first, last));
            levels.push((((lo * hi).sqrt() as f64).log10(), FLOOR_DB));
        }

        Self {
            fft,
            window,
            scratch: vec![Complex::new(0.0, 0.0); len],
            bands,
            levels,
            reference,
        }
    }

    pub fn update(&mut self, samples: &[f32]) {
        if samples.len() != self.window.len() {
            return;
        }
        for ((bin, &s), &w) in self.scratch.iter_mut().zip(samples).zip(&self.window) {
            *bin = Complex::new(s * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        for (&(first, last), level) in self.bands.iter().zip(self.levels.iter_mut()) {
            let peak = self.scratch[first..last]
                .iter()
                .map(|c| c.norm())
                .fold(0.0f32, f32::max);
            let db = 20.0 * ((peak / self.reference).max(1e-9) as f64).log10();
            level.1 = db.max(FLOOR_DB);
        }
    }

    pub fn data(&self) -> &[(f64, f64)] {
        &self.levels
    }
}

pub fn render_spectrum(frame: &mut Frame, area: Rect, levels: &[(f64, f64)]) {
    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(levels);

    let chart = Chart::new(vec![dataset])
        .block(Block::default().title(" Spectrum ").borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .bounds([LOW_HZ.log10() as f64, 20_000f64.log10()])
                .labels(vec!["20", "200", "2k", "20k"])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([FLOOR_DB, 6.0])
                .labels(vec!["-96", "-48", "0"])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
