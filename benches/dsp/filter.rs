//! Benchmarks for the state-variable filter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use groovebox::dsp::SvFilter;

use crate::BLOCK_SIZES;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        let input: Vec<f64> = (0..size).map(|i| ((i * 7919) % 200) as f64 / 100.0 - 1.0).collect();

        let mut fixed = SvFilter::lowpass(800.0).with_resonance(0.7);
        group.bench_with_input(BenchmarkId::new("lowpass_fixed", size), &size, |b, _| {
            b.iter(|| input.iter().map(|&s| fixed.process(black_box(s), 44_100.0)).sum::<f64>())
        });

        // per-sample cutoff, as the bassline's envelope sweep does
        let mut swept = SvFilter::lowpass(800.0).with_resonance(0.7);
        group.bench_with_input(BenchmarkId::new("lowpass_swept", size), &size, |b, _| {
            b.iter(|| {
                input
                    .iter()
                    .enumerate()
                    .map(|(i, &s)| swept.process_at(black_box(s), 200.0 + (i % 64) as f64 * 50.0, 44_100.0))
                    .sum::<f64>()
            })
        });
    }

    group.finish();
}
