//! Benchmarks for oscillators and the noise source.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use groovebox::dsp::{Noise, Oscillator};

use crate::BLOCK_SIZES;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        let oscillators = [
            ("sine", Oscillator::sine()),
            ("saw", Oscillator::saw()),
            ("square", Oscillator::square()),
        ];
        for (label, mut osc) in oscillators {
            group.bench_with_input(BenchmarkId::new(label, size), &size, |b, &size| {
                b.iter(|| {
                    let mut sum = 0.0;
                    for _ in 0..size {
                        sum += osc.next_sample(black_box(110.0), 44_100.0);
                    }
                    sum
                })
            });
        }

        let mut noise = Noise::default();
        group.bench_with_input(BenchmarkId::new("noise", size), &size, |b, &size| {
            b.iter(|| (0..size).map(|_| noise.next_sample()).sum::<f64>())
        });
    }

    group.finish();
}
