//! Benchmarks for the feedback delay unit.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use groovebox::dsp::DelayUnit;

use crate::BLOCK_SIZES;

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    let delay_times: &[usize] = &[
        441,    // 10ms
        16_537, // dotted eighth at 120 BPM
        44_100, // 1 second
    ];

    for &size in BLOCK_SIZES {
        let input: Vec<f64> = (0..size).map(|i| (i as f64 * 0.1).sin()).collect();

        for &delay_frames in delay_times {
            let mut delay = DelayUnit::with_params(1 << 16, delay_frames, 0.5);
            group.bench_with_input(
                BenchmarkId::new(format!("input_output_{}ms", delay_frames * 1000 / 44_100), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        let mut sum = 0.0;
                        for &sample in &input {
                            delay.input(black_box(sample));
                            sum += delay.output().0;
                        }
                        sum
                    })
                },
            );
        }
    }

    group.finish();
}
