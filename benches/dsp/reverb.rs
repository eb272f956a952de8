//! Benchmarks for the Schroeder reverb unit.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use groovebox::dsp::ReverbUnit;
use groovebox::ReverbSettings;

use crate::BLOCK_SIZES;

pub fn bench_reverb(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/reverb");

    let rooms = [("small", 0.2), ("large", 0.9)];

    for &size in BLOCK_SIZES {
        let input: Vec<f64> = (0..size).map(|i| if i % 512 == 0 { 1.0 } else { 0.0 }).collect();

        for (label, room_size) in rooms {
            let settings = ReverbSettings {
                room_size,
                damping: 0.4,
            };
            let mut reverb = ReverbUnit::new(&settings, 44_100.0);
            group.bench_with_input(BenchmarkId::new(label, size), &size, |b, _| {
                b.iter(|| {
                    let mut sum = 0.0;
                    for &sample in &input {
                        reverb.input(black_box(sample));
                        let (left, right) = reverb.process();
                        sum += left + right;
                    }
                    sum
                })
            });
        }
    }

    group.finish();
}
