//! Benchmarks for the ADSR and one-shot decay envelopes.

use criterion::{BenchmarkId, Criterion};
use groovebox::dsp::{DecayEnvelope, Envelope};

use crate::BLOCK_SIZES;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut adsr = Envelope::adsr(0.005, 0.2, 0.6, 0.3);
        group.bench_with_input(BenchmarkId::new("adsr", size), &size, |b, &size| {
            b.iter(|| {
                adsr.note_on();
                (0..size).map(|_| adsr.next_sample(44_100.0)).sum::<f64>()
            })
        });

        let mut decay = DecayEnvelope::new(0.25, 44_100.0);
        group.bench_with_input(BenchmarkId::new("decay", size), &size, |b, &size| {
            b.iter(|| {
                decay.trigger(1.0);
                (0..size).map(|_| decay.next_sample()).sum::<f64>()
            })
        });
    }

    group.finish();
}
