//! Benchmarks for the DSP primitives and the full render path.
//!
//! Run with: cargo bench
//!
//! Reference deadlines at 44.1 kHz:
//!   - 256 frames  = 5.8 ms
//!   - 1024 frames = 23.2 ms
//!   - 2048 frames = 46.4 ms (default render block)
//!
//! Benchmark groups:
//!   - dsp/*        Delay, reverb, oscillators, filter, envelopes
//!   - scenarios/*  Shipped voices, channel strips and a whole session block

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Block lengths in frames.
pub const BLOCK_SIZES: &[usize] = &[256, 1024, 2048];

criterion_group!(
    benches,
    dsp::bench_delay,
    dsp::bench_reverb,
    dsp::bench_oscillator,
    dsp::bench_filter,
    dsp::bench_envelope,
    scenarios::bench_voices,
    scenarios::bench_mix,
);
criterion_main!(benches);
