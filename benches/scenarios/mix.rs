//! Benchmarks for the mixing path: channel strips, stream summing and a
//! whole preset session block.

use std::hint::black_box;
use std::io::Cursor;

use criterion::{BenchmarkId, Criterion};
use groovebox::engine::Session;
use groovebox::io::PcmFormat;
use groovebox::mix::{Channel, Routing, StreamMultiplexer};
use groovebox::synth::StereoFrame;
use groovebox::{DelaySettings, EngineConfig, OverflowMode, ReverbSettings};

use crate::BLOCK_SIZES;

pub fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/mix");

    for &size in BLOCK_SIZES {
        let frames: Vec<StereoFrame> = (0..size)
            .map(|i| {
                let s = (i as f64 * 0.05).sin() * 0.5;
                StereoFrame {
                    left: s,
                    right: s,
                    delay_send: s * 0.3,
                    reverb_send: s * 0.3,
                }
            })
            .collect();

        let mut channel = Channel::new(0, &DelaySettings::default(), &ReverbSettings::default());
        group.bench_with_input(BenchmarkId::new("channel_strip", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0i64;
                for &frame in &frames {
                    let (l, r) = channel.mix_frame(black_box(frame), Routing::Effects, 0.8, OverflowMode::Wrap);
                    acc += l as i64 + r as i64;
                }
                acc
            })
        });

        // four buses, like the preset's voiced tracks
        let bus = vec![0x55u8; size * 4];
        let mut mux = StreamMultiplexer::new(PcmFormat::CD, OverflowMode::Wrap);
        let mut out = vec![0u8; size * 4];
        group.bench_with_input(BenchmarkId::new("multiplex_4", size), &size, |b, _| {
            b.iter(|| {
                let mut streams: Vec<Cursor<&[u8]>> = (0..4).map(|_| Cursor::new(bus.as_slice())).collect();
                mux.read_mixed(black_box(streams.as_mut_slice()), &mut out)
            })
        });

        let config = EngineConfig::default().block_frames(size);
        if let Ok(mut session) = Session::groovebox(&config) {
            group.bench_with_input(BenchmarkId::new("preset_session_block", size), &size, |b, _| {
                b.iter(|| black_box(session.render_block()).len())
            });
        }
    }

    group.finish();
}
