//! Benchmarks for the shipped synthesizers, one block of frames each.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use groovebox::dsp::Waveform;
use groovebox::synth::{BasslineSynth, InstrumentSynth, MidiSynth, RhythmSynth, SynthMessage, Synthesizer};

use crate::BLOCK_SIZES;

fn render(synth: &mut dyn Synthesizer, frames: usize) -> f64 {
    (0..frames).map(|_| synth.stereo_output().left).sum()
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");

    for &size in BLOCK_SIZES {
        let mut bass = BasslineSynth::new("bass");
        group.bench_with_input(BenchmarkId::new("bassline", size), &size, |b, &size| {
            b.iter(|| {
                bass.handle(SynthMessage::note_on(36, 127));
                render(black_box(&mut bass), size)
            })
        });

        let mut drums = RhythmSynth::new("drums");
        group.bench_with_input(BenchmarkId::new("rhythm_all_voices", size), &size, |b, &size| {
            b.iter(|| {
                for note in [36, 38, 39, 42, 46] {
                    drums.handle(SynthMessage::note_on(note, 100));
                }
                render(black_box(&mut drums), size)
            })
        });

        let mut lead = InstrumentSynth::new("lead", Waveform::Saw);
        group.bench_with_input(BenchmarkId::new("instrument", size), &size, |b, &size| {
            b.iter(|| {
                lead.handle(SynthMessage::note_on(60, 100));
                render(black_box(&mut lead), size)
            })
        });

        // full chord on every voice
        let mut poly = MidiSynth::new("poly", 8);
        group.bench_with_input(BenchmarkId::new("midi_8_voices", size), &size, |b, &size| {
            b.iter(|| {
                for note in [48, 52, 55, 59, 60, 64, 67, 71] {
                    poly.handle(SynthMessage::note_on(note, 90));
                }
                render(black_box(&mut poly), size)
            })
        });
    }

    group.finish();
}
