//! Benchmarks for per-sample envelope evaluation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_params::{
    envelope::{Envelope, MarkerKind, Phase},
    NoteCtx,
};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f64 = 48_000.0;

fn adsr() -> Envelope {
    let mut env = Envelope::with_phases([
        Phase::new(0.1, 1.0),
        Phase::new(0.1, 0.7).decibels(),
        Phase::new(0.3, 0.0).decibels(),
    ]);
    env.set_marker(0, 2, MarkerKind::SUSTAIN_NO_SKIP)
        .expect("marker in range");
    env
}

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");
    let env = adsr();
    let constant = Envelope::constant(0.5);
    let note = NoteCtx::new(440.0, 120.0);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack phase (linear amplitude)
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| {
                let mut state = env.start(&note).expect("no formulas");
                for (i, out) in buffer.iter_mut().enumerate() {
                    let ctx = note.at(i as f64 / SAMPLE_RATE);
                    *out = env.evaluate(&mut state, black_box(&ctx)).expect("no formulas") as f32;
                }
            })
        });

        // Decay phase (decibel interpolation)
        group.bench_with_input(BenchmarkId::new("decay_db", size), &size, |b, _| {
            b.iter(|| {
                let mut state = env.start(&note).expect("no formulas");
                for (i, out) in buffer.iter_mut().enumerate() {
                    let ctx = note.at(0.15 + i as f64 / SAMPLE_RATE);
                    *out = env.evaluate(&mut state, black_box(&ctx)).expect("no formulas") as f32;
                }
            })
        });

        // Constant shortcut
        group.bench_with_input(BenchmarkId::new("constant", size), &size, |b, _| {
            b.iter(|| {
                let mut state = constant.start(&note).expect("no formulas");
                for (i, out) in buffer.iter_mut().enumerate() {
                    let ctx = note.at(i as f64 / SAMPLE_RATE);
                    *out = constant.evaluate(&mut state, black_box(&ctx)).expect("no formulas") as f32;
                }
            })
        });
    }

    group.finish();
}
