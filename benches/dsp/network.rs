//! Benchmarks for rendering a compiled network voice.

use std::{hint::black_box, sync::Arc};

use criterion::{BenchmarkId, Criterion};
use saavy_params::{
    envelope::{Envelope, Phase},
    network::{EnvelopeTap, MulAdd, Network, NetworkVoice, VarId, Wave, WaveBank},
    RenderConfig,
};

use crate::BLOCK_SIZES;

/// Two-operator FM voice with enveloped depth and loudness.
fn fm_network() -> Network {
    let mut net = Network::new();
    let depth = net.var("depth");
    let amp = net.var("amp");
    let modulator = net.var("mod");
    let carrier = net.var("car");

    let depth_env = Envelope::with_phases([Phase::new(0.5, 2.0), Phase::new(1.0, 0.3)]);
    let amp_env = Envelope::with_phases([Phase::new(0.01, 1.0), Phase::new(1.0, 0.5).decibels()]);

    net.push(EnvelopeTap::new(Arc::new(depth_env), depth))
        .push(EnvelopeTap::new(Arc::new(amp_env), amp))
        .push(Wave::new("sine", modulator).with_ratio(2.0, 1.0))
        .push(Wave::new("sine", carrier).with_phase_mod(modulator, depth))
        .push(MulAdd::new(VarId::ZERO, VarId::LEFT).plus(carrier, amp))
        .push(MulAdd::new(VarId::LEFT, VarId::RIGHT));
    net
}

pub fn bench_network(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/network");
    let compiled = Arc::new(
        fm_network()
            .compile(&WaveBank::with_builtin())
            .expect("valid network"),
    );

    for &size in BLOCK_SIZES {
        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];

        for period in [1usize, 64] {
            let cfg = RenderConfig::default().with_control_period(period);
            let mut voice = NetworkVoice::new(compiled.clone(), &cfg).expect("valid config");
            voice
                .note_on(cfg.note(220.0))
                .expect("no formulas");

            let id = format!("fm_period_{period}");
            group.bench_with_input(BenchmarkId::new(id, size), &size, |b, _| {
                b.iter(|| {
                    voice
                        .render(black_box(&mut left), black_box(&mut right))
                        .expect("no formulas");
                })
            });
        }
    }

    group.finish();
}
