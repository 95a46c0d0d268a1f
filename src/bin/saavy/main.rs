//! saavy - plays an accented note through a two-phase decibel envelope
//!
//! Run with: cargo run

mod app;

use std::{sync::Arc, time::Duration};

use app::Saavy;
use saavy_params::{
    envelope::{MarkerKind, TransitionShape},
    network::{EnvelopeTap, MulAdd, Network, VarId, Wave, WaveBank},
    patch::{EnvelopeDescriptor, MarkerDescriptor, PhaseDescriptor},
    AccentVector, RenderConfig,
};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    // Attack to 1 (plus accent), decay to 0.2, hold until release
    let mut attack = PhaseDescriptor::new(0.01, 1.0);
    attack.shape = TransitionShape::LinearDecibels;
    attack.amp_accent[0] = 1.0;
    let mut decay = PhaseDescriptor::new(1.0, 0.2);
    decay.shape = TransitionShape::LinearDecibels;
    let mut release = PhaseDescriptor::new(0.5, 0.0);
    release.shape = TransitionShape::LinearDecibels;

    let loudness = EnvelopeDescriptor {
        phases: vec![attack, decay, release],
        markers: vec![MarkerDescriptor {
            slot: 0,
            phase: 2,
            kind: MarkerKind::SUSTAIN_NO_SKIP,
        }],
        scale: 0.2,
        ..EnvelopeDescriptor::default()
    }
    .build()?;

    let mut net = Network::new();
    let amp = net.var("amp");
    let osc = net.var("osc");
    net.push(EnvelopeTap::new(Arc::new(loudness), amp))
        .push(Wave::new("triangle", osc))
        .push(MulAdd::new(VarId::ZERO, VarId::LEFT).plus(osc, amp))
        .push(MulAdd::new(VarId::ZERO, VarId::RIGHT).plus(osc, amp));
    let compiled = net.compile(&WaveBank::with_builtin())?;

    let accents = AccentVector::ZERO.with(0, 0.5)?;
    let note = RenderConfig::default().note(220.0).with_accents(accents);

    Saavy::new(compiled, note)
        .hold(Duration::from_millis(1500))
        .tail(Duration::from_millis(800))
        .run()
}
