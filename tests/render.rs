//! Rendered pitch and control-rate behaviour of network voices.

use std::sync::Arc;

use rustfft::{num_complex::Complex, FftPlanner};
use saavy_params::{
    envelope::{Envelope, Phase},
    network::{CompiledNetwork, EnvelopeTap, MulAdd, Network, NetworkVoice, VarId, Wave, WaveBank},
    NoteCtx, RenderConfig,
};

const SAMPLE_RATE: f32 = 48_000.0;
const FFT_LEN: usize = 8192;

fn render(network: CompiledNetwork, pitch: f64, len: usize) -> (Vec<f32>, Vec<f32>) {
    let cfg = RenderConfig::new(SAMPLE_RATE);
    let mut voice = NetworkVoice::new(Arc::new(network), &cfg).unwrap();
    voice.note_on(cfg.note(pitch)).unwrap();

    let mut left = vec![0.0f32; len];
    let mut right = vec![0.0f32; len];
    for (l, r) in left.chunks_mut(512).zip(right.chunks_mut(512)) {
        voice.render(l, r).unwrap();
    }
    (left, right)
}

fn peak_hz(samples: &[f32]) -> f64 {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(samples.len());
    let mut buf: Vec<Complex<f32>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    fft.process(&mut buf);

    let (bin, _) = buf[1..samples.len() / 2]
        .iter()
        .enumerate()
        .map(|(i, c)| (i + 1, c.norm()))
        .fold((0, 0.0f32), |best, cur| if cur.1 > best.1 { cur } else { best });
    bin as f64 * SAMPLE_RATE as f64 / samples.len() as f64
}

fn bin_width() -> f64 {
    SAMPLE_RATE as f64 / FFT_LEN as f64
}

#[test]
fn wave_follows_note_pitch() {
    let mut net = Network::new();
    net.push(Wave::new("sine", VarId::LEFT));
    let (left, _) = render(net.compile(&WaveBank::with_builtin()).unwrap(), 1_000.0, FFT_LEN);
    assert!((peak_hz(&left) - 1_000.0).abs() <= bin_width());
}

#[test]
fn frequency_ratio_and_offset() {
    // 440 * 3 / 2 + 50 = 710 Hz
    let mut net = Network::new();
    net.push(
        Wave::new("sine", VarId::RIGHT)
            .with_ratio(3.0, 2.0)
            .with_offset(50.0),
    );
    let (_, right) = render(net.compile(&WaveBank::with_builtin()).unwrap(), 440.0, FFT_LEN);
    assert!((peak_hz(&right) - 710.0).abs() <= bin_width());
}

#[test]
fn enveloped_output_stays_in_range() {
    let mut net = Network::new();
    let amp = net.var("amp");
    let osc = net.var("osc");
    let env = Envelope::with_phases([Phase::new(0.01, 1.0), Phase::new(0.1, 0.25).decibels()]);
    net.push(EnvelopeTap::new(Arc::new(env), amp))
        .push(Wave::new("sine", osc))
        .push(MulAdd::new(VarId::ZERO, VarId::LEFT).plus(osc, amp));
    let (left, right) = render(net.compile(&WaveBank::with_builtin()).unwrap(), 220.0, 9_600);

    assert!(left.iter().all(|s| s.abs() <= 1.0 + 1e-6));
    assert!(left.iter().any(|s| s.abs() > 0.5));
    assert!(right.iter().all(|&s| s == 0.0));
    // Past the decay the oscillator swings at the final level.
    let tail_peak = left[9_000..].iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!((tail_peak - 0.25).abs() < 1e-3, "tail peak {tail_peak}");
}

#[test]
fn control_rate_chain_is_stepped() {
    // `level` is never read by a data-rate statement, so it stays control rate
    // and only changes every control period.
    let mut net = Network::new();
    let level = net.var("level");
    let ramp = Envelope::with_phases([Phase::new(1.0, 1.0)]);
    net.push(EnvelopeTap::new(Arc::new(ramp), level));
    let compiled = Arc::new(net.compile(&WaveBank::with_builtin()).unwrap());
    assert!(compiled.is_optimizable(0));

    let cfg = RenderConfig::new(SAMPLE_RATE).with_control_period(64);
    let mut voice = NetworkVoice::new(compiled, &cfg).unwrap();
    voice.note_on(NoteCtx::new(440.0, 120.0)).unwrap();

    let mut l = vec![0.0f32; 100];
    let mut r = vec![0.0f32; 100];
    voice.render(&mut l, &mut r).unwrap();
    // Last update ran at sample 64.
    let expected = 64.0 / SAMPLE_RATE as f64;
    assert!((voice.value(level).unwrap() - expected).abs() < 1e-12);
}
