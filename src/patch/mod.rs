//! Plain-data envelope descriptions.
//!
//! Descriptors hold only numbers, so they can be written by hand, stored
//! or (with the `serde` feature) loaded from a file. `build` turns them
//! into an [`Envelope`], running the same checks as the builder API.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    accent::{AccentVector, ACCENT_SLOTS},
    envelope::{Envelope, MarkerKind, Phase, TargetMode, TransitionShape},
    error::ConfigError,
};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeDescriptor {
    pub phases: Vec<PhaseDescriptor>,
    pub markers: Vec<MarkerDescriptor>,
    pub origin: Option<usize>,
    pub scale: f64,
    pub global_rate_rolloff: f64,
    pub global_rate_norm: f64,
    /// Replaces the phases entirely when set.
    pub constant: Option<f64>,
}

impl Default for EnvelopeDescriptor {
    fn default() -> Self {
        Self {
            phases: Vec::new(),
            markers: Vec::new(),
            origin: None,
            scale: 1.0,
            global_rate_rolloff: 0.0,
            global_rate_norm: 0.0,
            constant: None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PhaseDescriptor {
    pub duration: f64,
    pub target: f64,
    pub shape: TransitionShape,
    pub mode: TargetMode,
    pub amp_accent: [f64; ACCENT_SLOTS],
    pub amp_freq_rolloff: f64,
    pub amp_freq_norm: f64,
    pub rate_accent: [f64; ACCENT_SLOTS],
    pub rate_freq_rolloff: f64,
    pub rate_freq_norm: f64,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerDescriptor {
    /// Marker slot, 0..3.
    pub slot: usize,
    /// Boundary index, -1 to disable.
    pub phase: isize,
    pub kind: MarkerKind,
}

impl PhaseDescriptor {
    pub fn new(duration: f64, target: f64) -> Self {
        Self {
            duration,
            target,
            ..Self::default()
        }
    }

    pub fn build(&self) -> Phase {
        let mut phase = Phase::new(self.duration, self.target)
            .with_amp_accent(AccentVector::from_slots(self.amp_accent))
            .with_rate_accent(AccentVector::from_slots(self.rate_accent))
            .with_amp_rolloff(self.amp_freq_rolloff, self.amp_freq_norm)
            .with_rate_rolloff(self.rate_freq_rolloff, self.rate_freq_norm);
        phase.shape = self.shape;
        phase.mode = self.mode;
        phase
    }
}

impl EnvelopeDescriptor {
    /// Attack to 1, decay to `sustain`, hold until release, release to 0.
    /// Times in seconds.
    pub fn adsr(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            phases: vec![
                PhaseDescriptor::new(attack, 1.0),
                PhaseDescriptor::new(decay, sustain),
                PhaseDescriptor::new(release, 0.0),
            ],
            markers: vec![MarkerDescriptor {
                slot: 0,
                phase: 2,
                kind: MarkerKind::SUSTAIN_NO_SKIP,
            }],
            ..Self::default()
        }
    }

    pub fn constant(value: f64) -> Self {
        Self {
            constant: Some(value),
            ..Self::default()
        }
    }

    pub fn build(&self) -> Result<Envelope, ConfigError> {
        let mut env = Envelope::with_phases(self.phases.iter().map(PhaseDescriptor::build));
        for m in &self.markers {
            env.set_marker(m.slot, m.phase, m.kind)?;
        }
        env.set_origin(self.origin)?;
        env.set_scale(self.scale);
        env.set_global_rate_rolloff(self.global_rate_rolloff, self.global_rate_norm);
        env.set_constant(self.constant);
        Ok(env)
    }
}
