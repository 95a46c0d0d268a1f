#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, param::NoteCtx};

/// Rendering settings shared by every voice of an instrument.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    pub sample_rate: f32,
    /// Samples between control-rate updates.
    pub control_period: usize,
    pub tempo_bpm: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            control_period: 64,
            tempo_bpm: 120.0,
        }
    }
}

impl RenderConfig {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    pub fn with_control_period(mut self, samples: usize) -> Self {
        self.control_period = samples;
        self
    }

    pub fn with_tempo(mut self, bpm: f64) -> Self {
        self.tempo_bpm = bpm;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::RenderConfig("sample rate must be positive"));
        }
        if self.control_period == 0 {
            return Err(ConfigError::RenderConfig("control period must be at least one sample"));
        }
        if !(self.tempo_bpm.is_finite() && self.tempo_bpm > 0.0) {
            return Err(ConfigError::RenderConfig("tempo must be positive"));
        }
        Ok(())
    }

    /// Seconds between control-rate updates.
    pub fn control_interval(&self) -> f64 {
        self.control_period as f64 / self.sample_rate as f64
    }

    /// Note context at this tempo.
    pub fn note(&self, pitch: f64) -> NoteCtx {
        NoteCtx::new(pitch, self.tempo_bpm)
    }
}
