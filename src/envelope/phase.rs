//! One leg of an envelope: where it goes, how long it takes, how it bends.

use crate::{
    accent::AccentVector,
    error::{ConfigError, EvalError},
    param::formula::{CompiledFormula, FormulaArgs},
};

/// How the level moves from start to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransitionShape {
    /// Straight line in amplitude.
    #[default]
    LinearAmplitude,
    /// Straight line in decibels (exponential in amplitude).
    LinearDecibels,
}

/// How the phase target is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetMode {
    /// Target is the level itself.
    #[default]
    Absolute,
    /// Target multiplies the level the phase started from.
    RelativeScale,
}

/// A constant, optionally replaced by a formula at phase entry.
#[derive(Debug, Clone, Default)]
pub struct PhaseValue {
    base: f64,
    formula: Option<CompiledFormula>,
}

impl PhaseValue {
    pub fn new(base: f64) -> Self {
        Self {
            base,
            formula: None,
        }
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn has_formula(&self) -> bool {
        self.formula.is_some()
    }

    fn set_formula(&mut self, formula: CompiledFormula, what: &'static str) -> Result<(), ConfigError> {
        if self.formula.is_some() {
            return Err(ConfigError::AlreadySpecified { what });
        }
        self.formula = Some(formula);
        Ok(())
    }

    /// Formula result if one is attached, else the constant.
    pub fn resolve(&self, args: &FormulaArgs<'_>) -> Result<f64, EvalError> {
        match &self.formula {
            Some(f) => f.evaluate(args),
            None => Ok(self.base),
        }
    }
}

/// Envelope phase (segment).
#[derive(Debug, Clone)]
pub struct Phase {
    pub(crate) duration: PhaseValue,
    pub(crate) target: PhaseValue,
    pub shape: TransitionShape,
    pub mode: TargetMode,
    pub amp_accent: AccentVector,
    pub amp_freq_rolloff: f64,
    pub amp_freq_norm: f64,
    pub rate_accent: AccentVector,
    pub rate_freq_rolloff: f64,
    pub rate_freq_norm: f64,
}

impl Phase {
    /// Linear-amplitude phase reaching `target` after `duration` seconds.
    pub fn new(duration: f64, target: f64) -> Self {
        Self {
            duration: PhaseValue::new(duration),
            target: PhaseValue::new(target),
            shape: TransitionShape::LinearAmplitude,
            mode: TargetMode::Absolute,
            amp_accent: AccentVector::ZERO,
            amp_freq_rolloff: 0.0,
            amp_freq_norm: 0.0,
            rate_accent: AccentVector::ZERO,
            rate_freq_rolloff: 0.0,
            rate_freq_norm: 0.0,
        }
    }

    pub fn decibels(mut self) -> Self {
        self.shape = TransitionShape::LinearDecibels;
        self
    }

    pub fn relative(mut self) -> Self {
        self.mode = TargetMode::RelativeScale;
        self
    }

    pub fn with_amp_accent(mut self, accent: AccentVector) -> Self {
        self.amp_accent = accent;
        self
    }

    pub fn with_rate_accent(mut self, accent: AccentVector) -> Self {
        self.rate_accent = accent;
        self
    }

    pub fn with_amp_rolloff(mut self, rolloff: f64, norm_freq: f64) -> Self {
        self.amp_freq_rolloff = rolloff;
        self.amp_freq_norm = norm_freq;
        self
    }

    pub fn with_rate_rolloff(mut self, rolloff: f64, norm_freq: f64) -> Self {
        self.rate_freq_rolloff = rolloff;
        self.rate_freq_norm = norm_freq;
        self
    }

    /// Replace the constant duration with a formula (once).
    pub fn with_duration_formula(mut self, formula: CompiledFormula) -> Result<Self, ConfigError> {
        self.duration.set_formula(formula, "phase duration formula")?;
        Ok(self)
    }

    /// Replace the constant target with a formula (once).
    pub fn with_target_formula(mut self, formula: CompiledFormula) -> Result<Self, ConfigError> {
        self.target.set_formula(formula, "phase target formula")?;
        Ok(self)
    }

    pub fn duration(&self) -> &PhaseValue {
        &self.duration
    }

    pub fn target(&self) -> &PhaseValue {
        &self.target
    }

    pub fn has_formula(&self) -> bool {
        self.duration.has_formula() || self.target.has_formula()
    }
}
