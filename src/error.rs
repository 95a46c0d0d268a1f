//! Error types shared across the crate.
//!
//! Two families exist and they never mix:
//!
//! - [`ConfigError`] is a construction-time defect in the instrument
//!   description. It is returned from builders and compile steps and is
//!   fatal to that call.
//! - [`EvalError`] comes out of a user formula while rendering. It travels
//!   unchanged through `ScalarParameter`, `Envelope` and the network so
//!   the renderer can decide what to do with the voice.

use thiserror::Error;

/// Malformed instrument description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A formula or accent setter was called twice on the same parameter.
    #[error("{what} has already been specified")]
    AlreadySpecified { what: &'static str },

    /// Accent slot outside `0..8`.
    #[error("accent slot {slot} is out of range (0..{max})")]
    AccentSlot { slot: usize, max: usize },

    /// Phase index outside the envelope.
    #[error("phase index {index} is out of range for an envelope with {len} phases")]
    PhaseIndex { index: usize, len: usize },

    /// Sustain/release marker outside `[-1, phase count]`.
    #[error("marker phase {index} is out of range [-1, {len}]")]
    MarkerIndex { index: isize, len: usize },

    /// Only three markers exist.
    #[error("marker slot {slot} is out of range (0..{max})")]
    MarkerSlot { slot: usize, max: usize },

    /// Statements may not overwrite the `zero` and `one` constants.
    #[error("statement {statement} writes the constant variable `{name}`")]
    ConstantWrite { statement: usize, name: &'static str },

    /// A statement refers to a variable handle the table never issued.
    #[error("statement {statement} refers to unknown variable #{var}")]
    UnknownVariable { statement: usize, var: u32 },

    /// Wave statement names a sample that the dictionary does not hold.
    #[error("wave `{0}` is not in the wave dictionary")]
    UnknownWave(String),

    /// Wave statement frequency divisor of zero.
    #[error("statement {statement} divides its frequency by zero")]
    ZeroFrequencyDivisor { statement: usize },

    /// Render configuration out of range.
    #[error("invalid render config: {0}")]
    RenderConfig(&'static str),

    /// The statement list broke an assumption of the rate classifier.
    #[error("rate classifier invariant violated: {0}")]
    Classifier(String),
}

/// Failure reported by a formula while rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("division by zero in formula")]
    DivideByZero,

    #[error("formula argument out of domain: {0}")]
    Domain(&'static str),

    #[error("malformed compiled formula")]
    Malformed,

    #[error("formula error: {0}")]
    Custom(String),
}
