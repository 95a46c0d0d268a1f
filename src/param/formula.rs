//! Boundary to the formula interpreter.
//!
//! User formulas arrive already compiled. This crate never looks inside
//! them: it hands over a fixed set of named arguments and takes back a
//! number or an [`EvalError`]. Anything that implements [`Formula`] can
//! stand in for the interpreter, including plain closures via [`FnFormula`].

use std::{fmt, sync::Arc};

use crate::{
    accent::{AccentVector, ACCENT_SLOTS},
    error::EvalError,
};

/// Named arguments for one formula call.
///
/// Call sites differ in what they expose:
///
/// - scalar parameters: `accent1..8`, `t`, `x`, `bpm`
/// - whole-envelope formulas: the above plus `trackaccent1..8`
/// - envelope phase initialisers: everything except `x`
#[derive(Debug, Clone, Copy)]
pub struct FormulaArgs<'a> {
    pub accents: &'a AccentVector,
    pub track_accents: Option<&'a AccentVector>,
    pub t: f64,
    pub x: Option<f64>,
    pub bpm: f64,
}

impl<'a> FormulaArgs<'a> {
    /// Look an argument up by the name a formula would use.
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "t" => Some(self.t),
            "x" => self.x,
            "bpm" => Some(self.bpm),
            _ => {
                if let Some(n) = name.strip_prefix("trackaccent") {
                    let slot = one_based_slot(n)?;
                    self.track_accents.and_then(|v| v.get(slot))
                } else if let Some(n) = name.strip_prefix("accent") {
                    let slot = one_based_slot(n)?;
                    self.accents.get(slot)
                } else {
                    None
                }
            }
        }
    }
}

fn one_based_slot(digits: &str) -> Option<usize> {
    let n: usize = digits.parse().ok()?;
    (1..=ACCENT_SLOTS).contains(&n).then(|| n - 1)
}

/// A compiled user formula.
pub trait Formula: Send + Sync + fmt::Debug {
    fn evaluate(&self, args: &FormulaArgs<'_>) -> Result<f64, EvalError>;
}

/// Shared handle to a compiled formula.
pub type CompiledFormula = Arc<dyn Formula>;

/// Closure-backed formula.
pub struct FnFormula<F> {
    label: &'static str,
    f: F,
}

impl<F> FnFormula<F>
where
    F: Fn(&FormulaArgs<'_>) -> Result<f64, EvalError> + Send + Sync + 'static,
{
    pub fn new(label: &'static str, f: F) -> Self {
        Self { label, f }
    }

    pub fn shared(label: &'static str, f: F) -> CompiledFormula {
        Arc::new(Self::new(label, f))
    }
}

impl<F> fmt::Debug for FnFormula<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FnFormula").field(&self.label).finish()
    }
}

impl<F> Formula for FnFormula<F>
where
    F: Fn(&FormulaArgs<'_>) -> Result<f64, EvalError> + Send + Sync + 'static,
{
    fn evaluate(&self, args: &FormulaArgs<'_>) -> Result<f64, EvalError> {
        (self.f)(args)
    }
}
