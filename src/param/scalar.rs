use crate::{
    accent::AccentVector,
    error::{ConfigError, EvalError},
    param::{
        formula::{CompiledFormula, FormulaArgs},
        NoteCtx,
    },
};

/*
Scalar Parameters
=================

Every knob on an effect or oscillator that may respond to dynamics is a
scalar parameter: a base value, an accent modifier vector and, optionally,
a user formula.

Evaluation Order
----------------

The order is fixed. Formulas see the accumulated value as `x` and may be
written against it, so swapping steps changes the sound.

    1. value  = base
    2. value += runtime_accents · stored_accents
    3. value  = formula(x = value, accent1..8, t, bpm)     (if attached)

Example: base = 2, accent contribution = 3, formula = x * 2
    step 1:  2
    step 2:  2 + 3 = 5
    step 3:  5 * 2 = 10

Specify Once
------------

The formula and the accent vector are each attached at most once while the
instrument is being built. A second attempt is a description error, not an
override.
*/

#[derive(Debug, Clone, Default)]
pub struct ScalarParameter {
    base: f64,
    accent: AccentVector,
    accent_specified: bool,
    formula: Option<CompiledFormula>,
}

impl ScalarParameter {
    pub fn new(base: f64) -> Self {
        Self {
            base,
            ..Default::default()
        }
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn set_base(&mut self, base: f64) {
        self.base = base;
    }

    pub fn accent(&self) -> &AccentVector {
        &self.accent
    }

    pub fn formula(&self) -> Option<&CompiledFormula> {
        self.formula.as_ref()
    }

    pub fn has_formula(&self) -> bool {
        self.formula.is_some()
    }

    pub fn set_accent(&mut self, accent: AccentVector) -> Result<(), ConfigError> {
        if self.accent_specified {
            return Err(ConfigError::AlreadySpecified {
                what: "parameter accent",
            });
        }
        self.accent = accent;
        self.accent_specified = true;
        Ok(())
    }

    pub fn set_formula(&mut self, formula: CompiledFormula) -> Result<(), ConfigError> {
        if self.formula.is_some() {
            return Err(ConfigError::AlreadySpecified {
                what: "parameter formula",
            });
        }
        self.formula = Some(formula);
        Ok(())
    }

    pub fn with_accent(mut self, accent: AccentVector) -> Result<Self, ConfigError> {
        self.set_accent(accent)?;
        Ok(self)
    }

    pub fn with_formula(mut self, formula: CompiledFormula) -> Result<Self, ConfigError> {
        self.set_formula(formula)?;
        Ok(self)
    }

    /// Evaluate against the note's runtime accents.
    pub fn evaluate(
        &self,
        runtime_accents: &AccentVector,
        time: f64,
        tempo: f64,
    ) -> Result<f64, EvalError> {
        let mut value = self.base;
        value += runtime_accents.dot(&self.accent);

        if let Some(formula) = &self.formula {
            let args = FormulaArgs {
                accents: runtime_accents,
                track_accents: None,
                t: time,
                x: Some(value),
                bpm: tempo,
            };
            value = formula.evaluate(&args)?;
        }

        Ok(value)
    }

    pub fn evaluate_ctx(&self, ctx: &NoteCtx) -> Result<f64, EvalError> {
        self.evaluate(&ctx.accents, ctx.time, ctx.tempo)
    }
}

impl From<f64> for ScalarParameter {
    fn from(base: f64) -> Self {
        Self::new(base)
    }
}
