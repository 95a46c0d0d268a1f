//! Accent vectors: eight strike-dynamics channels per note.

/*
Accents
=======

An accent is "how hard was this note played", generalised to eight
independent channels. The performer (or sequencer) hands every note a
runtime accent vector; every parameter that cares about dynamics stores a
modifier vector of its own. The parameter's contribution is the dot product
of the two.

Vocabulary
----------

  slot          One of the eight channels, `a0..a7`. Formulas see them as
                `accent1..accent8` (one-based names).

  modifier      The vector stored on a parameter. Slot N says how much one
                unit of runtime accent N moves this parameter.

  runtime       The vector that arrives with a note. Usually only one or
                two slots are nonzero, often none at all.

  nonzero flag  A cached "some slot is nonzero" bit. Most modifier vectors
                are all zeros, so `dot` can skip the eight multiplies.


The Math
--------

    contribution = runtime · modifier
                 = r0*m0 + r1*m1 + ... + r7*m7

Example: modifier = [1, 0, 0, 0, 0, 0, 0, 0], runtime = [0.5, ...]
    contribution = 0.5

The flag is the whole trick. If neither side has it set the answer is 0 and
no slot is touched. The flag must therefore never claim "all zero" while a
slot holds a value; `set` only ever raises it, and the check inside `dot`
catches a corrupted vector when contract checks are compiled in.
*/

use crate::{checked, error::ConfigError};

/// Number of accent channels.
pub const ACCENT_SLOTS: usize = 8;

/// Fixed-size accent modifier vector with a cached nonzero flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccentVector {
    slots: [f64; ACCENT_SLOTS],
    nonzero: bool,
}

impl Default for AccentVector {
    fn default() -> Self {
        Self::ZERO
    }
}

impl AccentVector {
    pub const ZERO: AccentVector = AccentVector {
        slots: [0.0; ACCENT_SLOTS],
        nonzero: false,
    };

    pub const fn zero() -> Self {
        Self::ZERO
    }

    /// Build from explicit slot values. The flag is computed exactly.
    pub fn from_slots(slots: [f64; ACCENT_SLOTS]) -> Self {
        let nonzero = slots.iter().any(|&s| s != 0.0);
        Self { slots, nonzero }
    }

    /// Set slot `slot` (zero-based) to `value`.
    ///
    /// A nonzero value raises the flag. Writing zero never lowers it, so a
    /// vector can be conservatively flagged; use [`recompute_flag`] after a
    /// batch of edits if the exact value matters.
    ///
    /// [`recompute_flag`]: AccentVector::recompute_flag
    pub fn set(&mut self, slot: usize, value: f64) -> Result<(), ConfigError> {
        let cell = self.slots.get_mut(slot).ok_or(ConfigError::AccentSlot {
            slot,
            max: ACCENT_SLOTS,
        })?;
        *cell = value;
        if value != 0.0 {
            self.nonzero = true;
        }
        Ok(())
    }

    /// Builder form of [`set`](AccentVector::set).
    pub fn with(mut self, slot: usize, value: f64) -> Result<Self, ConfigError> {
        self.set(slot, value)?;
        Ok(self)
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<f64> {
        self.slots.get(slot).copied()
    }

    #[inline]
    pub fn slots(&self) -> &[f64; ACCENT_SLOTS] {
        &self.slots
    }

    #[inline]
    pub fn is_nonzero(&self) -> bool {
        self.nonzero
    }

    /// Make the flag exact again.
    pub fn recompute_flag(&mut self) {
        self.nonzero = self.slots.iter().any(|&s| s != 0.0);
    }

    /// Dot product with the zero fast path.
    #[inline]
    pub fn dot(&self, other: &AccentVector) -> f64 {
        if checked::enabled() {
            self.check_flag();
            other.check_flag();
        }

        if !self.nonzero && !other.nonzero {
            return 0.0;
        }

        self.slots
            .iter()
            .zip(other.slots.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// `target[i] = scale * a[i] + b[i]`.
    ///
    /// `target` may be the same vector as `a` or `b`; both operands are
    /// copied before anything is written.
    #[inline]
    pub fn axpy_into(target: &mut AccentVector, scale: f64, a: &AccentVector, b: &AccentVector) {
        let (a, b) = (*a, *b);
        for i in 0..ACCENT_SLOTS {
            target.slots[i] = scale * a.slots[i] + b.slots[i];
        }
        target.recompute_flag();
    }

    /// Value form of [`axpy_into`](AccentVector::axpy_into).
    #[inline]
    pub fn axpy(scale: f64, a: &AccentVector, b: &AccentVector) -> AccentVector {
        let mut out = AccentVector::ZERO;
        Self::axpy_into(&mut out, scale, a, b);
        out
    }

    /// In-place `self = scale * self + other`.
    pub fn scale_add(&mut self, scale: f64, other: &AccentVector) {
        let a = *self;
        Self::axpy_into(self, scale, &a, other);
    }

    pub fn scaled(&self, scale: f64) -> AccentVector {
        Self::axpy(scale, self, &AccentVector::ZERO)
    }

    fn check_flag(&self) {
        checked::ensure(
            self.nonzero || self.slots.iter().all(|&s| s == 0.0),
            "accent vector flag is clear but a slot is nonzero",
        );
    }
}

impl From<[f64; ACCENT_SLOTS]> for AccentVector {
    fn from(slots: [f64; ACCENT_SLOTS]) -> Self {
        Self::from_slots(slots)
    }
}
