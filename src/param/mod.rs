//! Parameter evaluation: formulas and accent-modified scalars.

/// Formula interpreter boundary and argument sets.
pub mod formula;
/// Base value + accent + optional formula.
pub mod scalar;

pub use formula::{CompiledFormula, FnFormula, Formula, FormulaArgs};
pub use scalar::ScalarParameter;

use crate::accent::AccentVector;

/// Per-note inputs shared by every evaluation entry point.
///
/// - accents: the note's runtime accent vector
/// - track_accents: accents inherited from the track the note plays on
/// - time: seconds since the note started
/// - tempo: beats per minute
/// - pitch: note frequency in Hz
#[derive(Debug, Clone, Copy)]
pub struct NoteCtx {
    pub accents: AccentVector,
    pub track_accents: AccentVector,
    pub time: f64,
    pub tempo: f64,
    pub pitch: f64,
}

impl NoteCtx {
    pub fn new(pitch: f64, tempo: f64) -> Self {
        Self {
            accents: AccentVector::ZERO,
            track_accents: AccentVector::ZERO,
            time: 0.0,
            tempo,
            pitch,
        }
    }

    pub fn with_accents(mut self, accents: AccentVector) -> Self {
        self.accents = accents;
        self
    }

    pub fn with_track_accents(mut self, track_accents: AccentVector) -> Self {
        self.track_accents = track_accents;
        self
    }

    pub fn at(mut self, time: f64) -> Self {
        self.time = time;
        self
    }
}
