//! Multi-phase envelopes with accents, pitch scaling and formula overrides.

/*
Envelopes
=========

An envelope is a list of phases. Each phase moves the level from wherever
it currently is to a target over a duration. Up to three markers can stop
playback at a phase boundary until the note is released.

Vocabulary
----------

  phase       One leg: duration, target, transition shape, target mode,
              plus accent and pitch modifiers for amplitude and rate.

  boundary    The point between two phases. Boundary `p` is the start of
              phase `p`; boundary `N` (phase count) is the natural end.

  marker      A boundary with a sustain/release kind. See `marker`.

  origin      Optional phase whose start is the note's nominal onset.
              Phases before it are pre-roll (e.g. a scoop into the note).

  shortcut    A constant that replaces the whole envelope.

  formula     A whole-envelope formula that replaces the phase output
              (phases still advance for bookkeeping).


State Machine
-------------

    ┌──────────┐ duration elapsed ┌──────────────┐
    │ phase p  │ ───────────────→ │ boundary p+1 │
    └──────────┘                  └──────────────┘
         ↑                          │         │
         │  not held                │         │ hold marker, not released
         └──────────────────────────┘         ↓
                                        ┌───────────┐  release k
                                        │ sustained │ ─────────→ continue
                                        └───────────┘
    boundary N ──→ finished (hold final level)

Release event k goes to marker k. A skip marker whose boundary has not
been reached yet pulls playback forward to that boundary at release time.


Evaluation Priority
-------------------

    1. constant shortcut   (checked first, nothing else runs)
    2. whole-envelope formula
    3. phases

Phase output is multiplied by the overall scale factor. A whole-envelope
formula receives the factor as `x` and its result is used as is.
*/

/// One leg of the envelope.
pub mod phase;
/// Sustain/release markers.
pub mod marker;
/// Transition curves and pitch scaling laws.
pub mod shape;
/// Per-voice runtime state and evaluation.
pub mod state;

pub use marker::{Marker, MarkerKind, MARKER_COUNT};
pub use phase::{Phase, PhaseValue, TargetMode, TransitionShape};
pub use state::{EnvelopeStage, EnvelopeState};

use std::sync::atomic::{AtomicU8, Ordering};

use crate::{
    error::{ConfigError, EvalError},
    param::{formula::CompiledFormula, NoteCtx},
};

const FORMULA_UNKNOWN: u8 = 0;
const FORMULA_ABSENT: u8 = 1;
const FORMULA_PRESENT: u8 = 2;

#[derive(Debug)]
pub struct Envelope {
    phases: Vec<Phase>,
    markers: [Marker; MARKER_COUNT],
    origin: Option<usize>,
    global_rate_rolloff: f64,
    global_rate_norm: f64,
    scale: f64,
    formula: Option<CompiledFormula>,
    constant: Option<f64>,
    // Lazily computed "contains any formula". Written with a relaxed store;
    // concurrent first readers all compute the same value.
    formula_cache: AtomicU8,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Envelope {
    fn clone(&self) -> Self {
        Self {
            phases: self.phases.clone(),
            markers: self.markers,
            origin: self.origin,
            global_rate_rolloff: self.global_rate_rolloff,
            global_rate_norm: self.global_rate_norm,
            scale: self.scale,
            formula: self.formula.clone(),
            constant: self.constant,
            formula_cache: AtomicU8::new(self.formula_cache.load(Ordering::Relaxed)),
        }
    }
}

impl Envelope {
    pub fn new() -> Self {
        Self {
            phases: Vec::new(),
            markers: [Marker::UNUSED; MARKER_COUNT],
            origin: None,
            global_rate_rolloff: 0.0,
            global_rate_norm: 0.0,
            scale: 1.0,
            formula: None,
            constant: None,
            formula_cache: AtomicU8::new(FORMULA_UNKNOWN),
        }
    }

    /// Envelope that always evaluates to `value`.
    pub fn constant(value: f64) -> Self {
        let mut env = Self::new();
        env.constant = Some(value);
        env
    }

    pub fn with_phases(phases: impl IntoIterator<Item = Phase>) -> Self {
        let mut env = Self::new();
        env.phases.extend(phases);
        env
    }

    // ---------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------

    pub fn push_phase(&mut self, phase: Phase) {
        self.phases.push(phase);
        self.invalidate_formula_cache();
    }

    /// Insert before `index` (`index == len` appends).
    ///
    /// Markers and the origin keep their numeric indices.
    pub fn insert_phase(&mut self, index: usize, phase: Phase) -> Result<(), ConfigError> {
        if index > self.phases.len() {
            return Err(ConfigError::PhaseIndex {
                index,
                len: self.phases.len(),
            });
        }
        self.phases.insert(index, phase);
        self.invalidate_formula_cache();
        Ok(())
    }

    pub fn phase_mut(&mut self, index: usize) -> Result<&mut Phase, ConfigError> {
        let len = self.phases.len();
        self.invalidate_formula_cache();
        self.phases
            .get_mut(index)
            .ok_or(ConfigError::PhaseIndex { index, len })
    }

    /// Place marker `slot` (0..3) at boundary `phase`, or -1 to disable it.
    pub fn set_marker(
        &mut self,
        slot: usize,
        phase: isize,
        kind: MarkerKind,
    ) -> Result<(), ConfigError> {
        if slot >= MARKER_COUNT {
            return Err(ConfigError::MarkerSlot {
                slot,
                max: MARKER_COUNT,
            });
        }
        let len = self.phases.len();
        if phase < -1 || phase > len as isize {
            return Err(ConfigError::MarkerIndex { index: phase, len });
        }
        self.markers[slot] = Marker { phase, kind };
        Ok(())
    }

    pub fn set_origin(&mut self, origin: Option<usize>) -> Result<(), ConfigError> {
        if let Some(index) = origin {
            if index >= self.phases.len() {
                return Err(ConfigError::PhaseIndex {
                    index,
                    len: self.phases.len(),
                });
            }
        }
        self.origin = origin;
        Ok(())
    }

    pub fn set_global_rate_rolloff(&mut self, rolloff: f64, norm_freq: f64) {
        self.global_rate_rolloff = rolloff;
        self.global_rate_norm = norm_freq;
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    pub fn set_formula(&mut self, formula: CompiledFormula) -> Result<(), ConfigError> {
        if self.formula.is_some() {
            return Err(ConfigError::AlreadySpecified {
                what: "envelope formula",
            });
        }
        self.formula = Some(formula);
        self.invalidate_formula_cache();
        Ok(())
    }

    pub fn set_constant(&mut self, value: Option<f64>) {
        self.constant = value;
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    pub fn markers(&self) -> &[Marker; MARKER_COUNT] {
        &self.markers
    }

    pub fn origin(&self) -> Option<usize> {
        self.origin
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn constant_value(&self) -> Option<f64> {
        self.constant
    }

    pub fn formula(&self) -> Option<&CompiledFormula> {
        self.formula.as_ref()
    }

    /// True if any phase or the envelope itself carries a formula.
    ///
    /// Computed on first call and cached.
    pub fn contains_formula(&self) -> bool {
        match self.formula_cache.load(Ordering::Relaxed) {
            FORMULA_PRESENT => true,
            FORMULA_ABSENT => false,
            _ => {
                let present =
                    self.formula.is_some() || self.phases.iter().any(Phase::has_formula);
                let value = if present {
                    FORMULA_PRESENT
                } else {
                    FORMULA_ABSENT
                };
                self.formula_cache.store(value, Ordering::Relaxed);
                present
            }
        }
    }

    /// Seconds from note start to the start of the origin phase.
    pub fn time_to_origin(&self, ctx: &NoteCtx) -> Result<f64, EvalError> {
        let Some(origin) = self.origin else {
            return Ok(0.0);
        };
        let mut total = 0.0;
        for phase in &self.phases[..origin] {
            total += self.phase_duration(phase, ctx, total)?;
        }
        Ok(total)
    }

    fn invalidate_formula_cache(&mut self) {
        *self.formula_cache.get_mut() = FORMULA_UNKNOWN;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::formula::FnFormula;

    fn two_phase() -> Envelope {
        Envelope::with_phases([Phase::new(0.1, 1.0), Phase::new(0.5, 0.2)])
    }

    #[test]
    fn marker_bounds() {
        let mut env = two_phase();
        assert!(env.set_marker(0, -1, MarkerKind::SUSTAIN_SKIP).is_ok());
        assert!(env.set_marker(0, 0, MarkerKind::SUSTAIN_SKIP).is_ok());
        assert!(env.set_marker(1, 2, MarkerKind::RELEASE_SKIP).is_ok());
        assert_eq!(
            env.set_marker(0, 3, MarkerKind::SUSTAIN_SKIP),
            Err(ConfigError::MarkerIndex { index: 3, len: 2 })
        );
        assert_eq!(
            env.set_marker(0, -2, MarkerKind::SUSTAIN_SKIP),
            Err(ConfigError::MarkerIndex { index: -2, len: 2 })
        );
        assert!(matches!(
            env.set_marker(3, 0, MarkerKind::SUSTAIN_SKIP),
            Err(ConfigError::MarkerSlot { .. })
        ));
    }

    #[test]
    fn disabled_marker_is_unused() {
        let mut env = two_phase();
        env.set_marker(2, -1, MarkerKind::SUSTAIN_NO_SKIP).unwrap();
        assert!(!env.markers()[2].is_used());
    }

    #[test]
    fn insert_keeps_marker_indices() {
        let mut env = two_phase();
        env.set_marker(0, 1, MarkerKind::SUSTAIN_NO_SKIP).unwrap();
        env.insert_phase(0, Phase::new(0.05, 0.0)).unwrap();

        assert_eq!(env.phase_count(), 3);
        assert_eq!(env.markers()[0].phase, 1);
        // Index 1 is now the old attack phase.
        assert_eq!(env.phases()[1].target().base(), 1.0);
    }

    #[test]
    fn insert_rejects_out_of_range() {
        let mut env = two_phase();
        assert!(env.insert_phase(2, Phase::new(0.1, 0.0)).is_ok());
        assert!(matches!(
            env.insert_phase(9, Phase::new(0.1, 0.0)),
            Err(ConfigError::PhaseIndex { index: 9, len: 3 })
        ));
    }

    #[test]
    fn contains_formula_is_cached_and_invalidated() {
        let mut env = two_phase();
        assert!(!env.contains_formula());
        assert!(!env.contains_formula());

        env.push_phase(
            Phase::new(0.1, 0.0)
                .with_target_formula(FnFormula::shared("zero", |_| Ok(0.0)))
                .unwrap(),
        );
        assert!(env.contains_formula());

        let cloned = env.clone();
        assert!(cloned.contains_formula());
    }

    #[test]
    fn contains_formula_race_is_benign() {
        let env = std::sync::Arc::new(two_phase());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let env = env.clone();
                std::thread::spawn(move || env.contains_formula())
            })
            .collect();
        for h in handles {
            assert!(!h.join().unwrap());
        }
    }

    #[test]
    fn origin_offset_sums_preceding_phases() {
        let mut env = Envelope::with_phases([
            Phase::new(0.02, 0.5),
            Phase::new(0.03, 1.0),
            Phase::new(1.0, 0.0),
        ]);
        env.set_origin(Some(2)).unwrap();
        let ctx = NoteCtx::new(440.0, 120.0);
        let offset = env.time_to_origin(&ctx).unwrap();
        assert!((offset - 0.05).abs() < 1e-12);
        assert!(env.set_origin(Some(3)).is_err());
    }

    #[test]
    fn envelope_formula_is_specify_once() {
        let mut env = two_phase();
        env.set_formula(FnFormula::shared("a", |_| Ok(1.0))).unwrap();
        assert!(env.set_formula(FnFormula::shared("b", |_| Ok(2.0))).is_err());
    }
}
