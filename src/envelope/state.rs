use crate::{
    error::EvalError,
    param::{formula::FormulaArgs, NoteCtx},
};

use super::{
    marker::MARKER_COUNT,
    phase::{Phase, TargetMode, TransitionShape},
    shape::{interpolate, pitch_scale, rate_accent_scale},
    Envelope,
};

/// Where playback is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    /// Moving through phase `phase`.
    Running,
    /// Held at boundary `phase` by a sustain marker.
    Sustained,
    /// Past the last phase, holding the final level.
    Finished,
}

/// Per-voice envelope playback state.
///
/// Created by [`Envelope::start`]; only the envelope that created it
/// should drive it.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeState {
    stage: EnvelopeStage,
    phase: usize,
    start_level: f64,
    target_level: f64,
    phase_start: f64,
    phase_duration: f64,
    shape: TransitionShape,
    level: f64,
    released: [bool; MARKER_COUNT],
}

impl EnvelopeState {
    fn idle(at: f64) -> Self {
        Self {
            stage: EnvelopeStage::Running,
            phase: 0,
            start_level: 0.0,
            target_level: 0.0,
            phase_start: at,
            phase_duration: 0.0,
            shape: TransitionShape::LinearAmplitude,
            level: 0.0,
            released: [false; MARKER_COUNT],
        }
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Current phase (running) or boundary (sustained/finished).
    pub fn phase_index(&self) -> usize {
        self.phase
    }

    /// Unscaled level as of the last evaluation.
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn is_sustained(&self) -> bool {
        self.stage == EnvelopeStage::Sustained
    }

    pub fn is_finished(&self) -> bool {
        self.stage == EnvelopeStage::Finished
    }

    /// True once any release event has been delivered.
    pub fn is_released(&self) -> bool {
        self.released.iter().any(|&r| r)
    }

    pub fn is_marker_released(&self, marker: usize) -> bool {
        self.released.get(marker).copied().unwrap_or(false)
    }

    fn level_at(&self, time: f64) -> f64 {
        match self.stage {
            EnvelopeStage::Running => {
                let frac = (time - self.phase_start) / self.phase_duration;
                interpolate(
                    self.start_level,
                    self.target_level,
                    frac,
                    self.shape,
                )
            }
            EnvelopeStage::Sustained | EnvelopeStage::Finished => self.level,
        }
    }
}

impl Envelope {
    /// Begin playback at `ctx.time`.
    ///
    /// Computes phase 0 (and any zero-length phases after it) right away, so
    /// a formula failure in the first phase surfaces here.
    pub fn start(&self, ctx: &NoteCtx) -> Result<EnvelopeState, EvalError> {
        let mut state = EnvelopeState::idle(ctx.time);
        if self.constant.is_some() {
            state.stage = EnvelopeStage::Finished;
            return Ok(state);
        }
        self.enter_boundary(&mut state, 0, ctx.time, ctx)?;
        Ok(state)
    }

    /// Value at `ctx.time`, advancing `state` through any phases that
    /// ended since the previous call.
    pub fn evaluate(&self, state: &mut EnvelopeState, ctx: &NoteCtx) -> Result<f64, EvalError> {
        if let Some(value) = self.constant {
            return Ok(value);
        }

        self.advance(state, ctx)?;
        state.level = state.level_at(ctx.time);

        match &self.formula {
            Some(formula) => {
                let args = FormulaArgs {
                    accents: &ctx.accents,
                    track_accents: Some(&ctx.track_accents),
                    t: ctx.time,
                    x: Some(self.scale),
                    bpm: ctx.tempo,
                };
                formula.evaluate(&args)
            }
            None => Ok(state.level * self.scale),
        }
    }

    /// Deliver release event `marker` (0..3) at `ctx.time`.
    ///
    /// Out-of-range markers are ignored.
    pub fn release(
        &self,
        state: &mut EnvelopeState,
        marker: usize,
        ctx: &NoteCtx,
    ) -> Result<(), EvalError> {
        let Some(released) = state.released.get_mut(marker) else {
            return Ok(());
        };
        if *released {
            return Ok(());
        }
        *released = true;

        if self.constant.is_some() {
            return Ok(());
        }

        self.advance(state, ctx)?;
        state.level = state.level_at(ctx.time);

        let m = self.markers[marker];
        let Some(boundary) = m.boundary() else {
            return Ok(());
        };

        match state.stage {
            EnvelopeStage::Finished => Ok(()),
            EnvelopeStage::Sustained => {
                let held_at = state.phase;
                if m.kind.skip && boundary > held_at {
                    self.enter_boundary(state, boundary, ctx.time, ctx)
                } else if !self.holds_at(state, held_at) {
                    self.enter_boundary(state, held_at, ctx.time, ctx)
                } else {
                    Ok(())
                }
            }
            EnvelopeStage::Running => {
                // Playback is inside phase `state.phase`, so boundaries up to
                // and including it have been passed.
                if m.kind.skip && boundary > state.phase {
                    self.enter_boundary(state, boundary, ctx.time, ctx)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Deliver all three release events.
    pub fn release_all(&self, state: &mut EnvelopeState, ctx: &NoteCtx) -> Result<(), EvalError> {
        for marker in 0..MARKER_COUNT {
            self.release(state, marker, ctx)?;
        }
        Ok(())
    }

    fn advance(&self, state: &mut EnvelopeState, ctx: &NoteCtx) -> Result<(), EvalError> {
        while state.stage == EnvelopeStage::Running {
            let end = state.phase_start + state.phase_duration;
            if ctx.time < end {
                break;
            }
            state.level = state.target_level;
            self.enter_boundary(state, state.phase + 1, end, ctx)?;
        }
        Ok(())
    }

    fn holds_at(&self, state: &EnvelopeState, boundary: usize) -> bool {
        self.markers.iter().enumerate().any(|(k, m)| {
            m.kind.hold && m.boundary() == Some(boundary) && !state.released[k]
        })
    }

    /// Arrive at `boundary` at time `at` with `state.level` as the current
    /// level, then run forward through zero-length phases until playback
    /// is inside a phase, held, or finished.
    fn enter_boundary(
        &self,
        state: &mut EnvelopeState,
        mut boundary: usize,
        at: f64,
        ctx: &NoteCtx,
    ) -> Result<(), EvalError> {
        loop {
            if self.holds_at(state, boundary) {
                state.phase = boundary;
                state.stage = EnvelopeStage::Sustained;
                return Ok(());
            }

            let Some(phase) = self.phases.get(boundary) else {
                state.phase = boundary;
                state.stage = EnvelopeStage::Finished;
                return Ok(());
            };

            let duration = self.phase_duration(phase, ctx, at)?;
            let target = self.phase_target(phase, ctx, at, state.level)?;

            if duration <= 0.0 {
                state.level = target;
                boundary += 1;
                continue;
            }

            state.phase = boundary;
            state.stage = EnvelopeStage::Running;
            state.start_level = state.level;
            state.target_level = target;
            state.phase_start = at;
            state.phase_duration = duration;
            state.shape = phase.shape;
            return Ok(());
        }
    }

    fn init_args<'a>(ctx: &'a NoteCtx, at: f64) -> FormulaArgs<'a> {
        FormulaArgs {
            accents: &ctx.accents,
            track_accents: Some(&ctx.track_accents),
            t: at,
            x: None,
            bpm: ctx.tempo,
        }
    }

    pub(crate) fn phase_duration(
        &self,
        phase: &Phase,
        ctx: &NoteCtx,
        at: f64,
    ) -> Result<f64, EvalError> {
        let base = phase.duration.resolve(&Self::init_args(ctx, at))?;
        let accent = rate_accent_scale(ctx.accents.dot(&phase.rate_accent));
        let pitch = pitch_scale(ctx.pitch, phase.rate_freq_rolloff, phase.rate_freq_norm);
        let global = pitch_scale(ctx.pitch, self.global_rate_rolloff, self.global_rate_norm);
        Ok(base * accent * pitch * global)
    }

    pub(crate) fn phase_target(
        &self,
        phase: &Phase,
        ctx: &NoteCtx,
        at: f64,
        start_level: f64,
    ) -> Result<f64, EvalError> {
        let mut target = phase.target.resolve(&Self::init_args(ctx, at))?;
        target += ctx.accents.dot(&phase.amp_accent);
        target *= pitch_scale(ctx.pitch, phase.amp_freq_rolloff, phase.amp_freq_norm);
        if phase.mode == TargetMode::RelativeScale {
            target *= start_level;
        }
        Ok(target)
    }
}
