//! Statement variants of the signal network.

use std::sync::Arc;

use crate::envelope::Envelope;

use super::variable::VarId;

/// Wavetable oscillator.
///
/// Frequency is `pitch * freq_mul / freq_div + freq_add`. The phase is
/// offset by `phase_source * phase_gain` (phase modulation), and
/// `index_envelope` morphs across the tables of the selected wave.
#[derive(Debug, Clone)]
pub struct Wave {
    pub freq_mul: f64,
    pub freq_add: f64,
    pub freq_div: f64,
    pub phase_source: VarId,
    pub phase_gain: VarId,
    pub target: VarId,
    pub index_envelope: Arc<Envelope>,
    /// Name looked up in the wave dictionary at compile time.
    pub wave: String,
}

impl Wave {
    pub fn new(wave: impl Into<String>, target: VarId) -> Self {
        Self {
            freq_mul: 1.0,
            freq_add: 0.0,
            freq_div: 1.0,
            phase_source: VarId::ZERO,
            phase_gain: VarId::ZERO,
            target,
            index_envelope: Arc::new(Envelope::constant(0.0)),
            wave: wave.into(),
        }
    }

    pub fn with_ratio(mut self, mul: f64, div: f64) -> Self {
        self.freq_mul = mul;
        self.freq_div = div;
        self
    }

    pub fn with_offset(mut self, hz: f64) -> Self {
        self.freq_add = hz;
        self
    }

    pub fn with_phase_mod(mut self, source: VarId, gain: VarId) -> Self {
        self.phase_source = source;
        self.phase_gain = gain;
        self
    }

    pub fn with_index_envelope(mut self, envelope: Arc<Envelope>) -> Self {
        self.index_envelope = envelope;
        self
    }
}

/// `target = factor * source + factor2 * source2 + addend`.
#[derive(Debug, Clone)]
pub struct MulAdd {
    pub source: VarId,
    pub source2: VarId,
    pub factor2: VarId,
    pub factor: f64,
    pub addend: f64,
    pub target: VarId,
}

impl MulAdd {
    pub fn new(source: VarId, target: VarId) -> Self {
        Self {
            source,
            source2: VarId::ZERO,
            factor2: VarId::ONE,
            factor: 1.0,
            addend: 0.0,
            target,
        }
    }

    pub fn scaled(mut self, factor: f64, addend: f64) -> Self {
        self.factor = factor;
        self.addend = addend;
        self
    }

    pub fn plus(mut self, source2: VarId, factor2: VarId) -> Self {
        self.source2 = source2;
        self.factor2 = factor2;
        self
    }
}

/// `target = envelope(t)`.
#[derive(Debug, Clone)]
pub struct EnvelopeTap {
    pub target: VarId,
    pub envelope: Arc<Envelope>,
}

impl EnvelopeTap {
    pub fn new(envelope: Arc<Envelope>, target: VarId) -> Self {
        Self { target, envelope }
    }
}

#[derive(Debug, Clone)]
pub enum Statement {
    Wave(Wave),
    MulAdd(MulAdd),
    Envelope(EnvelopeTap),
}

impl Statement {
    pub fn target(&self) -> VarId {
        match self {
            Statement::Wave(w) => w.target,
            Statement::MulAdd(m) => m.target,
            Statement::Envelope(e) => e.target,
        }
    }

    pub(crate) fn set_target(&mut self, var: VarId) {
        match self {
            Statement::Wave(w) => w.target = var,
            Statement::MulAdd(m) => m.target = var,
            Statement::Envelope(e) => e.target = var,
        }
    }

    pub fn reads_var(&self, var: VarId) -> bool {
        self.operands().any(|v| v == var)
    }

    /// Operand variables in a fixed order. Unused operands are `ZERO`/`ONE`.
    pub fn operands(&self) -> impl Iterator<Item = VarId> {
        let ops: [Option<VarId>; 3] = match self {
            Statement::Wave(w) => [Some(w.phase_source), Some(w.phase_gain), None],
            Statement::MulAdd(m) => [Some(m.source), Some(m.source2), Some(m.factor2)],
            Statement::Envelope(_) => [None, None, None],
        };
        ops.into_iter().flatten()
    }

    /// Point every read of `from` at `to`. Writes are untouched.
    pub(crate) fn rename_reads(&mut self, from: VarId, to: VarId) {
        let swap = |v: &mut VarId| {
            if *v == from {
                *v = to;
            }
        };
        match self {
            Statement::Wave(w) => {
                swap(&mut w.phase_source);
                swap(&mut w.phase_gain);
            }
            Statement::MulAdd(m) => {
                swap(&mut m.source);
                swap(&mut m.source2);
                swap(&mut m.factor2);
            }
            Statement::Envelope(_) => {}
        }
    }

    /// The envelope a voice must keep playback state for, if any.
    pub fn envelope(&self) -> Option<&Arc<Envelope>> {
        match self {
            Statement::Wave(w) => Some(&w.index_envelope),
            Statement::MulAdd(_) => None,
            Statement::Envelope(e) => Some(&e.envelope),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Wave(_) => "wave",
            Statement::MulAdd(_) => "muladd",
            Statement::Envelope(_) => "envelope",
        }
    }
}

impl From<Wave> for Statement {
    fn from(w: Wave) -> Self {
        Statement::Wave(w)
    }
}

impl From<MulAdd> for Statement {
    fn from(m: MulAdd) -> Self {
        Statement::MulAdd(m)
    }
}

impl From<EnvelopeTap> for Statement {
    fn from(e: EnvelopeTap) -> Self {
        Statement::Envelope(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operands_per_variant() {
        let x = VarId(4);
        let y = VarId(5);
        let wave: Statement = Wave::new("sine", VarId::LEFT)
            .with_phase_mod(x, y)
            .into();
        assert_eq!(wave.operands().collect::<Vec<_>>(), vec![x, y]);

        let m: Statement = MulAdd::new(x, y).plus(VarId::ONE, x).into();
        assert_eq!(m.operands().collect::<Vec<_>>(), vec![x, VarId::ONE, x]);
        assert!(m.reads_var(x));
        assert!(!m.reads_var(y));

        let e: Statement = EnvelopeTap::new(Arc::new(Envelope::constant(1.0)), x).into();
        assert_eq!(e.operands().count(), 0);
    }

    #[test]
    fn rename_reads_leaves_target_alone() {
        let g = VarId(4);
        let g1 = VarId(5);
        let mut s: Statement = MulAdd::new(g, g).plus(g, VarId::ONE).into();
        s.rename_reads(g, g1);
        assert_eq!(s.target(), g);
        assert_eq!(s.operands().collect::<Vec<_>>(), vec![g1, g1, VarId::ONE]);
    }
}
