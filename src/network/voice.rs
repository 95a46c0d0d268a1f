#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer, RingBuffer};

use std::sync::Arc;

use crate::{
    checked,
    config::RenderConfig,
    envelope::{EnvelopeState, MARKER_COUNT},
    error::{ConfigError, EvalError},
    param::NoteCtx,
};

use super::{statement::Statement, variable::VarId, CompiledNetwork};

/// One playing instance of a compiled network.
///
/// Everything the render loop touches is allocated up front; `note_on`,
/// `release` and `render` never allocate.
pub struct NetworkVoice {
    network: Arc<CompiledNetwork>,
    values: Vec<f64>,
    osc_phases: Vec<f64>,
    envelopes: Vec<Option<EnvelopeState>>,
    note: NoteCtx,
    sample_rate: f64,
    control_period: usize,
    until_control: usize,
    sample: u64,
    active: bool,
    #[cfg(feature = "rtrb")]
    rx: Option<Consumer<VoiceMessage>>,
}

impl NetworkVoice {
    pub fn new(network: Arc<CompiledNetwork>, cfg: &RenderConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let vars = network.variables().len();
        let stmts = network.statements().len();
        Ok(Self {
            network,
            values: vec![0.0; vars],
            osc_phases: vec![0.0; stmts],
            envelopes: vec![None; stmts],
            note: cfg.note(0.0),
            sample_rate: cfg.sample_rate as f64,
            control_period: cfg.control_period,
            until_control: 0,
            sample: 0,
            active: false,
            #[cfg(feature = "rtrb")]
            rx: None,
        })
    }

    /// Voice plus a handle that can deliver release events from another
    /// thread.
    #[cfg(feature = "rtrb")]
    pub fn with_handle(
        network: Arc<CompiledNetwork>,
        cfg: &RenderConfig,
    ) -> Result<(Self, VoiceHandle), ConfigError> {
        let mut voice = Self::new(network, cfg)?;
        let (tx, rx) = RingBuffer::<VoiceMessage>::new(VOICE_QUEUE_SIZE);
        voice.rx = Some(rx);
        Ok((voice, VoiceHandle { tx }))
    }

    /// Start a note. `note.time` is ignored; the note starts at time 0.
    ///
    /// If an envelope fails to start the voice is left inactive.
    pub fn note_on(&mut self, note: NoteCtx) -> Result<(), EvalError> {
        self.active = false;
        self.note = note.at(0.0);
        self.values.fill(0.0);
        self.values[VarId::ONE.index()] = 1.0;
        self.osc_phases.fill(0.0);
        self.sample = 0;
        self.until_control = 0;

        let network = Arc::clone(&self.network);
        for (slot, stmt) in self.envelopes.iter_mut().zip(network.statements()) {
            *slot = match stmt.envelope() {
                Some(env) => Some(env.start(&self.note)?),
                None => None,
            };
        }
        self.active = true;
        Ok(())
    }

    /// Deliver release event `marker` to every envelope of the voice.
    pub fn release(&mut self, marker: usize) -> Result<(), EvalError> {
        if !self.active || marker >= MARKER_COUNT {
            return Ok(());
        }
        let ctx = self.note.at(self.time());
        let network = Arc::clone(&self.network);
        for (slot, stmt) in self.envelopes.iter_mut().zip(network.statements()) {
            if let (Some(state), Some(env)) = (slot.as_mut(), stmt.envelope()) {
                env.release(state, marker, &ctx)?;
            }
        }
        Ok(())
    }

    pub fn release_all(&mut self) -> Result<(), EvalError> {
        for marker in 0..MARKER_COUNT {
            self.release(marker)?;
        }
        Ok(())
    }

    /// Stop immediately; the next render produces silence.
    pub fn kill(&mut self) {
        self.active = false;
    }

    /// Render one block. Both channels must have the same length.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<(), EvalError> {
        checked::ensure(left.len() == right.len(), "stereo buffers differ in length");

        #[cfg(feature = "rtrb")]
        self.drain_messages()?;

        if !self.active {
            left.fill(0.0);
            right.fill(0.0);
            return Ok(());
        }

        let network = Arc::clone(&self.network);
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let t = self.time();

            if self.until_control == 0 {
                for &i in network.control_statements() {
                    self.execute(&network, i, t)?;
                }
                self.until_control = self.control_period;
            }
            self.until_control -= 1;

            for &i in network.data_statements() {
                self.execute(&network, i, t)?;
            }

            *l = self.values[VarId::LEFT.index()] as f32;
            *r = self.values[VarId::RIGHT.index()] as f32;
            self.sample += 1;
        }
        Ok(())
    }

    fn execute(&mut self, network: &CompiledNetwork, index: usize, t: f64) -> Result<(), EvalError> {
        let ctx = self.note.at(t);
        match &network.statements()[index] {
            Statement::MulAdd(m) => {
                let v = &self.values;
                let out = m.factor * v[m.source.index()]
                    + v[m.factor2.index()] * v[m.source2.index()]
                    + m.addend;
                self.values[m.target.index()] = out;
            }
            Statement::Envelope(e) => {
                if let Some(state) = self.envelopes[index].as_mut() {
                    self.values[e.target.index()] = e.envelope.evaluate(state, &ctx)?;
                }
            }
            Statement::Wave(w) => {
                let morph = match self.envelopes[index].as_mut() {
                    Some(state) => w.index_envelope.evaluate(state, &ctx)?,
                    None => 0.0,
                };
                let offset = self.values[w.phase_source.index()] * self.values[w.phase_gain.index()];
                let phase = self.osc_phases[index];
                let out = network
                    .table(index)
                    .map_or(0.0, |set| set.read(phase + offset, morph));

                let freq = ctx.pitch * w.freq_mul / w.freq_div + w.freq_add;
                self.osc_phases[index] = (phase + freq / self.sample_rate).rem_euclid(1.0);
                self.values[w.target.index()] = out;
            }
        }
        Ok(())
    }

    #[cfg(feature = "rtrb")]
    fn drain_messages(&mut self) -> Result<(), EvalError> {
        while let Some(msg) = self.rx.as_mut().and_then(|rx| rx.pop().ok()) {
            match msg {
                VoiceMessage::Release(marker) => self.release(marker)?,
                VoiceMessage::ReleaseAll => self.release_all()?,
            }
        }
        Ok(())
    }

    /// Seconds since note on.
    pub fn time(&self) -> f64 {
        self.sample as f64 / self.sample_rate
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True once every phase-driven envelope of the voice has run out.
    ///
    /// Constant envelopes (including a wave's default index envelope) are
    /// ignored; a voice with no phase-driven envelope never finishes.
    pub fn is_finished(&self) -> bool {
        let mut timed = self
            .envelopes
            .iter()
            .zip(self.network.statements())
            .filter_map(|(state, stmt)| {
                let env = stmt.envelope()?;
                if env.constant_value().is_some() {
                    return None;
                }
                state.as_ref()
            })
            .peekable();
        self.active && timed.peek().is_some() && timed.all(|state| state.is_finished())
    }

    pub fn value(&self, var: VarId) -> Option<f64> {
        self.values.get(var.index()).copied()
    }

    pub fn network(&self) -> &Arc<CompiledNetwork> {
        &self.network
    }
}

#[cfg(feature = "rtrb")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceMessage {
    Release(usize),
    ReleaseAll,
}

#[cfg(feature = "rtrb")]
const VOICE_QUEUE_SIZE: usize = 64;

/// Sends release events to a [`NetworkVoice`] on the audio thread.
#[cfg(feature = "rtrb")]
pub struct VoiceHandle {
    tx: Producer<VoiceMessage>,
}

#[cfg(feature = "rtrb")]
impl VoiceHandle {
    pub fn release(&mut self, marker: usize) {
        let _ = self.tx.push(VoiceMessage::Release(marker));
    }

    pub fn release_all(&mut self) {
        let _ = self.tx.push(VoiceMessage::ReleaseAll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accent::AccentVector,
        envelope::{Envelope, MarkerKind, Phase},
        network::{EnvelopeTap, MulAdd, Network, Wave, WaveBank},
        param::FnFormula,
    };

    fn cfg(sample_rate: f32, period: usize) -> RenderConfig {
        RenderConfig::new(sample_rate).with_control_period(period)
    }

    fn compile(net: Network) -> Arc<CompiledNetwork> {
        Arc::new(net.compile(&WaveBank::with_builtin()).unwrap())
    }

    fn ramp() -> Arc<Envelope> {
        Arc::new(Envelope::with_phases([Phase::new(1.0, 1.0)]))
    }

    #[test]
    fn silent_until_note_on() {
        let mut net = Network::new();
        net.push(MulAdd::new(VarId::ONE, VarId::LEFT).scaled(2.0, 0.5));
        let mut voice = NetworkVoice::new(compile(net), &cfg(8.0, 4)).unwrap();

        let (mut l, mut r) = ([9.0f32; 4], [9.0f32; 4]);
        voice.render(&mut l, &mut r).unwrap();
        assert_eq!(l, [0.0; 4]);

        voice.note_on(NoteCtx::new(440.0, 120.0)).unwrap();
        voice.render(&mut l, &mut r).unwrap();
        assert_eq!(l, [2.5; 4]);
        assert_eq!(r, [0.0; 4]);
    }

    #[test]
    fn data_rate_envelope_updates_every_sample() {
        let mut net = Network::new();
        net.push(EnvelopeTap::new(ramp(), VarId::LEFT));
        let mut voice = NetworkVoice::new(compile(net), &cfg(8.0, 4)).unwrap();
        voice.note_on(NoteCtx::new(440.0, 120.0)).unwrap();

        let (mut l, mut r) = ([0.0f32; 4], [0.0f32; 4]);
        voice.render(&mut l, &mut r).unwrap();
        assert_eq!(l, [0.0, 0.125, 0.25, 0.375]);
    }

    #[test]
    fn control_rate_envelope_updates_once_per_period() {
        let mut net = Network::new();
        let e = net.var("e");
        net.push(EnvelopeTap::new(ramp(), e));
        let mut voice = NetworkVoice::new(compile(net), &cfg(8.0, 4)).unwrap();
        assert!(voice.network().is_optimizable(0));
        voice.note_on(NoteCtx::new(440.0, 120.0)).unwrap();

        let (mut l, mut r) = ([0.0f32; 3], [0.0f32; 3]);
        voice.render(&mut l, &mut r).unwrap();
        assert_eq!(voice.value(e), Some(0.0));

        let (mut l, mut r) = ([0.0f32; 2], [0.0f32; 2]);
        voice.render(&mut l, &mut r).unwrap();
        assert_eq!(voice.value(e), Some(0.5));
    }

    #[test]
    fn wave_plays_pitch() {
        let mut net = Network::new();
        net.push(Wave::new("sine", VarId::LEFT));
        let mut voice = NetworkVoice::new(compile(net), &cfg(4.0, 4)).unwrap();
        voice.note_on(NoteCtx::new(1.0, 120.0)).unwrap();

        let (mut l, mut r) = ([0.0f32; 4], [0.0f32; 4]);
        voice.render(&mut l, &mut r).unwrap();
        let expected = [0.0, 1.0, 0.0, -1.0];
        for (got, want) in l.iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "{got} vs {want}");
        }
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn release_through_handle() {
        let mut env = Envelope::with_phases([Phase::new(0.25, 1.0), Phase::new(0.25, 0.0)]);
        env.set_marker(0, 1, MarkerKind::SUSTAIN_NO_SKIP).unwrap();

        let mut net = Network::new();
        net.push(EnvelopeTap::new(Arc::new(env), VarId::LEFT));
        let (mut voice, mut handle) = NetworkVoice::with_handle(compile(net), &cfg(8.0, 4)).unwrap();
        voice.note_on(NoteCtx::new(440.0, 120.0)).unwrap();

        let (mut l, mut r) = ([0.0f32; 8], [0.0f32; 8]);
        voice.render(&mut l, &mut r).unwrap();
        assert_eq!(l[7], 1.0);
        assert!(!voice.is_finished());

        handle.release(0);
        voice.render(&mut l, &mut r).unwrap();
        assert_eq!(&l[..3], &[1.0, 0.5, 0.0]);
        assert!(voice.is_finished());
    }

    #[test]
    fn formula_error_stops_render() {
        let mut env = Envelope::new();
        env.set_formula(FnFormula::shared("fail", |_| Err(EvalError::DivideByZero)))
            .unwrap();

        let mut net = Network::new();
        net.push(EnvelopeTap::new(Arc::new(env), VarId::LEFT));
        let mut voice = NetworkVoice::new(compile(net), &cfg(8.0, 4)).unwrap();
        voice.note_on(NoteCtx::new(440.0, 120.0)).unwrap();

        let (mut l, mut r) = ([0.0f32; 2], [0.0f32; 2]);
        assert_eq!(voice.render(&mut l, &mut r), Err(EvalError::DivideByZero));
    }

    #[test]
    fn failed_note_on_leaves_voice_silent() {
        let right_env = Envelope::with_phases([Phase::new(1.0, 1.0)
            .with_target_formula(FnFormula::shared("accent guard", |args| {
                match args.accents.get(0) {
                    Some(a) if a > 0.0 => Err(EvalError::DivideByZero),
                    _ => Ok(0.5),
                }
            }))
            .unwrap()]);

        let mut net = Network::new();
        net.push(EnvelopeTap::new(ramp(), VarId::LEFT))
            .push(EnvelopeTap::new(Arc::new(right_env), VarId::RIGHT));
        let mut voice = NetworkVoice::new(compile(net), &cfg(8.0, 4)).unwrap();

        voice.note_on(NoteCtx::new(440.0, 120.0)).unwrap();
        let (mut l, mut r) = ([0.0f32; 4], [0.0f32; 4]);
        voice.render(&mut l, &mut r).unwrap();
        assert_eq!(r, [0.0, 0.0625, 0.125, 0.1875]);

        let accented = NoteCtx::new(440.0, 120.0)
            .with_accents(AccentVector::ZERO.with(0, 1.0).unwrap());
        assert_eq!(voice.note_on(accented), Err(EvalError::DivideByZero));
        assert!(!voice.is_active());
        assert!(!voice.is_finished());

        let (mut l, mut r) = ([1.0f32; 4], [1.0f32; 4]);
        voice.render(&mut l, &mut r).unwrap();
        assert_eq!(l, [0.0; 4]);
        assert_eq!(r, [0.0; 4]);

        // A clean note afterwards starts both envelopes again.
        voice.note_on(NoteCtx::new(440.0, 120.0)).unwrap();
        assert!(voice.is_active());
    }

    #[test]
    fn constant_envelopes_do_not_finish_a_voice() {
        let mut net = Network::new();
        net.push(Wave::new("sine", VarId::LEFT));
        let mut voice = NetworkVoice::new(compile(net), &cfg(8.0, 4)).unwrap();
        voice.note_on(NoteCtx::new(1.0, 120.0)).unwrap();
        assert!(!voice.is_finished());

        let mut net = Network::new();
        let short = Envelope::with_phases([Phase::new(0.25, 1.0)]);
        net.push(Wave::new("sine", VarId::LEFT))
            .push(EnvelopeTap::new(Arc::new(short), VarId::RIGHT));
        let mut voice = NetworkVoice::new(compile(net), &cfg(8.0, 4)).unwrap();
        voice.note_on(NoteCtx::new(1.0, 120.0)).unwrap();
        assert!(!voice.is_finished());

        let (mut l, mut r) = ([0.0f32; 4], [0.0f32; 4]);
        voice.render(&mut l, &mut r).unwrap();
        assert!(voice.is_finished());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let net = Network::new();
        assert!(NetworkVoice::new(compile(net), &cfg(8.0, 0)).is_err());
    }
}
