//! Statement network: typed statements over a shared variable table.

/*
Statement Networks
==================

A voice is described as a short program. Every statement reads a few
variables and writes one, and the whole list runs once per cycle:

    env  = envelope(amp)             // EnvelopeTap
    mod  = 3.0 * env + 0.0           // MulAdd
    left = wave("sine", phase + mod) // Wave

Variables live in one table. Four slots are fixed:

  zero    always 0   (read only)
  one     always 1   (read only)
  left    left output, always data rate
  right   right output, always data rate

Compiling a network checks it, splits reused variable names into separate
lifetimes and classifies every statement as control rate or data rate
(see `classify`). The result is immutable and shared by every voice that
plays it; per-voice state lives in `NetworkVoice`.
*/

/// Lifetime splitting and control/data rate classification.
pub mod classify;
/// Statement variants.
pub mod statement;
/// Variable arena.
pub mod variable;
/// Per-voice rendering.
pub mod voice;
/// Wavetables and the wave dictionary.
pub mod wave;

pub use classify::{Classification, Rate};
pub use statement::{EnvelopeTap, MulAdd, Statement, Wave};
pub use variable::{VarId, VariableTable};
pub use voice::NetworkVoice;
#[cfg(feature = "rtrb")]
pub use voice::{VoiceHandle, VoiceMessage};
pub use wave::{WaveBank, WaveDictionary, WaveTable, WaveTableSet};

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ConfigError;

/// Statements and variables under construction.
#[derive(Debug, Clone, Default)]
pub struct Network {
    statements: Vec<Statement>,
    variables: VariableTable,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(statements: Vec<Statement>, variables: VariableTable) -> Self {
        Self {
            statements,
            variables,
        }
    }

    /// Handle for the user variable `name`.
    pub fn var(&mut self, name: &str) -> VarId {
        self.variables.ensure(name)
    }

    pub fn push(&mut self, statement: impl Into<Statement>) -> &mut Self {
        self.statements.push(statement.into());
        self
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Validate, split lifetimes and classify.
    pub fn compile(self, waves: &dyn WaveDictionary) -> Result<CompiledNetwork, ConfigError> {
        let Network {
            mut statements,
            mut variables,
        } = self;

        let mut tables = Vec::with_capacity(statements.len());
        for (i, stmt) in statements.iter().enumerate() {
            check_statement(i, stmt, &variables)?;
            tables.push(resolve_wave(stmt, waves)?);
        }

        let splits = classify::split_lifetimes(&mut statements, &mut variables)?;
        let classification = classify::classify(&statements, variables.len());

        let (data, control): (Vec<usize>, Vec<usize>) =
            (0..statements.len()).partition(|&i| classification.statements[i].is_data());

        debug!(
            statements = statements.len(),
            variables = variables.len(),
            splits,
            control = control.len(),
            data = data.len(),
            "compiled statement network"
        );

        Ok(CompiledNetwork {
            statements,
            variables,
            tables,
            classification,
            control,
            data,
            splits,
        })
    }
}

fn check_statement(index: usize, stmt: &Statement, vars: &VariableTable) -> Result<(), ConfigError> {
    let target = stmt.target();
    for var in stmt.operands().chain(std::iter::once(target)) {
        if !vars.contains(var) {
            return Err(ConfigError::UnknownVariable {
                statement: index,
                var: var.0,
            });
        }
    }

    if target == VarId::ZERO {
        return Err(ConfigError::ConstantWrite {
            statement: index,
            name: "zero",
        });
    }
    if target == VarId::ONE {
        return Err(ConfigError::ConstantWrite {
            statement: index,
            name: "one",
        });
    }

    if let Statement::Wave(w) = stmt {
        if w.freq_div == 0.0 {
            return Err(ConfigError::ZeroFrequencyDivisor { statement: index });
        }
    }
    Ok(())
}

fn resolve_wave(
    stmt: &Statement,
    waves: &dyn WaveDictionary,
) -> Result<Option<Arc<WaveTableSet>>, ConfigError> {
    let Statement::Wave(w) = stmt else {
        return Ok(None);
    };
    match waves.lookup(&w.wave) {
        Some(set) => Ok(Some(set)),
        None => {
            warn!(wave = %w.wave, "wave not found in dictionary");
            Err(ConfigError::UnknownWave(w.wave.clone()))
        }
    }
}

/// A checked and classified network. Read-only; share it between voices.
#[derive(Debug, Clone)]
pub struct CompiledNetwork {
    statements: Vec<Statement>,
    variables: VariableTable,
    tables: Vec<Option<Arc<WaveTableSet>>>,
    classification: Classification,
    control: Vec<usize>,
    data: Vec<usize>,
    splits: usize,
}

impl CompiledNetwork {
    /// Statements after lifetime splitting.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn statement_rate(&self, index: usize) -> Option<Rate> {
        self.classification.statements.get(index).copied()
    }

    pub fn variable_rate(&self, var: VarId) -> Option<Rate> {
        self.classification.variables.get(var.index()).copied()
    }

    /// Whether statement `index` may run once per control period.
    pub fn is_optimizable(&self, index: usize) -> bool {
        self.statement_rate(index) == Some(Rate::Control)
    }

    /// Control-rate statement indices, in program order.
    pub fn control_statements(&self) -> &[usize] {
        &self.control
    }

    /// Data-rate statement indices, in program order.
    pub fn data_statements(&self) -> &[usize] {
        &self.data
    }

    /// Variable slots added by lifetime splitting.
    pub fn split_count(&self) -> usize {
        self.splits
    }

    pub(crate) fn table(&self, index: usize) -> Option<&WaveTableSet> {
        self.tables.get(index).and_then(|t| t.as_deref())
    }
}
