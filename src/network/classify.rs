//! Control-rate / data-rate classification.

/*
Rate Classification
===================

A network runs as a loop: every cycle executes every statement in order.
Some statements produce values that cannot change within a control period
(an envelope feeding only other slow values, a constant scaled by a
constant). Running those once per control period instead of once per
sample saves most of the work in a typical patch.

Vocabulary
----------

  data rate      Recomputed every sample.

  control rate   Recomputed once per control period; marked "optimizable".

  lifetime       The span of a variable's value from one write to the next
                 write of the same variable, read around the loop.

  wrap-around    A statement reading a variable before that variable's
                 writer runs in the same cycle sees last cycle's value.


Step 1: Split Lifetimes
-----------------------

Reusing a name for two unrelated values would tie them together: if one
use is data rate the other would be dragged along. Each write after the
first gets its own slot, and the reads that see that write are renamed:

    0: g = env              g    = env
    1: a = g * 2            a    = g * 2
    2: g = wave      →      g'1  = wave
    3: left = g             left = g'1

The reads belonging to write k are those strictly after it, up to and
including the next write of the same name (a statement reads before it
writes), wrapping around the end of the list.


Step 2: Fixed Point
-------------------

Everything starts at control rate except `left` and `right`. Each pass
walks the statements and promotes:

    wave         always
    muladd       if it, its target, or any operand is data rate
    envelope     if its target is data rate
    any          if its target is still control rate but some data-rate
                 statement reads it (searching backwards round the ring
                 from the statement itself)

A promoted statement makes its target data rate too. Promotion is one-way,
so passes stop changing after at most `statements + variables` rounds.
*/

use tracing::{debug, trace};

use crate::error::ConfigError;

use super::{
    statement::Statement,
    variable::{VarId, VariableTable},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rate {
    Control,
    Data,
}

impl Rate {
    #[inline]
    pub fn is_data(self) -> bool {
        self == Rate::Data
    }
}

/// Output of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub statements: Vec<Rate>,
    pub variables: Vec<Rate>,
    /// Passes until nothing changed (the last pass included).
    pub passes: usize,
}

/// Give every write after the first its own variable slot.
///
/// Returns the number of slots added.
pub fn split_lifetimes(
    statements: &mut [Statement],
    variables: &mut VariableTable,
) -> Result<usize, ConfigError> {
    for (i, stmt) in statements.iter().enumerate() {
        let target = stmt.target();
        if let Some(var) = stmt
            .operands()
            .chain(std::iter::once(target))
            .find(|&v| !variables.contains(v))
        {
            return Err(ConfigError::Classifier(format!(
                "statement {i} refers to {var} outside the variable table"
            )));
        }
    }

    let n = statements.len();
    let mut splits = 0;
    let mut index = VarId::FIXED;

    while index < variables.len() {
        let var = VarId(index as u32);
        let writes: Vec<usize> = statements
            .iter()
            .enumerate()
            .filter(|(_, s)| s.target() == var)
            .map(|(i, _)| i)
            .collect();

        if writes.len() < 2 {
            index += 1;
            continue;
        }

        let first = writes[0];
        let second = writes[1];
        let next = writes.get(2).copied().unwrap_or(first);

        let fresh = variables.split(var);
        statements[second].set_target(fresh);

        let mut pos = second;
        loop {
            pos = (pos + 1) % n;
            statements[pos].rename_reads(var, fresh);
            if pos == next {
                break;
            }
        }

        trace!(
            var = %var,
            fresh = %fresh,
            statement = second,
            "split variable lifetime"
        );
        splits += 1;
    }

    Ok(splits)
}

/// Run the fixed-point rate propagation over already-split statements.
pub fn classify(statements: &[Statement], variable_count: usize) -> Classification {
    let n = statements.len();
    let mut stmt_rates = vec![Rate::Control; n];
    let mut var_rates = vec![Rate::Control; variable_count];
    for fixed in [VarId::LEFT, VarId::RIGHT] {
        if let Some(r) = var_rates.get_mut(fixed.index()) {
            *r = Rate::Data;
        }
    }

    let mut passes = 0;
    loop {
        passes += 1;
        let mut changed = false;

        for (i, stmt) in statements.iter().enumerate() {
            let target = stmt.target();
            let target_rate = var_rates[target.index()];

            let mut data = stmt_rates[i].is_data() || target_rate.is_data();
            data |= match stmt {
                Statement::Wave(_) => true,
                Statement::MulAdd(_) => stmt.operands().any(|v| var_rates[v.index()].is_data()),
                Statement::Envelope(_) => false,
            };

            if !data && !target_rate.is_data() {
                data = (0..n)
                    .map(|k| (i + n - k) % n)
                    .any(|j| stmt_rates[j].is_data() && statements[j].reads_var(target));
                if data {
                    trace!(statement = i, var = %target, "promoted by data-rate reader");
                }
            }

            if data {
                if !stmt_rates[i].is_data() {
                    stmt_rates[i] = Rate::Data;
                    changed = true;
                }
                if !var_rates[target.index()].is_data() {
                    var_rates[target.index()] = Rate::Data;
                    changed = true;
                }
            }
        }

        if !changed {
            break;
        }
    }

    debug!(
        statements = n,
        passes,
        data = stmt_rates.iter().filter(|r| r.is_data()).count(),
        "rate classification reached fixed point"
    );

    Classification {
        statements: stmt_rates,
        variables: var_rates,
        passes,
    }
}
