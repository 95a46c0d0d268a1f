//! Wave dictionary: named single-cycle wavetables for `Wave` statements.

/*
Wavetables
==========

A wave statement does not compute its waveform; it reads it from a table.
One table holds a single cycle sampled at `len` points. Reading at phase
`p` (0..1) interpolates linearly between the two nearest points.

A wave set holds one or more tables. The statement's index envelope
(0..1) slides between them, so a set of [sine, saw] morphs from a pure
tone to a bright one as the envelope rises.

  Sine      fundamental only
  Saw       all harmonics, falling as 1/n
  Square    odd harmonics, falling as 1/n
  Triangle  odd harmonics, falling as 1/n²

The built-in tables are naive (not band-limited). That is fine for the
control-rate tests and demos here; a real instrument would supply its own
tables through the dictionary.
*/

use std::{collections::HashMap, f64::consts::TAU, sync::Arc};

/// Default table length for the built-in waves.
pub const DEFAULT_TABLE_LEN: usize = 2048;

#[derive(Debug, Clone)]
pub struct WaveTable {
    samples: Vec<f32>,
}

impl WaveTable {
    /// Table from raw samples of one cycle. Empty input yields silence.
    pub fn from_samples(samples: Vec<f32>) -> Self {
        if samples.is_empty() {
            return Self { samples: vec![0.0] };
        }
        Self { samples }
    }

    /// Sample `f(phase)` for phase in 0..1 at `len` points.
    pub fn from_fn(len: usize, f: impl Fn(f64) -> f64) -> Self {
        let len = len.max(1);
        let samples = (0..len).map(|i| f(i as f64 / len as f64) as f32).collect();
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Linear interpolation at `phase`, wrapped into 0..1.
    #[inline]
    pub fn read(&self, phase: f64) -> f64 {
        let len = self.samples.len();
        let pos = phase.rem_euclid(1.0) * len as f64;
        let i = pos.floor() as usize % len;
        let j = (i + 1) % len;
        let frac = pos - pos.floor();
        let a = self.samples[i] as f64;
        let b = self.samples[j] as f64;
        a + (b - a) * frac
    }
}

#[derive(Debug, Clone)]
pub struct WaveTableSet {
    tables: Vec<WaveTable>,
}

impl WaveTableSet {
    pub fn new(tables: Vec<WaveTable>) -> Self {
        let tables = if tables.is_empty() {
            vec![WaveTable::from_samples(Vec::new())]
        } else {
            tables
        };
        Self { tables }
    }

    pub fn single(table: WaveTable) -> Self {
        Self {
            tables: vec![table],
        }
    }

    pub fn tables(&self) -> &[WaveTable] {
        &self.tables
    }

    /// Read at `phase`, morphing across tables by `index` (0..1, clamped).
    #[inline]
    pub fn read(&self, phase: f64, index: f64) -> f64 {
        let last = self.tables.len() - 1;
        if last == 0 {
            return self.tables[0].read(phase);
        }
        let pos = index.clamp(0.0, 1.0) * last as f64;
        let i = (pos.floor() as usize).min(last);
        let j = (i + 1).min(last);
        let frac = pos - i as f64;
        let a = self.tables[i].read(phase);
        if frac == 0.0 || i == j {
            return a;
        }
        a + (self.tables[j].read(phase) - a) * frac
    }
}

/// Read-only name → wave lookup consumed when a network is compiled.
pub trait WaveDictionary {
    fn lookup(&self, name: &str) -> Option<Arc<WaveTableSet>>;
}

/// HashMap-backed dictionary.
#[derive(Debug, Clone, Default)]
pub struct WaveBank {
    waves: HashMap<String, Arc<WaveTableSet>>,
}

impl WaveBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bank preloaded with `sine`, `saw`, `square` and `triangle`.
    pub fn with_builtin() -> Self {
        let mut bank = Self::new();
        let n = DEFAULT_TABLE_LEN;
        bank.insert("sine", WaveTableSet::single(WaveTable::from_fn(n, |p| (TAU * p).sin())));
        bank.insert("saw", WaveTableSet::single(WaveTable::from_fn(n, |p| 2.0 * p - 1.0)));
        bank.insert(
            "square",
            WaveTableSet::single(WaveTable::from_fn(n, |p| if p < 0.5 { 1.0 } else { -1.0 })),
        );
        bank.insert(
            "triangle",
            WaveTableSet::single(WaveTable::from_fn(n, |p| 1.0 - 4.0 * (p - 0.5).abs())),
        );
        bank
    }

    pub fn insert(&mut self, name: impl Into<String>, set: WaveTableSet) {
        self.waves.insert(name.into(), Arc::new(set));
    }

    pub fn len(&self) -> usize {
        self.waves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }
}

impl WaveDictionary for WaveBank {
    fn lookup(&self, name: &str) -> Option<Arc<WaveTableSet>> {
        self.waves.get(name).cloned()
    }
}
