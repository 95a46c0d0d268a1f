pub mod accent; // Strike/performance accent vectors
pub mod checked;
pub mod config;
pub mod envelope; // Multi-phase envelopes
pub mod error;
pub mod network; // Statement network and rate classification
pub mod param; // Formula-backed scalar parameters
pub mod patch;

pub use accent::{AccentVector, ACCENT_SLOTS};
pub use config::RenderConfig;
pub use envelope::{Envelope, EnvelopeState, MarkerKind, Phase};
pub use error::{ConfigError, EvalError};
pub use network::{CompiledNetwork, Network, NetworkVoice, Rate, VarId};
pub use param::{NoteCtx, ScalarParameter};

pub const MAX_BLOCK_SIZE: usize = 2048;
