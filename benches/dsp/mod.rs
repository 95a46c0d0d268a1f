//! Benchmarks for accents, envelopes and network rendering.

mod accent;
mod envelope;
mod network;

pub use accent::bench_accent;
pub use envelope::bench_envelope;
pub use network::bench_network;
