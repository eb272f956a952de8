//! Real-world scenario benchmarks.
//!
//! These model what the render thread does per block: the shipped voices,
//! the channel strip, and a whole preset session.

mod mix;
mod voices;

pub use mix::bench_mix;
pub use voices::bench_voices;
