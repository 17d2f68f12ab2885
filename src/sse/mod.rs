//! Stochastic-series-expansion representation and the loop update for the
//! quantum models.

pub use model::*;
pub use ops::*;

/// Quantum model state.
pub mod model;

/// Loop elements and the operator string.
pub mod ops;

/// The loop update itself.
pub mod loop_update;
