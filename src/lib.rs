#![deny(
    missing_docs,
    unreachable_pub,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_import_braces,
    unused_qualifications
)]

//! `spinmc` is a cluster Monte Carlo library for classical and quantum
//! lattice spin models: Ising, Potts, clock, and XY with Swendsen-Wang or
//! Wolff updates, and spin-S XXZ / transverse-field Ising with the loop
//! algorithm, all with cluster-improved estimators.

pub use driver::{run, run_scan, Observable, RunSummary};
pub use errors::SpinError;
pub use estimators::{direct_estimate, improved_estimate, Estimate};
pub use model::{build_model, Couplings, DefaultModel, Model, SweepInfo, UpdateMethod};
pub use params::{ParamValue, Parameters};

/// Classical models and cluster updates.
pub mod classical;
/// The simulation driver.
pub mod driver;
/// Error kinds.
pub mod errors;
/// Improved and direct estimators.
pub mod estimators;
/// Lattices.
pub mod lattice;
/// Model construction and sweep dispatch.
pub mod model;
/// The parameter dictionary.
pub mod params;
/// Snapshot I/O.
#[cfg(feature = "serialize")]
pub mod snapshot;
/// Observable statistics.
pub mod stats;
/// Quantum models and the loop update.
pub mod sse;
/// Union-find with cluster payloads.
pub mod unionfind;
