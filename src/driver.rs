//! The simulation driver: thermalization, measurement sweeps, estimator
//! dispatch, and observable summaries.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::errors::SpinError;
use crate::estimators::{direct_estimate, improved_estimate, Estimate};
use crate::model::{build_model, SweepInfo};
use crate::params::Parameters;
use crate::stats::{jackknife, Accumulator};

/// Mean and standard error of one observable.
#[derive(Copy, Clone, Debug)]
pub struct Observable {
    /// Run mean (jackknife-debiased for derived quantities).
    pub mean: f64,
    /// One-sigma statistical error.
    pub stderr: f64,
}

/// Summary of one run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Observable name to summary.
    pub observables: BTreeMap<String, Observable>,
    /// Measurement sweeps whose estimate was non-finite and zeroed.
    pub underflow_sweeps: usize,
    /// Number of measurement sweeps.
    pub measured_sweeps: usize,
}

impl RunSummary {
    /// Look up one observable.
    pub fn observable(&self, name: &str) -> Option<Observable> {
        self.observables.get(name).copied()
    }

    /// Mean of one observable; NaN when absent.
    pub fn mean(&self, name: &str) -> f64 {
        self.observable(name).map(|o| o.mean).unwrap_or(f64::NAN)
    }
}

/// Run one (model, temperature) point: thermalize, measure, summarize.
pub fn run(params: &Parameters) -> Result<RunSummary, SpinError> {
    let temperature = params.float("T")?;
    if !(temperature > 0.0) {
        return Err(SpinError::param("T", "temperature must be positive"));
    }
    let mcs = params.count_or("MCS", 8192)?;
    let therm = params.count_or("Thermalization", mcs / 8)?;

    let (mut model, couplings, update) = build_model(params)?;
    info!(
        model = params.tag("Model")?,
        temperature, mcs, therm, "starting run"
    );

    for _ in 0..therm {
        model.sweep(update, temperature, &couplings)?;
    }

    // M, |M|, M^2, M^4, E, E^2
    let mut acc: [Accumulator; 6] = Default::default();
    let mut underflow = 0usize;
    for _ in 0..mcs {
        let sweep_info = model.sweep(update, temperature, &couplings)?;
        let est = match sweep_info {
            SweepInfo::SingleCluster { .. } => {
                direct_estimate(&model, temperature, &couplings, &sweep_info)
            }
            _ => improved_estimate(&model, temperature, &couplings, &sweep_info),
        };
        let est = if est.is_finite() {
            est
        } else {
            underflow += 1;
            Estimate::zero()
        };
        acc[0].push(est.mag);
        acc[1].push(est.mag.abs());
        acc[2].push(est.mag2);
        acc[3].push(est.mag4);
        acc[4].push(est.energy);
        acc[5].push(est.energy2);
    }
    if underflow > 0 {
        warn!(underflow, "non-finite sweep estimates were zeroed");
    }

    let beta = 1.0 / temperature;
    let nsites = model.num_sites() as f64;
    let mut observables = BTreeMap::new();
    for (name, a) in [
        ("Magnetization", &acc[0]),
        ("|Magnetization|", &acc[1]),
        ("Magnetization^2", &acc[2]),
        ("Magnetization^4", &acc[3]),
        ("Energy", &acc[4]),
        ("Energy^2", &acc[5]),
    ] {
        observables.insert(
            name.to_string(),
            Observable {
                mean: a.mean(),
                stderr: a.stderr(),
            },
        );
    }

    let (c, c_err) = jackknife(&[acc[4].samples(), acc[5].samples()], |m| {
        beta * beta * nsites * (m[1] - m[0] * m[0])
    });
    observables.insert(
        "Specific Heat".to_string(),
        Observable {
            mean: c,
            stderr: c_err,
        },
    );
    let (chi, chi_err) = jackknife(&[acc[2].samples()], |m| beta * nsites * m[0]);
    observables.insert(
        "Susceptibility".to_string(),
        Observable {
            mean: chi,
            stderr: chi_err,
        },
    );
    let (cchi, cchi_err) = jackknife(&[acc[1].samples(), acc[2].samples()], |m| {
        beta * nsites * (m[1] - m[0] * m[0])
    });
    observables.insert(
        "Connected Susceptibility".to_string(),
        Observable {
            mean: cchi,
            stderr: cchi_err,
        },
    );
    let (binder, binder_err) = jackknife(&[acc[2].samples(), acc[3].samples()], |m| {
        if m[0] > 0.0 {
            m[1] / (m[0] * m[0])
        } else {
            0.0
        }
    });
    observables.insert(
        "Binder Ratio".to_string(),
        Observable {
            mean: binder,
            stderr: binder_err,
        },
    );

    Ok(RunSummary {
        observables,
        underflow_sweeps: underflow,
        measured_sweeps: mcs,
    })
}

/// Run a temperature scan; points are independent and run in parallel,
/// each with its own seed derived from the base seed.
pub fn run_scan(params: &Parameters, temperatures: &[f64]) -> Result<Vec<RunSummary>, SpinError> {
    let base_seed = params.seed()?;
    temperatures
        .par_iter()
        .enumerate()
        .map(|(i, t)| {
            let mut point = params.clone();
            point.set("T", *t);
            point.set("Seed", (base_seed.wrapping_add(i as u64)) as i64);
            run(&point)
        })
        .collect()
}
