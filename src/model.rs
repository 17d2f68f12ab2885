//! The closed model variant, coupling tables, and model construction from
//! a parameter map.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tracing::warn;

use crate::classical::{cluster, ClassicalModel};
use crate::errors::SpinError;
use crate::lattice::Lattice;
use crate::params::Parameters;
use crate::sse::loop_update;
use crate::sse::model::QuantumModel;

/// Per-type coupling constants, fixed over a run.
///
/// `j` is the classical coupling or the quantum `Jz` per bond type, `jxy`
/// the quantum transverse coupling per bond type, `gamma` the transverse
/// field per site type.
#[derive(Clone, Debug, Default)]
pub struct Couplings {
    /// Ising/Potts/Clock/XY coupling, or `Jz`, per bond type.
    pub j: Vec<f64>,
    /// `Jxy` per bond type; empty semantics (all zero) for classical runs.
    pub jxy: Vec<f64>,
    /// Transverse field per site type.
    pub gamma: Vec<f64>,
}

/// Update algorithm selector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpdateMethod {
    /// Multi-cluster Swendsen-Wang (classical models).
    SwendsenWang,
    /// Single-cluster Wolff (classical models).
    Wolff,
    /// Loop update (quantum models).
    Loop,
}

/// Per-sweep byproduct of the update, consumed by the estimators.
///
/// Per-cluster sizes, flips, and weights are read from the model's
/// union-find, which stays valid until the next sweep.
#[derive(Clone, Debug)]
pub enum SweepInfo {
    /// Swendsen-Wang multi-cluster decomposition.
    Clusters {
        /// Number of clusters found.
        num_clusters: usize,
        /// Activated bond count per bond type.
        activated: Vec<usize>,
    },
    /// Wolff single-cluster flip; carries no usable aggregates.
    SingleCluster {
        /// Sites in the flipped cluster.
        size: usize,
    },
    /// Loop update byproduct.
    Loops {
        /// Operators in the string after the sweep.
        num_ops: usize,
        /// Number of loops.
        num_clusters: usize,
    },
}

/// A spin model ready to sweep: the closed variant over the six concrete
/// models, dispatched at sweep boundaries.
///
/// The classical four (Ising | Potts | Clock | XY) share storage and are
/// tagged by their spin representation; the quantum two (XXZ and
/// transverse-field Ising) share the sub-spin + operator-string state.
#[derive(Clone, Debug)]
pub enum Model<R: Rng> {
    /// A classical model.
    Classical(ClassicalModel<R>),
    /// A quantum model.
    Quantum(QuantumModel<R>),
}

/// Default model with the crate's seedable stream.
pub type DefaultModel = Model<Pcg64>;

impl<R: Rng> Model<R> {
    /// Number of lattice sites.
    pub fn num_sites(&self) -> usize {
        self.lattice().num_sites()
    }

    /// The lattice.
    pub fn lattice(&self) -> &Lattice {
        match self {
            Model::Classical(m) => &m.lattice,
            Model::Quantum(m) => &m.lattice,
        }
    }

    /// Perform one Monte Carlo sweep with the given update.
    pub fn sweep(
        &mut self,
        update: UpdateMethod,
        temperature: f64,
        couplings: &Couplings,
    ) -> Result<SweepInfo, SpinError> {
        if !(temperature > 0.0) {
            return Err(SpinError::param("T", "temperature must be positive"));
        }
        match (self, update) {
            (Model::Classical(m), UpdateMethod::SwendsenWang) => {
                Ok(cluster::swendsen_wang(m, temperature, &couplings.j))
            }
            (Model::Classical(m), UpdateMethod::Wolff) => {
                Ok(cluster::wolff(m, temperature, &couplings.j))
            }
            (Model::Quantum(m), UpdateMethod::Loop) => {
                loop_update::loop_sweep(m, temperature, couplings)
            }
            (Model::Classical(_), UpdateMethod::Loop) => Err(SpinError::param(
                "UpdateMethod",
                "the loop update applies to quantum models only",
            )),
            (Model::Quantum(_), _) => Err(SpinError::param(
                "UpdateMethod",
                "quantum models update with the loop algorithm",
            )),
        }
    }
}

fn build_lattice(params: &Parameters) -> Result<Lattice, SpinError> {
    let l = params.count("L")?;
    if l < 2 {
        return Err(SpinError::param("L", "extent must be at least 2"));
    }
    let tag = params.tag("Lattice")?;
    let lat = match tag {
        "chain" => Lattice::chain(l),
        "square" => Lattice::square(l, params.count_or("W", l)?),
        "triangular" => Lattice::triangular(l, params.count_or("W", l)?),
        "cubic" => Lattice::cubic(l, params.count_or("W", l)?, params.count_or("H", l)?),
        other => {
            return Err(SpinError::param(
                "Lattice",
                format!("unknown lattice `{}`", other),
            ))
        }
    };
    Ok(lat)
}

fn update_method(params: &Parameters, default: UpdateMethod) -> Result<UpdateMethod, SpinError> {
    if !params.contains("UpdateMethod") {
        return Ok(default);
    }
    match params.tag("UpdateMethod")? {
        "SW" | "SwendsenWang" => Ok(UpdateMethod::SwendsenWang),
        "Wolff" => Ok(UpdateMethod::Wolff),
        "Loop" => Ok(UpdateMethod::Loop),
        other => Err(SpinError::param(
            "UpdateMethod",
            format!("unknown update method `{}`", other),
        )),
    }
}

/// Build a model, its couplings, and the update method from a parameter
/// map.
pub fn build_model(
    params: &Parameters,
) -> Result<(DefaultModel, Couplings, UpdateMethod), SpinError> {
    let lattice = build_lattice(params)?;
    let nbt = lattice.num_bond_types();
    let nst = lattice.num_site_types();
    let rng = Pcg64::seed_from_u64(params.seed()?);

    match params.tag("Model")? {
        "Ising" => {
            let couplings = Couplings {
                j: params.per_type("J", "Js", nbt, 1.0)?,
                jxy: vec![0.0; nbt],
                gamma: vec![0.0; nst],
            };
            let update = update_method(params, UpdateMethod::SwendsenWang)?;
            Ok((
                Model::Classical(ClassicalModel::ising(lattice, rng)),
                couplings,
                update,
            ))
        }
        "Potts" => {
            let q = params.count("Q")?;
            if q < 2 {
                return Err(SpinError::param("Q", "need at least two states"));
            }
            let j = params.per_type("J", "Js", nbt, 1.0)?;
            if j.iter().any(|j| *j < 0.0) {
                return Err(SpinError::param(
                    "J",
                    "antiferromagnetic Potts has no cluster representation",
                ));
            }
            let couplings = Couplings {
                j,
                jxy: vec![0.0; nbt],
                gamma: vec![0.0; nst],
            };
            let update = update_method(params, UpdateMethod::SwendsenWang)?;
            Ok((
                Model::Classical(ClassicalModel::potts(lattice, q, rng)),
                couplings,
                update,
            ))
        }
        "Clock" => {
            let q = params.count("Q")?;
            if q < 2 {
                return Err(SpinError::param("Q", "need at least two states"));
            }
            let couplings = Couplings {
                j: params.per_type("J", "Js", nbt, 1.0)?,
                jxy: vec![0.0; nbt],
                gamma: vec![0.0; nst],
            };
            let update = update_method(params, UpdateMethod::SwendsenWang)?;
            Ok((
                Model::Classical(ClassicalModel::clock(lattice, q, rng)),
                couplings,
                update,
            ))
        }
        "XY" => {
            let couplings = Couplings {
                j: params.per_type("J", "Js", nbt, 1.0)?,
                jxy: vec![0.0; nbt],
                gamma: vec![0.0; nst],
            };
            let update = update_method(params, UpdateMethod::SwendsenWang)?;
            Ok((
                Model::Classical(ClassicalModel::xy(lattice, rng)),
                couplings,
                update,
            ))
        }
        "QuantumXXZ" => {
            let twos = params.spin_multiplicity()?;
            let couplings = Couplings {
                j: params.per_type("J", "Js", nbt, 1.0)?,
                jxy: params.per_type("Jxy", "Jxys", nbt, 0.0)?,
                gamma: params.per_type("G", "Gs", nst, 0.0)?,
            };
            if couplings.jxy.iter().any(|j| *j > 0.0) && lattice.num_site_types() < 2 {
                warn!("antiferromagnetic Jxy on a non-bipartite lattice: the sublattice gauge does not apply");
            }
            let update = update_method(params, UpdateMethod::Loop)?;
            Ok((
                Model::Quantum(QuantumModel::new(lattice, twos, rng)),
                couplings,
                update,
            ))
        }
        "TransverseFieldIsing" => {
            // σ-convention H = -J Σ σz σz - Γ Σ σx, mapped onto the XXZ
            // sub-spin machinery via Jz = -4J, Γ' = 2Γ.
            let twos = params.spin_multiplicity()?;
            let j = params.per_type("J", "Js", nbt, 1.0)?;
            let g = params.per_type("G", "Gs", nst, 1.0)?;
            let couplings = Couplings {
                j: j.iter().map(|j| -4.0 * j).collect(),
                jxy: vec![0.0; nbt],
                gamma: g.iter().map(|g| 2.0 * g).collect(),
            };
            let update = update_method(params, UpdateMethod::Loop)?;
            Ok((
                Model::Quantum(QuantumModel::new(lattice, twos, rng)),
                couplings,
                update,
            ))
        }
        other => Err(SpinError::param(
            "Model",
            format!("unknown model `{}`", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_six_models() {
        for (model, extra) in [
            ("Ising", None),
            ("Potts", Some(("Q", 3i64))),
            ("Clock", Some(("Q", 6i64))),
            ("XY", None),
            ("QuantumXXZ", None),
            ("TransverseFieldIsing", None),
        ] {
            let mut p = Parameters::new()
                .with("Model", model)
                .with("Lattice", "square")
                .with("L", 4usize);
            if let Some((k, v)) = extra {
                p.set(k, v);
            }
            build_model(&p).unwrap();
        }
    }

    #[test]
    fn rejects_mismatched_update() {
        let p = Parameters::new()
            .with("Model", "Ising")
            .with("Lattice", "chain")
            .with("L", 8usize)
            .with("UpdateMethod", "Loop");
        let (mut model, couplings, update) = build_model(&p).unwrap();
        assert!(model.sweep(update, 1.0, &couplings).is_err());
    }

    #[test]
    fn rejects_antiferromagnetic_potts() {
        let p = Parameters::new()
            .with("Model", "Potts")
            .with("Lattice", "square")
            .with("L", 4usize)
            .with("Q", 3i64)
            .with("J", -1.0);
        assert!(build_model(&p).is_err());
    }

    #[test]
    fn tfi_maps_onto_ferromagnetic_xxz() {
        let p = Parameters::new()
            .with("Model", "TransverseFieldIsing")
            .with("Lattice", "chain")
            .with("L", 8usize)
            .with("J", 1.0)
            .with("G", 0.5);
        let (_, couplings, update) = build_model(&p).unwrap();
        assert_eq!(update, UpdateMethod::Loop);
        assert!(couplings.j.iter().all(|j| (*j + 4.0).abs() < 1e-12));
        assert!(couplings.gamma.iter().all(|g| (*g - 1.0).abs() < 1e-12));
    }
}
