//! Quantum model state: τ=0 sub-spin basis state plus the operator string.

use rand::Rng;

use crate::errors::SpinError;
use crate::lattice::Lattice;
use crate::sse::ops::{LoopOp, OperatorString};
use crate::unionfind::{UnionFind, WeightSum};

/// Spin-S XXZ (and transverse-field Ising) state in the split sub-spin
/// representation: each site carries `2S` spin-1/2 world lines.
///
/// Sub-spin `k` of site `s` lives at index `s * 2S + k`.
#[derive(Clone, Debug)]
pub struct QuantumModel<R: Rng> {
    pub(crate) lattice: Lattice,
    pub(crate) twos: usize,
    pub(crate) subspins: Vec<i8>,
    pub(crate) ops: OperatorString,
    pub(crate) rng: R,
    pub(crate) uf: UnionFind<WeightSum>,
    // Sweep scratch, reused to keep steady-state allocation flat.
    pub(crate) scratch_ops: Vec<LoopOp>,
    pub(crate) prop: Vec<i8>,
    pub(crate) active: Vec<usize>,
}

impl<R: Rng> QuantumModel<R> {
    /// A model with a random initial basis state and an empty operator
    /// string.
    pub fn new(lattice: Lattice, twos: usize, mut rng: R) -> Self {
        let nsub = lattice.num_sites() * twos;
        let subspins: Vec<i8> = (0..nsub)
            .map(|_| if rng.gen::<bool>() { 1 } else { -1 })
            .collect();
        QuantumModel {
            lattice,
            twos,
            subspins,
            ops: OperatorString::new(),
            rng,
            uf: UnionFind::new(),
            scratch_ops: vec![],
            prop: vec![0; nsub],
            active: vec![0; nsub],
        }
    }

    /// The lattice.
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Sub-spin multiplicity `2S`.
    pub fn spin_multiplicity(&self) -> usize {
        self.twos
    }

    /// Number of sub-spin world lines.
    pub fn num_subspins(&self) -> usize {
        self.subspins.len()
    }

    /// Global index of sub-spin `k` at `site`.
    pub fn subspin_index(&self, site: usize, k: usize) -> usize {
        site * self.twos + k
    }

    /// The τ=0 basis state.
    pub fn subspins(&self) -> &[i8] {
        &self.subspins
    }

    /// The operator string.
    pub fn operator_string(&self) -> &OperatorString {
        &self.ops
    }

    /// Magnetization density moments read directly from the τ=0 state,
    /// in spin units (`Sz = σ/2`).
    pub fn magnetization_moments(&self) -> (f64, f64, f64) {
        let n = self.lattice.num_sites() as f64;
        let m = 0.5 * self.subspins.iter().map(|s| *s as f64).sum::<f64>() / n;
        (m, m * m, m * m * m * m)
    }

    /// Check the operator string against the τ=0 state.
    pub fn verify(&self) -> Result<(), SpinError> {
        self.ops.verify(&self.subspins)
    }
}
