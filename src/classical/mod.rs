//! Classical spin models and their cluster updates.

use std::f64::consts::PI;

use rand::Rng;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

use crate::lattice::Lattice;
use crate::unionfind::{UnionFind, WeightSum};

pub mod cluster;

/// Spin storage for the four classical models.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum ClassicalSpins {
    /// Z₂ spins in {+1, -1}.
    Ising(Vec<i8>),
    /// Q-state Potts spins in 0..q.
    Potts {
        /// Number of states.
        q: usize,
        /// Per-site state index.
        spins: Vec<u32>,
    },
    /// Q-state clock spins with precomputed trigonometric tables.
    Clock {
        /// Number of states.
        q: usize,
        /// Per-site state index; the angle is `2π k / q`.
        spins: Vec<u32>,
        /// `cos(2π k / q)` by state.
        cosines: Vec<f64>,
        /// `sin(2π k / q)` by state.
        sines: Vec<f64>,
        /// Half-shifted sines `sin(π (2k + 1) / q)` used for the
        /// Swendsen-Wang axis projection; never exactly zero.
        half_sines: Vec<f64>,
    },
    /// Planar spins stored as angle over 2π, in [0, 1).
    Xy(Vec<f64>),
}

/// A classical model: lattice, spins, the owned random stream, and the
/// per-sweep scratch reused across sweeps.
#[derive(Clone, Debug)]
pub struct ClassicalModel<R: Rng> {
    pub(crate) lattice: Lattice,
    pub(crate) spins: ClassicalSpins,
    pub(crate) rng: R,
    pub(crate) uf: UnionFind<WeightSum>,
    // Axis projections for Clock/XY, rebuilt each sweep.
    pub(crate) sigma: Vec<i8>,
    pub(crate) weight: Vec<f64>,
    // Wolff growth scratch.
    pub(crate) visited: Vec<bool>,
    pub(crate) stack: Vec<usize>,
    pub(crate) members: Vec<usize>,
    // Potts cluster remap scratch.
    pub(crate) remap: Vec<u32>,
    pub(crate) clamp_logged: bool,
}

impl<R: Rng> ClassicalModel<R> {
    /// Ising model with a random initial configuration.
    pub fn ising(lattice: Lattice, mut rng: R) -> Self {
        let spins = (0..lattice.num_sites())
            .map(|_| if rng.gen::<bool>() { 1 } else { -1 })
            .collect();
        Self::with_spins(lattice, ClassicalSpins::Ising(spins), rng)
    }

    /// Q-state Potts model with a random initial configuration.
    pub fn potts(lattice: Lattice, q: usize, mut rng: R) -> Self {
        let spins = (0..lattice.num_sites())
            .map(|_| rng.gen_range(0..q) as u32)
            .collect();
        Self::with_spins(lattice, ClassicalSpins::Potts { q, spins }, rng)
    }

    /// Q-state clock model with a random initial configuration.
    pub fn clock(lattice: Lattice, q: usize, mut rng: R) -> Self {
        let spins = (0..lattice.num_sites())
            .map(|_| rng.gen_range(0..q) as u32)
            .collect();
        let cosines = (0..q).map(|k| (2.0 * PI * k as f64 / q as f64).cos()).collect();
        let sines = (0..q).map(|k| (2.0 * PI * k as f64 / q as f64).sin()).collect();
        let half_sines = (0..q)
            .map(|k| (PI * (2 * k + 1) as f64 / q as f64).sin())
            .collect();
        Self::with_spins(
            lattice,
            ClassicalSpins::Clock {
                q,
                spins,
                cosines,
                sines,
                half_sines,
            },
            rng,
        )
    }

    /// XY model with a random initial configuration.
    pub fn xy(lattice: Lattice, mut rng: R) -> Self {
        let spins = (0..lattice.num_sites()).map(|_| rng.gen::<f64>()).collect();
        Self::with_spins(lattice, ClassicalSpins::Xy(spins), rng)
    }

    /// Wrap an explicit spin configuration.
    pub fn with_spins(lattice: Lattice, spins: ClassicalSpins, rng: R) -> Self {
        let n = lattice.num_sites();
        ClassicalModel {
            lattice,
            spins,
            rng,
            uf: UnionFind::new(),
            sigma: vec![0; n],
            weight: vec![0.0; n],
            visited: vec![false; n],
            stack: vec![],
            members: vec![],
            remap: vec![],
            clamp_logged: false,
        }
    }

    /// The lattice.
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// The spin configuration.
    pub fn spins(&self) -> &ClassicalSpins {
        &self.spins
    }

    /// Energy density from a direct Hamiltonian evaluation.
    pub fn energy_density(&self, couplings: &[f64]) -> f64 {
        let lat = &self.lattice;
        let total: f64 = (0..lat.num_bonds())
            .map(|b| {
                let (i, j) = lat.bond(b);
                let jt = couplings[lat.bond_type(b)];
                match &self.spins {
                    ClassicalSpins::Ising(s) => -jt * (s[i] * s[j]) as f64,
                    ClassicalSpins::Potts { spins, .. } => {
                        if spins[i] == spins[j] {
                            -jt
                        } else {
                            0.0
                        }
                    }
                    ClassicalSpins::Clock { q, spins, cosines, .. } => {
                        let d = (spins[i] + *q as u32 - spins[j]) as usize % q;
                        -jt * cosines[d]
                    }
                    ClassicalSpins::Xy(s) => -jt * (2.0 * PI * (s[i] - s[j])).cos(),
                }
            })
            .sum();
        total / lat.num_sites() as f64
    }

    /// Magnetization density: the order parameter, its square, and its
    /// fourth power, read off the current configuration.
    pub fn magnetization_moments(&self) -> (f64, f64, f64) {
        let n = self.lattice.num_sites() as f64;
        match &self.spins {
            ClassicalSpins::Ising(s) => {
                let m = s.iter().map(|v| *v as f64).sum::<f64>() / n;
                (m, m * m, m * m * m * m)
            }
            ClassicalSpins::Potts { q, spins } => {
                let ones = spins.iter().filter(|s| **s == 0).count() as f64;
                let m = (ones - n / *q as f64) / n;
                (m, m * m, m * m * m * m)
            }
            ClassicalSpins::Clock { spins, cosines, sines, .. } => {
                let (mx, my) = spins.iter().fold((0.0, 0.0), |(x, y), s| {
                    (x + cosines[*s as usize], y + sines[*s as usize])
                });
                let m2 = (mx * mx + my * my) / (n * n);
                (m2.sqrt(), m2, m2 * m2)
            }
            ClassicalSpins::Xy(s) => {
                let (mx, my) = s.iter().fold((0.0, 0.0), |(x, y), v| {
                    let theta = 2.0 * PI * v;
                    (x + theta.cos(), y + theta.sin())
                });
                let m2 = (mx * mx + my * my) / (n * n);
                (m2.sqrt(), m2, m2 * m2)
            }
        }
    }
}
