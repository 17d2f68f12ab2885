//! Swendsen-Wang and Wolff cluster updates for the classical models.

use std::f64::consts::PI;

use rand::Rng;
use tracing::warn;

use crate::model::SweepInfo;
use crate::unionfind::WeightSum;

use super::{ClassicalModel, ClassicalSpins};

/// Reflection axis drawn once per sweep for the continuous-spin models.
#[derive(Copy, Clone, Debug)]
enum Axis {
    /// Ising and Potts need no projection.
    None,
    /// Clock axis as a half-integer shift within Z_Q.
    Rot(usize),
    /// XY axis as an angle over 2π.
    Angle(f64),
}

/// Bond activation probability `1 - exp(-x)`, computed with `expm1` and
/// clamped into [0, 1]. Degenerate inputs are logged once per model.
fn activation_prob(x: f64, logged: &mut bool) -> f64 {
    let p = -(-x).exp_m1();
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        if !*logged {
            warn!(x, p, "degenerate bond activation probability; clamping");
            *logged = true;
        }
        if p.is_nan() {
            0.0
        } else {
            p.clamp(0.0, 1.0)
        }
    } else {
        p
    }
}

/// Fill the per-site Z₂ projection (sign and magnitude) for this sweep.
fn project<R: Rng>(
    spins: &ClassicalSpins,
    sigma: &mut [i8],
    weight: &mut [f64],
    rng: &mut R,
) -> Axis {
    match spins {
        ClassicalSpins::Ising(s) => {
            for (i, v) in s.iter().enumerate() {
                sigma[i] = *v;
                weight[i] = 1.0;
            }
            Axis::None
        }
        ClassicalSpins::Potts { .. } => {
            sigma.iter_mut().for_each(|v| *v = 1);
            weight.iter_mut().for_each(|w| *w = 1.0);
            Axis::None
        }
        ClassicalSpins::Clock {
            q,
            spins,
            half_sines,
            ..
        } => {
            let rot = rng.gen_range(0..*q);
            for (i, s) in spins.iter().enumerate() {
                let u = (*s as usize + q - rot) % q;
                let c = half_sines[u];
                sigma[i] = if c >= 0.0 { 1 } else { -1 };
                weight[i] = c.abs();
            }
            Axis::Rot(rot)
        }
        ClassicalSpins::Xy(s) => {
            let axis = rng.gen::<f64>();
            for (i, v) in s.iter().enumerate() {
                let c = (2.0 * PI * (v - axis)).cos();
                sigma[i] = if c >= 0.0 { 1 } else { -1 };
                weight[i] = c.abs();
            }
            Axis::Angle(axis)
        }
    }
}

/// Activation probability of bond `(i, j)` with coupling `jt` in the
/// current (projected) configuration; zero when the bond is unsatisfied.
fn bond_prob(
    spins: &ClassicalSpins,
    sigma: &[i8],
    weight: &[f64],
    i: usize,
    j: usize,
    jt: f64,
    beta: f64,
    logged: &mut bool,
) -> f64 {
    let (satisfied, x) = match spins {
        ClassicalSpins::Ising(s) => ((jt >= 0.0) == (s[i] == s[j]), 2.0 * beta * jt.abs()),
        ClassicalSpins::Potts { spins, .. } => (spins[i] == spins[j], beta * jt.abs()),
        ClassicalSpins::Clock { .. } | ClassicalSpins::Xy(_) => (
            (jt >= 0.0) == (sigma[i] == sigma[j]),
            2.0 * beta * jt.abs() * weight[i] * weight[j],
        ),
    };
    if satisfied {
        activation_prob(x, logged)
    } else {
        0.0
    }
}

/// Reflect one site across the sweep axis.
fn reflect(spins: &mut ClassicalSpins, site: usize, axis: Axis) {
    match (spins, axis) {
        (ClassicalSpins::Ising(s), _) => s[site] = -s[site],
        (ClassicalSpins::Clock { q, spins, .. }, Axis::Rot(rot)) => {
            let u = (spins[site] as usize + *q - rot) % *q;
            spins[site] = ((rot + *q - 1 - u) % *q) as u32;
        }
        (ClassicalSpins::Xy(s), Axis::Angle(a)) => {
            s[site] = (2.0 * a + 0.5 - s[site]).rem_euclid(1.0);
        }
        // Potts clusters are remapped wholesale, not reflected.
        _ => unreachable!("axis does not match the spin representation"),
    }
}

/// One Swendsen-Wang sweep: bond activation, `clusterize`, per-cluster flip.
pub(crate) fn swendsen_wang<R: Rng>(
    model: &mut ClassicalModel<R>,
    temperature: f64,
    couplings: &[f64],
) -> SweepInfo {
    let beta = 1.0 / temperature;
    let ClassicalModel {
        lattice,
        spins,
        rng,
        uf,
        sigma,
        weight,
        remap,
        clamp_logged,
        ..
    } = model;
    let n = lattice.num_sites();

    let axis = project(spins, sigma, weight, rng);

    uf.reset(0);
    for i in 0..n {
        uf.add_node_with(WeightSum(weight[i]));
    }

    let mut activated = vec![0usize; lattice.num_bond_types()];
    for b in 0..lattice.num_bonds() {
        let (i, j) = lattice.bond(b);
        let bt = lattice.bond_type(b);
        let p = bond_prob(spins, sigma, weight, i, j, couplings[bt], beta, clamp_logged);
        if rng.gen::<f64>() < p {
            uf.unify(i, j);
            activated[bt] += 1;
        }
    }

    uf.clusterize(rng);

    match spins {
        ClassicalSpins::Potts { q, spins } => {
            remap.clear();
            let q = *q;
            remap.extend((0..uf.num_clusters()).map(|_| rng.gen_range(0..q) as u32));
            for (i, s) in spins.iter_mut().enumerate() {
                *s = remap[uf.cluster_id(i)];
            }
        }
        other => {
            for i in 0..n {
                if uf.cluster_flip(uf.cluster_id(i)) {
                    reflect(other, i, axis);
                }
            }
        }
    }

    SweepInfo::Clusters {
        num_clusters: uf.num_clusters(),
        activated,
    }
}

/// One Wolff update: grow a single cluster from a random seed and flip it.
///
/// No per-cluster aggregates are produced, so callers fall back to the
/// direct estimator for these sweeps.
pub(crate) fn wolff<R: Rng>(
    model: &mut ClassicalModel<R>,
    temperature: f64,
    couplings: &[f64],
) -> SweepInfo {
    let beta = 1.0 / temperature;
    let ClassicalModel {
        lattice,
        spins,
        rng,
        sigma,
        weight,
        visited,
        stack,
        members,
        clamp_logged,
        ..
    } = model;
    let n = lattice.num_sites();

    let axis = project(spins, sigma, weight, rng);
    let seed = rng.gen_range(0..n);

    visited.iter_mut().for_each(|v| *v = false);
    stack.clear();
    members.clear();
    visited[seed] = true;
    stack.push(seed);

    while let Some(i) = stack.pop() {
        members.push(i);
        for &b in lattice.bonds_at(i) {
            let j = lattice.other_end(b, i);
            if visited[j] {
                continue;
            }
            let bt = lattice.bond_type(b);
            let p = bond_prob(spins, sigma, weight, i, j, couplings[bt], beta, clamp_logged);
            if rng.gen::<f64>() < p {
                visited[j] = true;
                stack.push(j);
            }
        }
    }

    match spins {
        ClassicalSpins::Potts { q, spins } => {
            let v = rng.gen_range(0..*q) as u32;
            for i in members.iter() {
                spins[*i] = v;
            }
        }
        other => {
            for i in members.iter() {
                reflect(other, *i, axis);
            }
        }
    }

    SweepInfo::SingleCluster {
        size: members.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::Lattice;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn sw_preserves_ising_spin_values() {
        let mut model = ClassicalModel::ising(Lattice::square(4, 4), Pcg64::seed_from_u64(11));
        for _ in 0..32 {
            swendsen_wang(&mut model, 2.3, &[1.0, 1.0]);
        }
        if let ClassicalSpins::Ising(s) = &model.spins {
            assert!(s.iter().all(|v| *v == 1 || *v == -1));
        } else {
            unreachable!();
        }
    }

    #[test]
    fn zero_temperature_limit_freezes_into_one_cluster() {
        // At very large beta every satisfied bond activates; an ordered
        // ferromagnet must collapse into a single cluster.
        let lat = Lattice::square(4, 4);
        let spins = ClassicalSpins::Ising(vec![1; lat.num_sites()]);
        let mut model = ClassicalModel::with_spins(lat, spins, Pcg64::seed_from_u64(5));
        let info = swendsen_wang(&mut model, 1e-4, &[1.0, 1.0]);
        match info {
            SweepInfo::Clusters { num_clusters, .. } => assert_eq!(num_clusters, 1),
            _ => unreachable!(),
        }
    }

    #[test]
    fn wolff_flips_a_nonempty_cluster() {
        let mut model = ClassicalModel::ising(Lattice::chain(16), Pcg64::seed_from_u64(2));
        let before: Vec<i8> = match &model.spins {
            ClassicalSpins::Ising(s) => s.clone(),
            _ => unreachable!(),
        };
        let info = wolff(&mut model, 1.5, &[1.0]);
        let size = match info {
            SweepInfo::SingleCluster { size } => size,
            _ => unreachable!(),
        };
        assert!(size >= 1);
        let after = match &model.spins {
            ClassicalSpins::Ising(s) => s.clone(),
            _ => unreachable!(),
        };
        let flipped = before
            .iter()
            .zip(after.iter())
            .filter(|(a, b)| a != b)
            .count();
        assert_eq!(flipped, size);
    }

    #[test]
    fn potts_sw_keeps_states_in_range() {
        let mut model = ClassicalModel::potts(Lattice::triangular(4, 4), 3, Pcg64::seed_from_u64(9));
        for _ in 0..16 {
            swendsen_wang(&mut model, 0.8, &[1.0, 1.0, 1.0]);
        }
        if let ClassicalSpins::Potts { q, spins } = &model.spins {
            assert!(spins.iter().all(|s| (*s as usize) < *q));
        } else {
            unreachable!();
        }
    }

    #[test]
    fn clock_reflection_is_an_involution() {
        let mut model = ClassicalModel::clock(Lattice::chain(6), 8, Pcg64::seed_from_u64(3));
        let before = match &model.spins {
            ClassicalSpins::Clock { spins, .. } => spins.clone(),
            _ => unreachable!(),
        };
        let axis = Axis::Rot(5);
        for i in 0..before.len() {
            reflect(&mut model.spins, i, axis);
            reflect(&mut model.spins, i, axis);
        }
        match &model.spins {
            ClassicalSpins::Clock { spins, .. } => assert_eq!(*spins, before),
            _ => unreachable!(),
        }
    }
}
