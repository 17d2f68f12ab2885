//! The loop update: diagonal operator-string evolution, graph
//! decomposition into loops, and the cluster flip.

use rand::Rng;

use crate::errors::SpinError;
use crate::lattice::Lattice;
use crate::model::{Couplings, SweepInfo};
use crate::sse::model::QuantumModel;
use crate::sse::ops::{LoopKind, LoopOp};
use crate::unionfind::WeightSum;

/// Where a diagonal insertion candidate lands.
#[derive(Copy, Clone, Debug)]
enum TermTarget {
    /// Bonds of one type; candidates pick a bond and one sub-spin pair.
    Bond(usize),
    /// Sites of one type; candidates pick a site and one sub-spin.
    Site(usize),
}

/// One Poisson insertion category of the decomposed Hamiltonian.
#[derive(Copy, Clone, Debug)]
struct Term {
    kind: LoopKind,
    /// Leg compatibility: parallel, anti-parallel, or unconstrained.
    want_parallel: Option<bool>,
    target: TermTarget,
    /// Total insertion rate of the category per unit β.
    rate: f64,
}

/// Loop-element weights per sub-spin pair for one bond type, and the
/// diagonal offset of the pair Hamiltonian
/// `jz σσ/4 + (jxy/2)(flip-flop)`.
///
/// Antiferromagnetic `jxy` is gauged to ferromagnetic by the sublattice
/// rotation, valid on bipartite lattices.
fn bond_elements(jz: f64, jxy: f64) -> ([(LoopKind, bool, f64); 2], f64) {
    let axy = jxy.abs();
    if jz.abs() <= axy {
        // XY-like: exchange split between anti-parallel and parallel links.
        (
            [
                (LoopKind::AfLink, false, (axy + jz) / 4.0),
                (LoopKind::Cross, true, (axy - jz) / 4.0),
            ],
            axy / 4.0,
        )
    } else if jz > 0.0 {
        // AFM-Ising-like: exchange link plus anti-parallel freezing.
        (
            [
                (LoopKind::AfLink, false, axy / 2.0),
                (LoopKind::Vertex, false, (jz - axy) / 2.0),
            ],
            jz / 4.0,
        )
    } else {
        // FM-Ising-like: crossing link plus parallel freezing.
        (
            [
                (LoopKind::Cross, true, axy / 2.0),
                (LoopKind::Vertex, true, (-jz - axy) / 2.0),
            ],
            -jz / 4.0,
        )
    }
}

/// Total diagonal offset `E₀` of the decomposition; the zero of energy for
/// the operator-count estimator.
pub(crate) fn energy_offset(lattice: &Lattice, couplings: &Couplings, twos: usize) -> f64 {
    let pair_mult = (twos * twos) as f64;
    let mut e0 = 0.0;
    for bt in 0..lattice.num_bond_types() {
        let (_, offset) = bond_elements(couplings.j[bt], couplings.jxy[bt]);
        e0 += offset * pair_mult * lattice.num_bonds_of_type(bt) as f64;
    }
    for st in 0..lattice.num_site_types() {
        let gamma = couplings.gamma[st].abs();
        e0 += 0.5 * gamma * twos as f64 * lattice.sites_of_type(st).len() as f64;
    }
    e0
}

fn build_terms(
    lattice: &Lattice,
    couplings: &Couplings,
    twos: usize,
) -> (Vec<Term>, Vec<f64>, f64) {
    let pair_mult = (twos * twos) as f64;
    let mut terms = vec![];
    for bt in 0..lattice.num_bond_types() {
        let (elements, _) = bond_elements(couplings.j[bt], couplings.jxy[bt]);
        let nbonds = lattice.num_bonds_of_type(bt) as f64;
        for (kind, parallel, weight) in elements.iter() {
            if *weight > 0.0 && nbonds > 0.0 {
                terms.push(Term {
                    kind: *kind,
                    want_parallel: Some(*parallel),
                    target: TermTarget::Bond(bt),
                    rate: weight * nbonds * pair_mult,
                });
            }
        }
    }
    for st in 0..lattice.num_site_types() {
        let gamma = couplings.gamma[st].abs();
        let nsites = lattice.sites_of_type(st).len() as f64;
        if gamma > 0.0 && nsites > 0.0 {
            terms.push(Term {
                kind: LoopKind::Cut,
                want_parallel: None,
                target: TermTarget::Site(st),
                rate: 0.5 * gamma * nsites * twos as f64,
            });
        }
    }
    let mut cum = Vec::with_capacity(terms.len());
    let mut total = 0.0;
    for t in terms.iter() {
        total += t.rate;
        cum.push(total);
    }
    (terms, cum, total)
}

fn draw_gap<R: Rng>(rng: &mut R, rate: f64) -> f64 {
    -(1.0 - rng.gen::<f64>()).ln() / rate
}

/// Attempt one diagonal insertion at `time` against the propagated state.
fn try_insert<R: Rng>(
    time: f64,
    terms: &[Term],
    cum: &[f64],
    total: f64,
    lattice: &Lattice,
    twos: usize,
    prop: &[i8],
    out: &mut Vec<LoopOp>,
    rng: &mut R,
) {
    let u = rng.gen::<f64>() * total;
    let idx = cum.partition_point(|c| *c <= u).min(terms.len() - 1);
    let term = &terms[idx];
    match term.target {
        TermTarget::Bond(bt) => {
            let bonds = lattice.bonds_of_type(bt);
            let bond = bonds[rng.gen_range(0..bonds.len())];
            let (i, j) = lattice.bond(bond);
            let a = i * twos + rng.gen_range(0..twos);
            let b = j * twos + rng.gen_range(0..twos);
            let compatible = match term.want_parallel {
                Some(true) => prop[a] == prop[b],
                Some(false) => prop[a] != prop[b],
                None => true,
            };
            if compatible {
                out.push(LoopOp::link(term.kind, time, bond, a, b));
            }
        }
        TermTarget::Site(st) => {
            let sites = lattice.sites_of_type(st);
            let site = sites[rng.gen_range(0..sites.len())];
            let a = site * twos + rng.gen_range(0..twos);
            out.push(LoopOp::cut(time, site, a));
        }
    }
}

/// One full loop sweep over a quantum model.
pub(crate) fn loop_sweep<R: Rng>(
    model: &mut QuantumModel<R>,
    temperature: f64,
    couplings: &Couplings,
) -> Result<SweepInfo, SpinError> {
    let beta = 1.0 / temperature;
    let QuantumModel {
        lattice,
        twos,
        subspins,
        ops,
        rng,
        uf,
        scratch_ops,
        prop,
        active,
    } = model;
    let twos = *twos;
    let nsub = subspins.len();

    // Phase 1: drop diagonal operators, keep off-diagonal ones, and merge
    // in fresh diagonal candidates from a Poisson stream in τ order.
    let (terms, cum, total) = build_terms(lattice, couplings, twos);
    prop.clear();
    prop.extend_from_slice(subspins);
    std::mem::swap(&mut ops.ops, scratch_ops);
    ops.ops.clear();

    let event_rate = beta * total;
    let mut tau = if total > 0.0 {
        draw_gap(rng, event_rate)
    } else {
        f64::INFINITY
    };
    for op in scratch_ops.drain(..) {
        while tau < op.time {
            try_insert(tau, &terms, &cum, total, lattice, twos, prop, &mut ops.ops, rng);
            tau += draw_gap(rng, event_rate);
        }
        if op.diagonal {
            continue;
        }
        op.apply(prop);
        ops.ops.push(op);
    }
    while tau < 1.0 {
        try_insert(tau, &terms, &cum, total, lattice, twos, prop, &mut ops.ops, rng);
        tau += draw_gap(rng, event_rate);
    }

    // Phase 2: graph decomposition. One node per τ=0 world-line segment
    // carrying its sub-spin value, two per operator; fuse according to the
    // fixed connectivity of each kind, then close the τ boundary.
    uf.reset(0);
    for s in subspins.iter() {
        uf.add_node_with(WeightSum(*s as f64));
    }
    active.clear();
    active.extend(0..nsub);
    for op in ops.iter_mut() {
        op.bottom = uf.add_node();
        op.top = uf.add_node();
        match op.kind {
            LoopKind::Cut => {
                let s = op.subspins[0];
                uf.unify(op.bottom, active[s]);
                active[s] = op.top;
            }
            LoopKind::FmLink | LoopKind::AfLink => {
                let (a, b) = (op.subspins[0], op.subspins[1]);
                uf.unify(op.bottom, active[a]);
                uf.unify(op.bottom, active[b]);
                active[a] = op.top;
                active[b] = op.top;
            }
            LoopKind::Vertex => {
                let (a, b) = (op.subspins[0], op.subspins[1]);
                uf.unify(op.bottom, active[a]);
                uf.unify(op.bottom, active[b]);
                uf.unify(op.bottom, op.top);
                active[a] = op.top;
                active[b] = op.top;
            }
            LoopKind::Cross => {
                let (a, b) = (op.subspins[0], op.subspins[1]);
                uf.unify(op.bottom, active[a]);
                uf.unify(op.top, active[b]);
                active[a] = op.top;
                active[b] = op.bottom;
            }
        }
    }
    for (i, node) in active.iter().enumerate() {
        uf.unify(*node, i);
    }
    uf.clusterize(rng);

    // Phase 3: flip τ=0 sub-spins by their loop, and keep each operator's
    // diagonality consistent with the flips of its two loops. A Vertex has
    // one loop on both legs, so it never toggles.
    for (i, s) in subspins.iter_mut().enumerate() {
        if uf.cluster_flip(uf.cluster_id(i)) {
            *s = -*s;
        }
    }
    for op in ops.iter_mut() {
        let below = uf.cluster_flip(uf.cluster_id(op.bottom));
        let above = uf.cluster_flip(uf.cluster_id(op.top));
        if below != above {
            op.diagonal = !op.diagonal;
        }
    }

    #[cfg(debug_assertions)]
    ops.verify(subspins)?;

    Ok(SweepInfo::Loops {
        num_ops: ops.len(),
        num_clusters: uf.num_clusters(),
    })
}
