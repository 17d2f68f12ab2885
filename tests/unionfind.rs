//! Union-find torture tests against a quadratic reference implementation.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use spinmc::unionfind::{UnionFind, WeightSum};

/// O(n) per merge reference: every node stores its cluster label.
struct ReferenceDsu {
    label: Vec<usize>,
}

impl ReferenceDsu {
    fn new(n: usize) -> Self {
        ReferenceDsu {
            label: (0..n).collect(),
        }
    }

    fn unify(&mut self, a: usize, b: usize) {
        let (la, lb) = (self.label[a], self.label[b]);
        if la != lb {
            self.label.iter_mut().for_each(|l| {
                if *l == lb {
                    *l = la;
                }
            });
        }
    }

    fn same(&self, a: usize, b: usize) -> bool {
        self.label[a] == self.label[b]
    }

    fn size_of(&self, a: usize) -> usize {
        let la = self.label[a];
        self.label.iter().filter(|l| **l == la).count()
    }
}

#[test]
fn random_merges_match_the_reference() {
    let mut rng = Pcg64::seed_from_u64(0);
    let n = 300;
    let mut uf = UnionFind::<()>::new();
    uf.reset(n);
    let mut reference = ReferenceDsu::new(n);

    for step in 0..100_000 {
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        if step % 3 == 0 {
            uf.unify(a, b);
            reference.unify(a, b);
        } else {
            assert_eq!(
                uf.find(a) == uf.find(b),
                reference.same(a, b),
                "connectivity diverged at step {}",
                step
            );
        }
    }

    uf.clusterize(&mut rng);
    for x in 0..n {
        assert_eq!(uf.cluster_size(uf.cluster_id(x)), reference.size_of(x));
        for y in 0..n {
            assert_eq!(uf.cluster_id(x) == uf.cluster_id(y), reference.same(x, y));
        }
    }
}

#[test]
fn clusterize_is_idempotent_on_ids() {
    let mut rng = Pcg64::seed_from_u64(42);
    let n = 128;
    let mut uf = UnionFind::<()>::new();
    uf.reset(n);
    for _ in 0..200 {
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        uf.unify(a, b);
    }
    uf.clusterize(&mut rng);
    let ids: Vec<usize> = (0..n).map(|x| uf.cluster_id(x)).collect();
    let sizes: Vec<usize> = (0..uf.num_clusters()).map(|c| uf.cluster_size(c)).collect();
    uf.clusterize(&mut rng);
    assert_eq!(ids, (0..n).map(|x| uf.cluster_id(x)).collect::<Vec<_>>());
    assert_eq!(
        sizes,
        (0..uf.num_clusters())
            .map(|c| uf.cluster_size(c))
            .collect::<Vec<_>>()
    );
}

#[test]
fn cluster_ids_are_dense_and_sizes_sum_to_n() {
    let mut rng = Pcg64::seed_from_u64(9);
    let n = 500;
    let mut uf = UnionFind::<()>::new();
    uf.reset(n);
    for _ in 0..400 {
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        uf.unify(a, b);
    }
    uf.clusterize(&mut rng);
    let nc = uf.num_clusters();
    assert!((0..n).all(|x| uf.cluster_id(x) < nc));
    let total: usize = (0..nc).map(|c| uf.cluster_size(c)).sum();
    assert_eq!(total, n);
}

#[test]
fn payloads_follow_arbitrary_merge_orders() {
    let mut rng = Pcg64::seed_from_u64(5);
    let n = 64;
    let mut uf = UnionFind::<WeightSum>::new();
    uf.reset(0);
    for i in 0..n {
        uf.add_node_with(WeightSum(i as f64));
    }
    for _ in 0..64 {
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        uf.unify(a, b);
    }
    uf.clusterize(&mut rng);
    // Each cluster's payload is the sum of its members' seeds.
    let mut expect = vec![0.0; uf.num_clusters()];
    for i in 0..n {
        expect[uf.cluster_id(i)] += i as f64;
    }
    for c in 0..uf.num_clusters() {
        assert!((uf.cluster_payload(c).0 - expect[c]).abs() < 1e-12);
    }
}
