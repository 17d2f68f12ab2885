use rand::Rng;

/// Per-cluster aggregate carried by union-find roots.
///
/// The reduction is fixed at compile time so `unify` monomorphizes without
/// dynamic dispatch.
pub trait Payload: Copy + Default {
    /// Combine the payloads of two roots being merged.
    fn merge(a: Self, b: Self) -> Self;
}

impl Payload for () {
    fn merge(_: (), _: ()) {}
}

/// Additive weight: projected spin weight of a cluster, or the sub-spin sum
/// along a loop.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct WeightSum(
    /// Accumulated weight.
    pub f64,
);

impl Payload for WeightSum {
    fn merge(a: WeightSum, b: WeightSum) -> WeightSum {
        WeightSum(a.0 + b.0)
    }
}

/// Disjoint-set forest with union by size, path compression, and a
/// per-root payload.
///
/// Rebuilt every sweep; `reset` keeps the allocations. After `clusterize`
/// every node points at its root directly, roots carry fresh 0-based
/// cluster ids, and each cluster holds an independently drawn flip.
#[derive(Clone, Debug, Default)]
pub struct UnionFind<P: Payload> {
    parent: Vec<u32>,
    size: Vec<u32>,
    payload: Vec<P>,
    cluster: Vec<u32>,
    flips: Vec<bool>,
    cluster_roots: Vec<u32>,
    clusterized: bool,
}

impl<P: Payload> UnionFind<P> {
    /// An empty forest.
    pub fn new() -> Self {
        UnionFind {
            parent: vec![],
            size: vec![],
            payload: vec![],
            cluster: vec![],
            flips: vec![],
            cluster_roots: vec![],
            clusterized: false,
        }
    }

    /// Drop all nodes, keeping capacity, and seed `n` fresh singletons.
    pub fn reset(&mut self, n: usize) {
        self.parent.clear();
        self.size.clear();
        self.payload.clear();
        self.cluster.clear();
        self.flips.clear();
        self.cluster_roots.clear();
        self.clusterized = false;
        self.parent.extend(0..n as u32);
        self.size.resize(n, 1);
        self.payload.resize(n, P::default());
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// True when no nodes have been added.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Append a singleton node with the default payload and return its id.
    pub fn add_node(&mut self) -> usize {
        self.add_node_with(P::default())
    }

    /// Append a singleton node carrying `payload`.
    pub fn add_node_with(&mut self, payload: P) -> usize {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        self.size.push(1);
        self.payload.push(payload);
        id as usize
    }

    /// Path-halving root lookup.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] as usize != x {
            let grand = self.parent[self.parent[x] as usize];
            self.parent[x] = grand;
            x = grand as usize;
        }
        x
    }

    /// Merge the clusters of `a` and `b`; no-op if already joined.
    pub fn unify(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big as u32;
        self.size[big] += self.size[small];
        self.payload[big] = P::merge(self.payload[big], self.payload[small]);
    }

    /// Compress every node to one hop, number the clusters, and draw one
    /// Bernoulli(1/2) flip per cluster.
    ///
    /// Idempotent up to the flip draws: cluster ids are assigned in node
    /// order and do not change on a second call.
    pub fn clusterize<R: Rng>(&mut self, rng: &mut R) {
        let n = self.parent.len();
        self.cluster.clear();
        self.cluster.resize(n, u32::MAX);
        self.cluster_roots.clear();
        let mut nclusters = 0u32;
        for x in 0..n {
            let root = self.find(x);
            self.parent[x] = root as u32;
            if self.cluster[root] == u32::MAX {
                self.cluster[root] = nclusters;
                self.cluster_roots.push(root as u32);
                nclusters += 1;
            }
        }
        self.flips.clear();
        self.flips.extend((0..nclusters).map(|_| rng.gen_bool(0.5)));
        self.clusterized = true;
    }

    /// Cluster id of a node; valid after `clusterize`.
    pub fn cluster_id(&self, x: usize) -> usize {
        debug_assert!(self.clusterized);
        self.cluster[self.parent[x] as usize] as usize
    }

    /// Number of clusters found by `clusterize`.
    pub fn num_clusters(&self) -> usize {
        self.cluster_roots.len()
    }

    /// Number of nodes in cluster `c`.
    pub fn cluster_size(&self, c: usize) -> usize {
        self.size[self.cluster_roots[c] as usize] as usize
    }

    /// The flip drawn for cluster `c` by `clusterize`.
    pub fn cluster_flip(&self, c: usize) -> bool {
        self.flips[c]
    }

    /// Consolidated payload of cluster `c`.
    pub fn cluster_payload(&self, c: usize) -> P {
        self.payload[self.cluster_roots[c] as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn unify_and_find() {
        let mut uf = UnionFind::<()>::new();
        uf.reset(6);
        uf.unify(0, 1);
        uf.unify(2, 3);
        uf.unify(1, 3);
        assert_eq!(uf.find(0), uf.find(3));
        assert_ne!(uf.find(0), uf.find(4));
        // unify within a cluster is a no-op
        uf.unify(0, 2);
        assert_eq!(uf.find(1), uf.find(2));
    }

    #[test]
    fn clusterize_assigns_ids_and_one_hop_roots() {
        let mut rng = Pcg64::seed_from_u64(7);
        let mut uf = UnionFind::<()>::new();
        uf.reset(5);
        uf.unify(0, 4);
        uf.unify(1, 2);
        uf.clusterize(&mut rng);
        assert_eq!(uf.num_clusters(), 3);
        assert_eq!(uf.cluster_id(0), uf.cluster_id(4));
        assert_eq!(uf.cluster_id(1), uf.cluster_id(2));
        assert_ne!(uf.cluster_id(0), uf.cluster_id(3));
        // one-hop after clusterize
        for x in 0..5 {
            let r = uf.parent[x] as usize;
            assert_eq!(uf.parent[r] as usize, r);
        }
        // idempotent on ids
        let ids: Vec<usize> = (0..5).map(|x| uf.cluster_id(x)).collect();
        uf.clusterize(&mut rng);
        let ids2: Vec<usize> = (0..5).map(|x| uf.cluster_id(x)).collect();
        assert_eq!(ids, ids2);
    }

    #[test]
    fn payload_reduces_along_merges() {
        let mut rng = Pcg64::seed_from_u64(1);
        let mut uf = UnionFind::<WeightSum>::new();
        uf.reset(0);
        for w in [1.0, 2.0, 4.0, 8.0] {
            uf.add_node_with(WeightSum(w));
        }
        uf.unify(0, 2);
        uf.unify(3, 0);
        uf.clusterize(&mut rng);
        let c = uf.cluster_id(0);
        assert_eq!(uf.cluster_payload(c), WeightSum(13.0));
        assert_eq!(uf.cluster_size(c), 3);
        let lone = uf.cluster_id(1);
        assert_eq!(uf.cluster_payload(lone), WeightSum(2.0));
    }

    #[test]
    fn reset_reuses_without_stale_state() {
        let mut rng = Pcg64::seed_from_u64(3);
        let mut uf = UnionFind::<()>::new();
        uf.reset(4);
        uf.unify(0, 1);
        uf.clusterize(&mut rng);
        uf.reset(2);
        assert_eq!(uf.len(), 2);
        assert_ne!(uf.find(0), uf.find(1));
    }
}
