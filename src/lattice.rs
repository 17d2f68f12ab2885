use itertools::iproduct;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A finite lattice with toroidal boundary conditions.
///
/// Immutable after construction. Bond types index the lattice direction
/// (so anisotropic couplings can be given per direction), site types are
/// the bipartite parity where the lattice is bipartite with even extents.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Lattice {
    dim: usize,
    extents: Vec<usize>,
    neighbors: Vec<Vec<usize>>,
    bond_source: Vec<usize>,
    bond_target: Vec<usize>,
    bond_type: Vec<usize>,
    site_type: Vec<usize>,
    bonds_of_type: Vec<Vec<usize>>,
    sites_of_type: Vec<Vec<usize>>,
    site_bonds: Vec<Vec<usize>>,
}

impl Lattice {
    /// Periodic chain of `l` sites.
    pub fn chain(l: usize) -> Self {
        let mut b = LatticeBuilder::new(1, vec![l], 1, true);
        for s in 0..l {
            b.bond(s, (s + 1) % l, 0);
        }
        b.finish()
    }

    /// Square lattice of `l` by `w` sites; x bonds are type 0, y bonds type 1.
    pub fn square(l: usize, w: usize) -> Self {
        let mut b = LatticeBuilder::new(2, vec![l, w], 2, true);
        for (y, x) in iproduct!(0..w, 0..l) {
            let s = x + l * y;
            b.bond(s, (x + 1) % l + l * y, 0);
            b.bond(s, x + l * ((y + 1) % w), 1);
        }
        b.finish()
    }

    /// Triangular lattice: a square lattice plus the (+x, +y) diagonal (type 2).
    pub fn triangular(l: usize, w: usize) -> Self {
        let mut b = LatticeBuilder::new(2, vec![l, w], 3, false);
        for (y, x) in iproduct!(0..w, 0..l) {
            let s = x + l * y;
            b.bond(s, (x + 1) % l + l * y, 0);
            b.bond(s, x + l * ((y + 1) % w), 1);
            b.bond(s, (x + 1) % l + l * ((y + 1) % w), 2);
        }
        b.finish()
    }

    /// Simple cubic lattice; bond types 0..3 are the x, y, z directions.
    pub fn cubic(l: usize, w: usize, h: usize) -> Self {
        let mut b = LatticeBuilder::new(3, vec![l, w, h], 3, true);
        for (z, y, x) in iproduct!(0..h, 0..w, 0..l) {
            let s = x + l * (y + w * z);
            b.bond(s, (x + 1) % l + l * (y + w * z), 0);
            b.bond(s, x + l * ((y + 1) % w + w * z), 1);
            b.bond(s, x + l * (y + w * ((z + 1) % h)), 2);
        }
        b.finish()
    }

    /// Spatial dimension.
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Extent along each dimension.
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Number of sites.
    pub fn num_sites(&self) -> usize {
        self.neighbors.len()
    }

    /// Number of bonds.
    pub fn num_bonds(&self) -> usize {
        self.bond_source.len()
    }

    /// Number of distinct bond types.
    pub fn num_bond_types(&self) -> usize {
        self.bonds_of_type.len()
    }

    /// Number of distinct site types.
    pub fn num_site_types(&self) -> usize {
        self.sites_of_type.len()
    }

    /// Neighbors of a site, one entry per incident bond.
    pub fn neighbors(&self, site: usize) -> &[usize] {
        &self.neighbors[site]
    }

    /// Endpoints of a bond.
    pub fn bond(&self, bond: usize) -> (usize, usize) {
        (self.bond_source[bond], self.bond_target[bond])
    }

    /// Type index of a bond.
    pub fn bond_type(&self, bond: usize) -> usize {
        self.bond_type[bond]
    }

    /// Type index of a site.
    pub fn site_type(&self, site: usize) -> usize {
        self.site_type[site]
    }

    /// All bonds of a given type.
    pub fn bonds_of_type(&self, t: usize) -> &[usize] {
        &self.bonds_of_type[t]
    }

    /// All sites of a given type.
    pub fn sites_of_type(&self, t: usize) -> &[usize] {
        &self.sites_of_type[t]
    }

    /// Number of bonds of a given type.
    pub fn num_bonds_of_type(&self, t: usize) -> usize {
        self.bonds_of_type[t].len()
    }

    /// Bonds incident to a site, aligned with `neighbors`.
    pub fn bonds_at(&self, site: usize) -> &[usize] {
        &self.site_bonds[site]
    }

    /// The endpoint of `bond` that is not `site`.
    pub fn other_end(&self, bond: usize, site: usize) -> usize {
        let (s, t) = self.bond(bond);
        if s == site {
            t
        } else {
            s
        }
    }
}

struct LatticeBuilder {
    dim: usize,
    extents: Vec<usize>,
    nsites: usize,
    neighbors: Vec<Vec<usize>>,
    bond_source: Vec<usize>,
    bond_target: Vec<usize>,
    bond_type: Vec<usize>,
    ntypes: usize,
    two_colorable: bool,
}

impl LatticeBuilder {
    fn new(dim: usize, extents: Vec<usize>, ntypes: usize, two_colorable: bool) -> Self {
        let nsites = extents.iter().product();
        LatticeBuilder {
            dim,
            extents,
            nsites,
            neighbors: vec![vec![]; nsites],
            bond_source: vec![],
            bond_target: vec![],
            bond_type: vec![],
            ntypes,
            two_colorable,
        }
    }

    fn bond(&mut self, a: usize, b: usize, t: usize) {
        self.neighbors[a].push(b);
        self.neighbors[b].push(a);
        self.bond_source.push(a);
        self.bond_target.push(b);
        self.bond_type.push(t);
    }

    fn finish(self) -> Lattice {
        // Bipartite parity needs every extent even; otherwise one site type.
        let bipartite = self.two_colorable && self.extents.iter().all(|e| e % 2 == 0);
        let site_type: Vec<usize> = (0..self.nsites)
            .map(|s| {
                if bipartite {
                    let mut rem = s;
                    let mut parity = 0;
                    for e in &self.extents {
                        parity += rem % e;
                        rem /= e;
                    }
                    parity % 2
                } else {
                    0
                }
            })
            .collect();
        let nsitetypes = if bipartite { 2 } else { 1 };

        let mut bonds_of_type = vec![vec![]; self.ntypes];
        for (b, t) in self.bond_type.iter().enumerate() {
            bonds_of_type[*t].push(b);
        }
        let mut sites_of_type = vec![vec![]; nsitetypes];
        for (s, t) in site_type.iter().enumerate() {
            sites_of_type[*t].push(s);
        }
        let mut site_bonds = vec![vec![]; self.nsites];
        for b in 0..self.bond_source.len() {
            site_bonds[self.bond_source[b]].push(b);
            site_bonds[self.bond_target[b]].push(b);
        }

        Lattice {
            dim: self.dim,
            extents: self.extents,
            neighbors: self.neighbors,
            bond_source: self.bond_source,
            bond_target: self.bond_target,
            bond_type: self.bond_type,
            site_type,
            bonds_of_type,
            sites_of_type,
            site_bonds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_invariants(lat: &Lattice) {
        let n = lat.num_sites();
        let mut incident = vec![0usize; n];
        for b in 0..lat.num_bonds() {
            let (s, t) = lat.bond(b);
            assert!(s < n && t < n);
            assert!(lat.bond_type(b) < lat.num_bond_types());
            incident[s] += 1;
            incident[t] += 1;
            assert!(lat.neighbors(s).contains(&t));
            assert!(lat.neighbors(t).contains(&s));
        }
        // Every neighbor entry corresponds to exactly one bond endpoint.
        for s in 0..n {
            assert_eq!(lat.neighbors(s).len(), incident[s]);
        }
        let per_type: usize = (0..lat.num_bond_types())
            .map(|t| lat.num_bonds_of_type(t))
            .sum();
        assert_eq!(per_type, lat.num_bonds());
    }

    #[test]
    fn chain_counts() {
        let lat = Lattice::chain(8);
        assert_eq!(lat.num_sites(), 8);
        assert_eq!(lat.num_bonds(), 8);
        assert_eq!(lat.num_bond_types(), 1);
        check_invariants(&lat);
    }

    #[test]
    fn square_counts() {
        let lat = Lattice::square(4, 6);
        assert_eq!(lat.num_sites(), 24);
        assert_eq!(lat.num_bonds(), 48);
        assert_eq!(lat.num_bond_types(), 2);
        assert_eq!(lat.num_bonds_of_type(0), 24);
        assert!(lat.neighbors(0).len() == 4);
        check_invariants(&lat);
    }

    #[test]
    fn triangular_counts() {
        let lat = Lattice::triangular(4, 4);
        assert_eq!(lat.num_bonds(), 48);
        assert_eq!(lat.num_bond_types(), 3);
        assert_eq!(lat.neighbors(5).len(), 6);
        assert_eq!(lat.num_site_types(), 1);
        check_invariants(&lat);
    }

    #[test]
    fn cubic_counts() {
        let lat = Lattice::cubic(2, 4, 4);
        assert_eq!(lat.num_sites(), 32);
        assert_eq!(lat.num_bonds(), 96);
        check_invariants(&lat);
    }

    #[test]
    fn bipartite_parity() {
        let lat = Lattice::square(4, 4);
        assert_eq!(lat.num_site_types(), 2);
        for b in 0..lat.num_bonds() {
            let (s, t) = lat.bond(b);
            assert_ne!(lat.site_type(s), lat.site_type(t));
        }
    }
}
