//! Loop elements and the time-ordered operator string.

use smallvec::{smallvec, SmallVec};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

use crate::errors::SpinError;

/// The closed set of loop-element kinds.
///
/// Each kind is a fixed graph fragment joining two incoming and two
/// outgoing time legs:
/// - `Cut` leaves the two time sides independent,
/// - `FmLink`/`AfLink` fuse the lower legs and the upper legs pairwise,
/// - `Vertex` fuses all four legs into one loop,
/// - `Cross` swaps which upper leg continues which lower leg.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum LoopKind {
    /// World-line cut on a single sub-spin (transverse field).
    Cut,
    /// Horizontal link compatible with parallel legs.
    FmLink,
    /// Horizontal link compatible with anti-parallel legs.
    AfLink,
    /// Four-leg fusion (Ising-like freezing).
    Vertex,
    /// Diagonal-crossing link compatible with parallel legs.
    Cross,
}

/// One local operator in the string.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct LoopOp {
    /// Graph fragment kind.
    pub kind: LoopKind,
    /// Whether the operator currently acts diagonally.
    pub diagonal: bool,
    /// Imaginary-time position in [0, 1).
    pub time: f64,
    /// Bond index for two-site kinds, site index for `Cut`.
    pub space: usize,
    /// Global sub-spin indices of the touched world lines.
    pub subspins: SmallVec<[usize; 2]>,
    /// Union-find node of the loop entering from below; rebuilt each sweep.
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub bottom: usize,
    /// Union-find node of the loop leaving above; rebuilt each sweep.
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub top: usize,
}

impl LoopOp {
    /// A diagonal single-site cut.
    pub fn cut(time: f64, site: usize, subspin: usize) -> Self {
        LoopOp {
            kind: LoopKind::Cut,
            diagonal: true,
            time,
            space: site,
            subspins: smallvec![subspin],
            bottom: 0,
            top: 0,
        }
    }

    /// A diagonal two-site loop element on one sub-spin pair.
    pub fn link(kind: LoopKind, time: f64, bond: usize, a: usize, b: usize) -> Self {
        LoopOp {
            kind,
            diagonal: true,
            time,
            space: bond,
            subspins: smallvec![a, b],
            bottom: 0,
            top: 0,
        }
    }

    /// Apply the operator to a propagating basis state: off-diagonal
    /// operators flip every world line they touch.
    pub fn apply(&self, state: &mut [i8]) {
        if !self.diagonal {
            for s in self.subspins.iter() {
                state[*s] = -state[*s];
            }
        }
    }
}

/// Dense, τ-ordered sequence of loop operators.
///
/// Grown and shrunk every sweep; the buffer is reused.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct OperatorString {
    pub(crate) ops: Vec<LoopOp>,
}

impl OperatorString {
    /// An empty string.
    pub fn new() -> Self {
        OperatorString::default()
    }

    /// Number of operators.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True when no operators are present.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Iterate in τ order.
    pub fn iter(&self) -> std::slice::Iter<'_, LoopOp> {
        self.ops.iter()
    }

    /// Iterate mutably in τ order.
    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, LoopOp> {
        self.ops.iter_mut()
    }

    /// Check time ordering, τ range, leg compatibility of diagonal links,
    /// and τ-periodic state consistency.
    pub fn verify(&self, state: &[i8]) -> Result<(), SpinError> {
        let mut prop = state.to_vec();
        let mut last = -1.0;
        for (p, op) in self.ops.iter().enumerate() {
            if !(0.0..1.0).contains(&op.time) {
                return Err(SpinError::InternalConsistency(format!(
                    "operator {} at time {} outside [0, 1)",
                    p, op.time
                )));
            }
            if op.time <= last {
                return Err(SpinError::InternalConsistency(format!(
                    "operator {} breaks time ordering",
                    p
                )));
            }
            last = op.time;
            if op.subspins.iter().any(|s| *s >= prop.len()) {
                return Err(SpinError::InternalConsistency(format!(
                    "operator {} touches an unknown sub-spin",
                    p
                )));
            }
            let compatible = match op.kind {
                LoopKind::Cut => true,
                LoopKind::AfLink => prop[op.subspins[0]] != prop[op.subspins[1]],
                LoopKind::FmLink => prop[op.subspins[0]] == prop[op.subspins[1]],
                // A crossing is diagonal on parallel legs; flipped to the
                // exchange configuration its legs are anti-parallel.
                LoopKind::Cross => {
                    if op.diagonal {
                        prop[op.subspins[0]] == prop[op.subspins[1]]
                    } else {
                        prop[op.subspins[0]] != prop[op.subspins[1]]
                    }
                }
                // Vertex compatibility depends on the coupling regime and is
                // checked at insertion time only.
                LoopKind::Vertex => op.diagonal,
            };
            if !compatible {
                return Err(SpinError::InternalConsistency(format!(
                    "operator {} ({:?}) incompatible with the propagated state",
                    p, op.kind
                )));
            }
            op.apply(&mut prop);
        }
        if prop != state {
            return Err(SpinError::InternalConsistency(
                "operator string is not τ-periodic".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_a_periodic_string() {
        let state = vec![1, -1];
        let mut string = OperatorString::new();
        string.ops.push(LoopOp::link(LoopKind::AfLink, 0.25, 0, 0, 1));
        let mut swap = LoopOp::link(LoopKind::AfLink, 0.5, 0, 0, 1);
        swap.diagonal = false;
        string.ops.push(swap);
        let mut swap_back = LoopOp::link(LoopKind::AfLink, 0.75, 0, 0, 1);
        swap_back.diagonal = false;
        string.ops.push(swap_back);
        assert!(string.verify(&state).is_ok());
    }

    #[test]
    fn verify_rejects_unbalanced_offdiagonals() {
        let state = vec![1, -1];
        let mut string = OperatorString::new();
        let mut swap = LoopOp::link(LoopKind::AfLink, 0.5, 0, 0, 1);
        swap.diagonal = false;
        string.ops.push(swap);
        assert!(string.verify(&state).is_err());
    }

    #[test]
    fn verify_accepts_offdiagonal_crossings() {
        let state = vec![1, -1];
        let mut string = OperatorString::new();
        let mut cross = LoopOp::link(LoopKind::Cross, 0.3, 0, 0, 1);
        cross.diagonal = false;
        string.ops.push(cross);
        let mut cross_back = LoopOp::link(LoopKind::Cross, 0.6, 0, 0, 1);
        cross_back.diagonal = false;
        string.ops.push(cross_back);
        assert!(string.verify(&state).is_ok());
        // Diagonal crossings still demand parallel legs.
        let mut string = OperatorString::new();
        string.ops.push(LoopOp::link(LoopKind::Cross, 0.3, 0, 0, 1));
        assert!(string.verify(&state).is_err());
    }

    #[test]
    fn verify_rejects_incompatible_link() {
        let state = vec![1, 1];
        let mut string = OperatorString::new();
        string.ops.push(LoopOp::link(LoopKind::AfLink, 0.1, 0, 0, 1));
        assert!(string.verify(&state).is_err());
    }

    #[test]
    fn verify_rejects_time_disorder() {
        let state = vec![1];
        let mut string = OperatorString::new();
        string.ops.push(LoopOp::cut(0.5, 0, 0));
        string.ops.push(LoopOp::cut(0.25, 0, 0));
        assert!(string.verify(&state).is_err());
    }
}
