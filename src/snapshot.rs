//! Versioned snapshots of the model state.
//!
//! Layout: a 4-byte magic, a little-endian `u32` format version, then a
//! CBOR body with the spins (or sub-spins plus operator string). The
//! parameter map travels alongside the snapshot and is used to rebuild
//! the lattice on restore; the format is not bit-critical.

use std::io::{Read, Write};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::classical::ClassicalSpins;
use crate::errors::SpinError;
use crate::model::{build_model, Couplings, DefaultModel, Model, UpdateMethod};
use crate::params::Parameters;
use crate::sse::ops::OperatorString;

const MAGIC: [u8; 4] = *b"SPMC";
const VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
enum Body {
    Classical {
        spins: ClassicalSpins,
    },
    Quantum {
        twos: usize,
        subspins: Vec<i8>,
        ops: OperatorString,
    },
}

/// Write a snapshot of the model state.
pub fn write_snapshot<R: Rng, W: Write>(model: &Model<R>, mut writer: W) -> Result<(), SpinError> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    let body = match model {
        Model::Classical(m) => Body::Classical {
            spins: m.spins().clone(),
        },
        Model::Quantum(m) => Body::Quantum {
            twos: m.spin_multiplicity(),
            subspins: m.subspins().to_vec(),
            ops: m.operator_string().clone(),
        },
    };
    serde_cbor::to_writer(&mut writer, &body)
        .map_err(|e| SpinError::SnapshotFormat(e.to_string()))
}

/// Rebuild a model from its parameter map and overwrite its state from a
/// snapshot stream.
pub fn read_snapshot<R: Read>(
    params: &Parameters,
    mut reader: R,
) -> Result<(DefaultModel, Couplings, UpdateMethod), SpinError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(SpinError::SnapshotFormat("bad magic".to_string()));
    }
    let mut version = [0u8; 4];
    reader.read_exact(&mut version)?;
    let version = u32::from_le_bytes(version);
    if version != VERSION {
        return Err(SpinError::SnapshotFormat(format!(
            "unsupported version {}",
            version
        )));
    }
    let body: Body =
        serde_cbor::from_reader(reader).map_err(|e| SpinError::SnapshotFormat(e.to_string()))?;

    let (mut model, couplings, update) = build_model(params)?;
    match (&mut model, body) {
        (Model::Classical(m), Body::Classical { spins }) => {
            if spin_count(&spins) != m.lattice().num_sites() {
                return Err(SpinError::SnapshotFormat(
                    "spin count does not match the lattice".to_string(),
                ));
            }
            m.spins = spins;
        }
        (
            Model::Quantum(m),
            Body::Quantum {
                twos,
                subspins,
                ops,
            },
        ) => {
            if twos != m.spin_multiplicity() || subspins.len() != m.num_subspins() {
                return Err(SpinError::SnapshotFormat(
                    "sub-spin layout does not match the parameters".to_string(),
                ));
            }
            ops.verify(&subspins)?;
            m.subspins = subspins;
            m.ops = ops;
        }
        _ => {
            return Err(SpinError::SnapshotFormat(
                "snapshot does not match the model kind".to_string(),
            ))
        }
    }
    Ok((model, couplings, update))
}

fn spin_count(spins: &ClassicalSpins) -> usize {
    match spins {
        ClassicalSpins::Ising(s) => s.len(),
        ClassicalSpins::Potts { spins, .. } => spins.len(),
        ClassicalSpins::Clock { spins, .. } => spins.len(),
        ClassicalSpins::Xy(s) => s.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(params: &Parameters) {
        let (mut model, couplings, update) = build_model(params).unwrap();
        for _ in 0..20 {
            model.sweep(update, 1.3, &couplings).unwrap();
        }
        let mut buf = vec![];
        write_snapshot(&model, &mut buf).unwrap();
        let (restored, _, _) = read_snapshot(params, &buf[..]).unwrap();
        match (&model, &restored) {
            (Model::Classical(a), Model::Classical(b)) => match (a.spins(), b.spins()) {
                (ClassicalSpins::Ising(x), ClassicalSpins::Ising(y)) => assert_eq!(x, y),
                (
                    ClassicalSpins::Potts { spins: x, .. },
                    ClassicalSpins::Potts { spins: y, .. },
                ) => assert_eq!(x, y),
                _ => unreachable!(),
            },
            (Model::Quantum(a), Model::Quantum(b)) => {
                assert_eq!(a.subspins(), b.subspins());
                assert_eq!(a.operator_string().len(), b.operator_string().len());
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn classical_roundtrip() {
        roundtrip(
            &Parameters::new()
                .with("Model", "Ising")
                .with("Lattice", "square")
                .with("L", 4usize)
                .with("Seed", 5i64),
        );
    }

    #[test]
    fn quantum_roundtrip() {
        roundtrip(
            &Parameters::new()
                .with("Model", "QuantumXXZ")
                .with("Lattice", "chain")
                .with("L", 6usize)
                .with("Jxy", 1.0)
                .with("Seed", 5i64),
        );
    }

    #[test]
    fn rejects_bad_magic() {
        let params = Parameters::new()
            .with("Model", "Ising")
            .with("Lattice", "chain")
            .with("L", 4usize);
        let buf = b"XXXX\x01\x00\x00\x00";
        assert!(read_snapshot(&params, &buf[..]).is_err());
    }
}
