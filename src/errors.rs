use thiserror::Error;

/// Errors surfaced by model construction, sweeps, and snapshots.
#[derive(Debug, Error)]
pub enum SpinError {
    /// A parameter is missing or has the wrong shape; fatal to the run.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Offending key in the parameter map.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A data-structure invariant was violated; indicates a bug.
    #[error("internal consistency: {0}")]
    InternalConsistency(String),

    /// Snapshot stream is not in the expected format.
    #[error("snapshot format: {0}")]
    SnapshotFormat(String),

    /// I/O failure while reading or writing a snapshot.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SpinError {
    pub(crate) fn param<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        SpinError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
