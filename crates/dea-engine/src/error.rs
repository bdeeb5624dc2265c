use dea_solver::SolutionStatus;
use thiserror::Error;

/// Fatal conditions on the peer set, raised before any program is solved
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeaError {
    #[error("Peer set is empty")]
    EmptyPeerSet,
    #[error("Malformed input for unit {unit}: {reason}")]
    MalformedInput { unit: String, reason: String },
    #[error("Unit index {index} is outside a peer set of {len} units")]
    UnknownUnit { index: usize, len: usize },
}

impl DeaError {
    pub(crate) fn malformed(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        DeaError::MalformedInput {
            unit: unit.into(),
            reason: reason.into(),
        }
    }
}

/// Why a single (unit, mode) solve produced no score. Recovered locally, never fatal.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SolverUndetermined {
    #[error("solver returned {0}")]
    Status(SolutionStatus),
    #[error("objective {0} is outside (0, 1]")]
    OutOfRange(f64),
}
