//! Error types
//!
//! Contact resolution never fails; geometric edge cases fold into the contact
//! classification. What can fail is shot setup, the trajectory log invariants,
//! and settings I/O.

use crate::sim::BodyId;

/// Why a shot could not be started
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetupFault {
    /// The active set must hold exactly one primary body
    PrimaryCount(usize),
    /// A body log holds more than its seed sample
    StaleHistory(BodyId),
    /// The default aim policy needs a shot line that crosses the baseline
    UnreachableAim { angle: f64 },
}

impl std::fmt::Display for SetupFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupFault::PrimaryCount(n) => {
                write!(f, "expected exactly one primary body, found {n}")
            }
            SetupFault::StaleHistory(id) => {
                write!(f, "body {id} has history from a previous shot")
            }
            SetupFault::UnreachableAim { angle } => {
                write!(f, "cannot aim at the reference point along angle {angle} rad")
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("invalid shot setup: {0}")]
    InvalidShotSetup(SetupFault),
    #[error("sample at t={t} appended after t={last}")]
    InvariantViolation { t: f64, last: f64 },
    #[error("cannot roll back the seed sample")]
    EmptyLog,
    #[error("no body with id {0}")]
    UnknownBody(BodyId),
    #[error("settings format error: {0}")]
    Settings(#[from] serde_json::Error),
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_fault_message() {
        let err = SimError::InvalidShotSetup(SetupFault::PrimaryCount(2));
        assert_eq!(
            err.to_string(),
            "invalid shot setup: expected exactly one primary body, found 2"
        );
    }

    #[test]
    fn test_invariant_message() {
        let err = SimError::InvariantViolation { t: 1.0, last: 2.0 };
        assert!(err.to_string().contains("t=1"));
    }
}
