//! # Error Kinds
//!
//! The error kinds from spec section 7, shared by every crate's own
//! `thiserror` enum. Crates do not return `AurigraphError` directly from
//! their public API — each defines its own enum with these kinds as
//! variants (mirroring the teacher workspace's per-crate `CryptoError`,
//! `StorageError`, `FinalityError`, ...) — but this enum is what
//! `node-runtime` maps every crate-local error onto at its outermost
//! boundary, and what the client submission API (spec section 6) reports.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A hint for where a client should retry a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderHint(pub Option<String>);

/// The error kinds from spec section 7.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum AurigraphError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not leader, retry against {0:?}")]
    NotLeader(LeaderHint),

    #[error("overloaded")]
    Overloaded,

    #[error("timeout")]
    Timeout,

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("persistence failure: {0}")]
    PersistenceError(String),

    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("cryptographic tamper detected")]
    Tampered,

    #[error("unknown key version {0}")]
    UnknownKeyVersion(u32),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("consensus safety violation: {0}")]
    SafetyViolation(String),

    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl AurigraphError {
    /// Whether a caller may retry this error without changing anything
    /// about the request (spec section 7's "retriable" classification).
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            AurigraphError::Overloaded
                | AurigraphError::Timeout
                | AurigraphError::Transient(_)
                | AurigraphError::NotLeader(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_classification() {
        assert!(AurigraphError::Overloaded.is_retriable());
        assert!(AurigraphError::Timeout.is_retriable());
        assert!(!AurigraphError::InvalidInput("x".into()).is_retriable());
        assert!(!AurigraphError::Tampered.is_retriable());
    }
}
