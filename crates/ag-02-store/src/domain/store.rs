//! Core put/get/batch semantics, independent of the underlying KV engine
//! or cipher (spec section 4.2).

use serde::{Deserialize, Serialize};

/// One operation in an atomic batch (spec section 4.2's `batch(ops)`).
#[derive(Debug, Clone)]
pub enum StoreOp {
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
}

impl StoreOp {
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            StoreOp::Put { key, .. } | StoreOp::Delete { key } => key,
        }
    }
}

/// Outcome recorded for an audit event (spec section 4.2: "emits an audit
/// event with principal, key, outcome, not the value").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Denied,
    Failed,
}

/// A single audit record for a store mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub principal: String,
    pub key: String,
    pub action: String,
    pub outcome: Outcome,
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_op_exposes_its_key() {
        let put = StoreOp::Put { key: "a".into(), value: vec![1] };
        let del = StoreOp::Delete { key: "b".into() };
        assert_eq!(put.key(), "a");
        assert_eq!(del.key(), "b");
    }
}
