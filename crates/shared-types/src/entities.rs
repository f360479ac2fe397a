//! # Core Domain Entities
//!
//! The data model from spec section 3: nodes, transactions, batches, and
//! the event recording node lifecycle transitions. Consensus-internal types
//! (`LogEntry`, the per-node consensus view) live in `ag-05-consensus`
//! instead, since they are owned exclusively by that subsystem.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Stable node identifier, unique across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Node type, as spec section 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Channel,
    Validator,
    Business,
    ApiIntegration,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeType::Channel => "CHANNEL",
            NodeType::Validator => "VALIDATOR",
            NodeType::Business => "BUSINESS",
            NodeType::ApiIntegration => "API_INTEGRATION",
        };
        write!(f, "{s}")
    }
}

/// Node lifecycle status, as spec section 4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Initializing,
    Running,
    Paused,
    Stopped,
    Error,
}

impl NodeStatus {
    /// Whether `target` is a legal transition from `self`, per the table in
    /// spec section 4.3.
    #[must_use]
    pub fn can_transition_to(self, target: NodeStatus) -> bool {
        use NodeStatus::*;
        matches!(
            (self, target),
            (Initializing, Running)
                | (Initializing, Error)
                | (Running, Paused)
                | (Running, Stopped)
                | (Running, Error)
                | (Paused, Running)
                | (Paused, Stopped)
                | (Paused, Error)
                | (Error, Stopped)
        )
    }

    /// Terminal states never transition further.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeStatus::Stopped)
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeStatus::Initializing => "INITIALIZING",
            NodeStatus::Running => "RUNNING",
            NodeStatus::Paused => "PAUSED",
            NodeStatus::Stopped => "STOPPED",
            NodeStatus::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// Unix timestamp in seconds since epoch.
pub type Timestamp = u64;

/// Returns the current Unix timestamp. Never panics: a clock before the
/// epoch (which should never happen) yields 0.
#[must_use]
pub fn now_unix() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The Node State Manager's record for one node (spec section 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub node_type: NodeType,
    pub status: NodeStatus,
    pub created_at: Timestamp,
    pub last_transition_at: Timestamp,
    pub metadata: BTreeMap<String, String>,
}

impl NodeRecord {
    #[must_use]
    pub fn new(id: NodeId, node_type: NodeType) -> Self {
        let now = now_unix();
        Self {
            id,
            node_type,
            status: NodeStatus::Initializing,
            created_at: now,
            last_transition_at: now,
            metadata: BTreeMap::new(),
        }
    }
}

/// Immutable record of a node lifecycle transition (spec section 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChangeEvent {
    pub node_id: NodeId,
    pub previous_status: NodeStatus,
    pub new_status: NodeStatus,
    pub reason: String,
    /// Monotonic sequence number, not wall-clock time, so listeners can
    /// totally order events even if the clock is adjusted.
    pub sequence: u64,
    pub timestamp: Timestamp,
    pub snapshot: NodeRecord,
}

/// A client-submitted unit of work (spec section 3). The payload is opaque
/// and, per spec section 3's invariant, is never logged or persisted as
/// plaintext outside of this in-memory representation prior to batching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub payload: Vec<u8>,
    pub submitter: SubmitterId,
    pub nonce: u64,
    pub submit_timestamp: Timestamp,
    pub signature: Vec<u8>,
}

impl Transaction {
    /// Maximum permitted payload size (spec section 3): 10 MiB.
    pub const MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

    /// The message bytes a signature commits to: everything but the
    /// signature itself, in a fixed field order.
    #[must_use]
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.payload.len() + self.submitter.0.len() + 24);
        buf.extend_from_slice(self.id.0.as_bytes());
        buf.extend_from_slice(self.submitter.0.as_bytes());
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        buf.extend_from_slice(&self.submit_timestamp.to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }
}

/// Globally unique transaction identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(pub String);

/// The identity of a transaction submitter (an account, client, or node).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubmitterId(pub String);

/// An ordered group of validated transactions proposed together as one log
/// entry (spec section 3). `(term, sequence)` is the unique key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub sequence: u64,
    pub term: u64,
    pub leader_id: NodeId,
    pub transactions: Vec<Transaction>,
    pub payload_digest: [u8; 32],
    pub proposer_signature: Vec<u8>,
    pub previous_batch_digest: Option<[u8; 32]>,
}

impl Batch {
    /// BLAKE3-style commitment over the ordered transaction ids and
    /// payload hashes, using SHA-256 (the hash primitive the rest of the
    /// crypto stack in this workspace standardizes on).
    #[must_use]
    pub fn compute_digest(
        term: u64,
        sequence: u64,
        leader_id: &NodeId,
        transactions: &[Transaction],
    ) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(term.to_be_bytes());
        hasher.update(sequence.to_be_bytes());
        hasher.update(leader_id.as_str().as_bytes());
        for tx in transactions {
            hasher.update(tx.id.0.as_bytes());
            hasher.update(&tx.payload);
        }
        hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions_match_spec_table() {
        use NodeStatus::*;
        assert!(Initializing.can_transition_to(Running));
        assert!(Initializing.can_transition_to(Error));
        assert!(!Initializing.can_transition_to(Paused));
        assert!(Running.can_transition_to(Paused));
        assert!(Running.can_transition_to(Stopped));
        assert!(Paused.can_transition_to(Running));
        assert!(Error.can_transition_to(Stopped));
        assert!(!Stopped.can_transition_to(Running));
        assert!(!Error.can_transition_to(Running));
    }

    #[test]
    fn stopped_is_terminal() {
        assert!(NodeStatus::Stopped.is_terminal());
        assert!(!NodeStatus::Running.is_terminal());
    }

    #[test]
    fn batch_digest_is_deterministic() {
        let tx = Transaction {
            id: TransactionId("t1".into()),
            payload: vec![1, 2, 3],
            submitter: SubmitterId("alice".into()),
            nonce: 0,
            submit_timestamp: 1000,
            signature: vec![],
        };
        let leader = NodeId::new("v1");
        let d1 = Batch::compute_digest(1, 0, &leader, &[tx.clone()]);
        let d2 = Batch::compute_digest(1, 0, &leader, &[tx]);
        assert_eq!(d1, d2);
    }
}
