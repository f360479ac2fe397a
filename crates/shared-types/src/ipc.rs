//! # Peer Wire Protocol & Client Submission API
//!
//! The external interfaces from spec section 6: the length-delimited,
//! signed peer protocol messages and the client submission API's outcome
//! type. Wire encoding is `bincode` (matching the teacher workspace's
//! choice of `bincode` for binary wire formats); the choice of transport
//! (TCP/QUIC/...) is out of scope per spec section 1 and lives entirely
//! behind `ag-04-transport`'s `PeerChannel` port.

use crate::entities::{Batch, NodeId, NodeType, Timestamp, Transaction};
use crate::errors::LeaderHint;
use serde::{Deserialize, Serialize};

/// One frame of the peer protocol (spec section 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PeerMessage {
    Hello {
        node_id: NodeId,
        node_type: NodeType,
        public_key: Vec<u8>,
        capabilities: Vec<String>,
        nonce: u64,
        signature: Vec<u8>,
    },
    Heartbeat {
        term: u64,
        leader_id: NodeId,
        leader_commit_index: u64,
    },
    AppendEntries {
        term: u64,
        leader_id: NodeId,
        prev_log_index: u64,
        prev_log_term: u64,
        entries: Vec<WireLogEntry>,
        leader_commit_index: u64,
    },
    AppendEntriesReply {
        term: u64,
        success: bool,
        match_index: u64,
        conflict_hint: Option<u64>,
    },
    RequestVote {
        term: u64,
        candidate_id: NodeId,
        last_log_index: u64,
        last_log_term: u64,
    },
    RequestVoteReply {
        term: u64,
        vote_granted: bool,
    },
    ForwardTransaction {
        request_id: String,
        transaction: Transaction,
    },
    ForwardReply {
        request_id: String,
        outcome: SubmitOutcome,
    },
}

impl PeerMessage {
    /// The responder's current term, when this variant carries one. Used
    /// by callers to step down promptly on a higher-term observation
    /// (spec section 6).
    #[must_use]
    pub fn term(&self) -> Option<u64> {
        match self {
            PeerMessage::Heartbeat { term, .. }
            | PeerMessage::AppendEntries { term, .. }
            | PeerMessage::AppendEntriesReply { term, .. }
            | PeerMessage::RequestVote { term, .. }
            | PeerMessage::RequestVoteReply { term, .. } => Some(*term),
            _ => None,
        }
    }
}

/// A single log entry as carried over the wire (spec section 6). The
/// authoritative `LogEntry` type with its `PROPOSED/REPLICATED/...` state
/// lives in `ag-05-consensus`; this is its wire-safe projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireLogEntry {
    pub index: u64,
    pub term: u64,
    pub batch: Batch,
}

/// The outcome of a client submission, per the client submission API in
/// spec section 6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SubmitOutcome {
    /// The pipeline has accepted the transaction into a batch and
    /// proposed it to the Consensus Engine; the real commit outcome
    /// (or a later rejection) arrives over the `commits` notification
    /// topic, correlated by `request_id`.
    Accepted { request_id: String },
    Committed { batch_index: u64, tx_position: u32 },
    RejectedInvalid { reason: String },
    RejectedOverloaded,
    Timeout,
    NotLeader { hint: LeaderHint },
}

/// Response to a client's initial `submit` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAck {
    pub accepted: bool,
    pub request_id: String,
}

/// An event published on the event-stream topics from spec section 6
/// (`commits`, `state_changes`, `consensus_role`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    pub sequence: u64,
    pub kind: String,
    pub timestamp: Timestamp,
    pub payload: serde_json::Value,
}
