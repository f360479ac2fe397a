//! Inbound port: the API the Transaction Pipeline and RPC handlers drive
//! against.

use shared_types::entities::{Batch, NodeId};
use shared_types::ipc::PeerMessage;

use crate::domain::errors::ConsensusError;
use crate::domain::log::LogEntry;
use crate::domain::roles::{Role, Term};

pub trait ConsensusApi: Send + Sync {
    /// Propose `batch` for replication. Only valid when this node is the
    /// current leader (spec section 4.5.3: "only a leader appends new
    /// entries").
    fn propose(&self, batch: Batch) -> Result<u64, ConsensusError>;

    /// Handle an incoming peer-protocol frame addressed to the consensus
    /// engine (`RequestVote`, `AppendEntries`, `Heartbeat`, and their
    /// replies), returning the reply frame.
    fn handle_peer_message(&self, sender: NodeId, message: PeerMessage) -> PeerMessage;

    fn current_role(&self) -> Role;
    fn current_term(&self) -> Term;
    fn leader_id(&self) -> Option<NodeId>;
    fn commit_index(&self) -> u64;

    /// Committed log entries not yet applied, for the Transaction
    /// Pipeline's Apply stage to fold into the Encrypted Store.
    fn committed_unapplied(&self) -> Vec<LogEntry>;

    /// Record that the entry at `index` has been applied, so it is not
    /// handed out again.
    fn acknowledge_applied(&self, index: u64) -> Result<(), ConsensusError>;
}
