use shared_types::entities::{NodeId, NodeStatus, NodeType};
use tokio::sync::mpsc;

use crate::domain::descriptor::{NodeDescriptor, RegistryChangeEvent};
use crate::domain::errors::RegistryError;

pub trait NodeRegistryApi: Send + Sync {
    fn register(&self, descriptor: NodeDescriptor) -> Result<(), RegistryError>;
    fn unregister(&self, node_id: &NodeId) -> Result<(), RegistryError>;
    fn lookup(&self, node_id: &NodeId) -> Result<NodeDescriptor, RegistryError>;
    fn list_by_type(&self, node_type: NodeType) -> Vec<NodeDescriptor>;
    fn list_by_status(&self, status: NodeStatus) -> Vec<NodeDescriptor>;
    fn subscribe(&self) -> mpsc::Receiver<RegistryChangeEvent>;

    /// Record a node's latest lifecycle status, as observed from the
    /// Node State Manager's `StateChangeEvent` stream, so `list_by_status`
    /// stays current without the registry owning the FSM itself.
    fn observe_status_change(&self, node_id: &NodeId, status: NodeStatus);

    /// Begin a joint-consensus membership change toward `target_validators`
    /// (spec section 4.7). REQUIRED to go through the joint-quorum
    /// protocol rather than a direct cutover.
    fn begin_membership_change(&self, target_validators: Vec<NodeId>) -> Result<u64, RegistryError>;

    /// Finalize a membership change once the joint configuration has
    /// been committed by majorities of both the old and new sets.
    fn finalize_membership_change(&self) -> Result<u64, RegistryError>;
}
