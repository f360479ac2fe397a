//! Inbound port: the node lifecycle API (spec section 4.3).

use shared_types::entities::{NodeId, NodeRecord, NodeStatus, NodeType};
use tokio::sync::broadcast;

use crate::domain::errors::NodeStateError;

pub trait NodeStateApi: Send + Sync {
    fn initialize(&self, node_id: NodeId, node_type: NodeType) -> Result<NodeRecord, NodeStateError>;
    fn transition(&self, node_id: &NodeId, target: NodeStatus, reason: &str) -> Result<NodeRecord, NodeStateError>;
    fn get(&self, node_id: &NodeId) -> Result<NodeRecord, NodeStateError>;
    fn list_by_type(&self, node_type: NodeType) -> Vec<NodeRecord>;
    fn list_by_status(&self, status: NodeStatus) -> Vec<NodeRecord>;

    /// Subscribe to the committed-transition stream (spec section 4.3:
    /// "listeners receive events in the order transitions were committed").
    fn subscribe(&self) -> broadcast::Receiver<shared_types::entities::StateChangeEvent>;
}
