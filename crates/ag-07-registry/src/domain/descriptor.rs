//! The directory entry for a known node (spec section 4.7): "descriptors
//! carry transport endpoints, node type, public verification key, and
//! capabilities."

use shared_types::entities::{NodeId, NodeType, Timestamp, now_unix};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NodeDescriptor {
    pub id: NodeId,
    pub node_type: NodeType,
    pub transport_endpoint: String,
    pub public_key: Vec<u8>,
    pub capabilities: Vec<String>,
    pub registered_at: Timestamp,
}

impl NodeDescriptor {
    #[must_use]
    pub fn new(
        id: NodeId,
        node_type: NodeType,
        transport_endpoint: impl Into<String>,
        public_key: Vec<u8>,
        capabilities: Vec<String>,
    ) -> Self {
        Self { id, node_type, transport_endpoint: transport_endpoint.into(), public_key, capabilities, registered_at: now_unix() }
    }

    #[must_use]
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RegistryChangeKind {
    Registered,
    Unregistered,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegistryChangeEvent {
    pub kind: RegistryChangeKind,
    pub node_id: NodeId,
    pub timestamp: Timestamp,
}
