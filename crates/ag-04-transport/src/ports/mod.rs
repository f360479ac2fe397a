//! Transport ports (spec section 4.4): peer-to-peer request/response and
//! streaming, plus a topic-based client event channel.

use async_trait::async_trait;
use shared_types::entities::NodeId;
use shared_types::ipc::PeerMessage;
use tokio::sync::mpsc;

use crate::domain::errors::TransportError;

/// Authenticated bidirectional messaging between nodes.
#[async_trait]
pub trait PeerChannel: Send + Sync {
    /// Send `message` to `target` and await its response.
    async fn send(&self, target: &NodeId, message: PeerMessage) -> Result<PeerMessage, TransportError>;

    /// Subscribe to a streaming `topic` from `target`; messages for a
    /// given (sender, target, topic) triple arrive in send order.
    async fn stream(&self, target: &NodeId, topic: &str) -> Result<mpsc::Receiver<PeerMessage>, TransportError>;
}

/// Event stream fan-out to external subscribers.
pub trait ClientChannel: Send + Sync {
    fn publish(&self, topic: &str, event: shared_types::ipc::StreamEvent);

    /// Subscribe to `topic`; the returned queue is bounded, and when full
    /// the slowest subscriber is disconnected rather than blocking
    /// publishers (spec section 4.4).
    fn subscribe(&self, topic: &str) -> mpsc::Receiver<shared_types::ipc::StreamEvent>;
}
