//! `LoopbackTransport`: an in-process adapter for single-binary
//! multi-node tests (spec section 8's seed scenarios run several
//! `ag-05-consensus` instances inside one process). Grounded on the
//! teacher's `shared-bus` in-process publisher/subscriber, generalized
//! to peer-to-peer addressing plus a topic-keyed client channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, oneshot};

use shared_types::entities::NodeId;
use shared_types::ipc::{PeerMessage, StreamEvent};

use crate::domain::dedup::DedupWindow;
use crate::domain::errors::TransportError;
use crate::domain::replay::NonceTracker;
use crate::ports::{ClientChannel, PeerChannel};

const DEDUP_WINDOW_SIZE: usize = 4096;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const CLIENT_TOPIC_CAPACITY: usize = 256;

/// Invoked by a [`LoopbackTransport`] when a frame addressed to it
/// arrives, after replay/dedup checks pass.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle(&self, sender: NodeId, message: PeerMessage) -> PeerMessage;
}

struct Frame {
    sender: NodeId,
    nonce: u64,
    message_id: String,
    message: PeerMessage,
    reply: oneshot::Sender<PeerMessage>,
}

/// The shared fabric every [`LoopbackTransport`] instance in one process
/// registers with. Stands in for an actual network in tests.
#[derive(Default)]
pub struct LoopbackNetwork {
    inboxes: DashMap<NodeId, mpsc::UnboundedSender<Frame>>,
    topics: DashMap<String, broadcast::Sender<StreamEvent>>,
}

impl LoopbackNetwork {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

/// One node's view of the loopback fabric: its inbox, its outbound nonce
/// counter, and the replay/dedup state for frames it receives.
pub struct LoopbackTransport {
    node_id: NodeId,
    network: Arc<LoopbackNetwork>,
    outbound_nonce: AtomicU64,
    nonce_tracker: NonceTracker,
    dedup: DedupWindow,
}

impl LoopbackTransport {
    /// Register `node_id` on `network` and start its inbound dispatch
    /// loop, delegating accepted frames to `handler`.
    pub fn register(network: Arc<LoopbackNetwork>, node_id: NodeId, handler: Arc<dyn InboundHandler>) -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
        network.inboxes.insert(node_id.clone(), tx);

        let transport = Arc::new(Self {
            node_id,
            network,
            outbound_nonce: AtomicU64::new(0),
            nonce_tracker: NonceTracker::new(),
            dedup: DedupWindow::new(DEDUP_WINDOW_SIZE),
        });

        let dispatch_transport = transport.clone();
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if !dispatch_transport.nonce_tracker.accept(&frame.sender, frame.nonce) {
                    tracing::warn!(sender = %frame.sender, nonce = frame.nonce, "rejected replayed nonce");
                    continue;
                }
                if !dispatch_transport.dedup.observe(&frame.message_id) {
                    tracing::debug!(message_id = %frame.message_id, "dropped duplicate delivery");
                    continue;
                }
                let response = handler.handle(frame.sender, frame.message).await;
                let _ = frame.reply.send(response);
            }
        });

        transport
    }
}

#[async_trait]
impl PeerChannel for LoopbackTransport {
    async fn send(&self, target: &NodeId, message: PeerMessage) -> Result<PeerMessage, TransportError> {
        let inbox = self
            .network
            .inboxes
            .get(target)
            .ok_or_else(|| TransportError::UnknownPeer(target.to_string()))?
            .clone();

        let nonce = self.outbound_nonce.fetch_add(1, Ordering::SeqCst) + 1;
        let (reply_tx, reply_rx) = oneshot::channel();
        let frame = Frame {
            sender: self.node_id.clone(),
            nonce,
            message_id: uuid::Uuid::new_v4().to_string(),
            message,
            reply: reply_tx,
        };
        inbox.send(frame).map_err(|_| TransportError::Disconnected(target.to_string()))?;

        tokio::time::timeout(REQUEST_TIMEOUT, reply_rx)
            .await
            .map_err(|_| TransportError::Timeout(target.to_string()))?
            .map_err(|_| TransportError::Disconnected(target.to_string()))
    }

    async fn stream(&self, target: &NodeId, topic: &str) -> Result<mpsc::Receiver<PeerMessage>, TransportError> {
        if !self.network.inboxes.contains_key(target) {
            return Err(TransportError::UnknownPeer(target.to_string()));
        }
        // Loopback streaming rides the same client-topic fabric, namespaced
        // by target so distinct peers' streams never collide.
        let (tx, rx) = mpsc::channel(CLIENT_TOPIC_CAPACITY);
        let topic_key = format!("peer:{target}:{topic}");
        let mut broadcast_rx = self
            .network
            .topics
            .entry(topic_key)
            .or_insert_with(|| broadcast::channel(CLIENT_TOPIC_CAPACITY).0)
            .subscribe();
        tokio::spawn(async move {
            while let Ok(event) = broadcast_rx.recv().await {
                if let Ok(message) = serde_json::from_value::<PeerMessage>(event.payload) {
                    if tx.try_send(message).is_err() {
                        break;
                    }
                }
            }
        });
        Ok(rx)
    }
}

impl ClientChannel for LoopbackTransport {
    fn publish(&self, topic: &str, event: StreamEvent) {
        let sender = self.network.topics.entry(topic.to_string()).or_insert_with(|| broadcast::channel(CLIENT_TOPIC_CAPACITY).0);
        let _ = sender.send(event);
    }

    fn subscribe(&self, topic: &str) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(CLIENT_TOPIC_CAPACITY);
        let mut broadcast_rx = self
            .network
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(CLIENT_TOPIC_CAPACITY).0)
            .subscribe();
        tokio::spawn(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(event) => {
                        // Bounded queue: when full, disconnect this slow
                        // subscriber rather than block the publisher.
                        if tx.try_send(event).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoHandler;

    #[async_trait]
    impl InboundHandler for EchoHandler {
        async fn handle(&self, _sender: NodeId, message: PeerMessage) -> PeerMessage {
            message
        }
    }

    #[tokio::test]
    async fn send_round_trips_through_loopback() {
        let network = LoopbackNetwork::new();
        let a = LoopbackTransport::register(network.clone(), NodeId::new("a"), Arc::new(EchoHandler));
        let _b = LoopbackTransport::register(network.clone(), NodeId::new("b"), Arc::new(EchoHandler));

        let reply = a
            .send(&NodeId::new("b"), PeerMessage::Heartbeat { term: 1, leader_id: NodeId::new("b"), leader_commit_index: 0 })
            .await
            .unwrap();
        assert_eq!(reply.term(), Some(1));
    }

    #[tokio::test]
    async fn send_to_unknown_peer_fails() {
        let network = LoopbackNetwork::new();
        let a = LoopbackTransport::register(network.clone(), NodeId::new("a"), Arc::new(EchoHandler));
        let err = a
            .send(&NodeId::new("ghost"), PeerMessage::Heartbeat { term: 1, leader_id: NodeId::new("a"), leader_commit_index: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownPeer(_)));
    }

    #[tokio::test]
    async fn client_channel_delivers_published_events() {
        let network = LoopbackNetwork::new();
        let a = LoopbackTransport::register(network.clone(), NodeId::new("a"), Arc::new(EchoHandler));
        let mut rx = a.subscribe("commits");
        a.publish("commits", StreamEvent { sequence: 1, kind: "commit".into(), timestamp: 0, payload: serde_json::json!({}) });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.sequence, 1);
    }
}
