//! `NodeStateService`: the finite state machine shared by all nodes
//! (spec section 4.3). Grounded on the teacher's concurrent-map-plus-
//! per-entity-lock pattern: a `DashMap` for parallel access across
//! different nodes, with a `Mutex` per record serializing transitions on
//! the *same* node.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use ag_02_store::{EncryptedStoreApi, Principal};
use shared_types::entities::{now_unix, NodeId, NodeRecord, NodeStatus, NodeType, StateChangeEvent};

use crate::domain::errors::NodeStateError;
use crate::ports::inbound::NodeStateApi;

/// Listener channel capacity: a slow listener must not block transitions
/// (spec section 4.3); beyond this many buffered events it starts
/// dropping the oldest, surfaced to that listener as `RecvError::Lagged`.
const LISTENER_CHANNEL_CAPACITY: usize = 1024;

fn persistence_key(id: &NodeId) -> String {
    format!("node:state:{}", id.as_str())
}

pub struct NodeStateService<P: EncryptedStoreApi> {
    records: DashMap<NodeId, Arc<Mutex<NodeRecord>>>,
    store: Arc<P>,
    principal: Principal,
    sequence: AtomicU64,
    events: broadcast::Sender<StateChangeEvent>,
}

impl<P: EncryptedStoreApi> NodeStateService<P> {
    #[must_use]
    pub fn new(store: Arc<P>, principal: Principal) -> Self {
        let (events, _) = broadcast::channel(LISTENER_CHANNEL_CAPACITY);
        Self { records: DashMap::new(), store, principal, sequence: AtomicU64::new(0), events }
    }

    fn persist(&self, record: &NodeRecord) -> Result<(), NodeStateError> {
        let key = persistence_key(&record.id);
        let bytes = serde_json::to_vec(record).map_err(|e| NodeStateError::PersistenceError(e.to_string()))?;
        self.store.put(&self.principal, &key, &bytes)?;
        Ok(())
    }

    /// Restore node records from the encrypted store on startup. Any
    /// record last seen RUNNING restarts as INITIALIZING and must
    /// re-transition explicitly (spec section 4.3).
    pub fn replay(&self) -> Result<usize, NodeStateError> {
        let entries = self.store.iterate(&self.principal, "node:state:")?;
        let mut restored = 0;
        for (_, bytes) in entries {
            let mut record: NodeRecord =
                serde_json::from_slice(&bytes).map_err(|e| NodeStateError::PersistenceError(e.to_string()))?;
            if record.status == NodeStatus::Running {
                record.status = NodeStatus::Initializing;
                record.last_transition_at = now_unix();
                self.persist(&record)?;
            }
            self.records.insert(record.id.clone(), Arc::new(Mutex::new(record)));
            restored += 1;
        }
        Ok(restored)
    }
}

impl<P: EncryptedStoreApi> NodeStateApi for NodeStateService<P> {
    fn initialize(&self, node_id: NodeId, node_type: NodeType) -> Result<NodeRecord, NodeStateError> {
        if self.records.contains_key(&node_id) {
            return Err(NodeStateError::AlreadyExists(node_id.to_string()));
        }
        let record = NodeRecord::new(node_id.clone(), node_type);
        self.persist(&record)?;
        self.records.insert(node_id, Arc::new(Mutex::new(record.clone())));
        Ok(record)
    }

    fn transition(&self, node_id: &NodeId, target: NodeStatus, reason: &str) -> Result<NodeRecord, NodeStateError> {
        let entry =
            self.records.get(node_id).ok_or_else(|| NodeStateError::NotFound(node_id.to_string()))?.clone();
        let mut guard = entry.lock();

        if !guard.status.can_transition_to(target) {
            return Err(NodeStateError::InvalidTransition(format!("{} -> {target}", guard.status)));
        }

        let previous_status = guard.status;
        let attempted = NodeRecord {
            status: target,
            last_transition_at: now_unix(),
            ..guard.clone()
        };

        // Persist before publishing (spec section 4.3): a persistence
        // failure rolls the attempted transition back entirely.
        if let Err(e) = self.persist(&attempted) {
            return Err(e);
        }

        *guard = attempted.clone();
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let event = StateChangeEvent {
            node_id: node_id.clone(),
            previous_status,
            new_status: target,
            reason: reason.to_string(),
            sequence,
            timestamp: now_unix(),
            snapshot: attempted.clone(),
        };
        // Ignore send errors: no listeners subscribed is not a failure.
        let _ = self.events.send(event);
        Ok(attempted)
    }

    fn get(&self, node_id: &NodeId) -> Result<NodeRecord, NodeStateError> {
        self.records
            .get(node_id)
            .map(|entry| entry.lock().clone())
            .ok_or_else(|| NodeStateError::NotFound(node_id.to_string()))
    }

    fn list_by_type(&self, node_type: NodeType) -> Vec<NodeRecord> {
        self.records
            .iter()
            .map(|entry| entry.value().lock().clone())
            .filter(|record| record.node_type == node_type)
            .collect()
    }

    fn list_by_status(&self, status: NodeStatus) -> Vec<NodeRecord> {
        self.records
            .iter()
            .map(|entry| entry.value().lock().clone())
            .filter(|record| record.status == status)
            .collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<StateChangeEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ag_02_store::{EncryptedStoreService, InMemoryKvStore, Role, SystemClock};
    use shared_crypto::{KeyManager, SecretKey};

    fn service() -> NodeStateService<EncryptedStoreService<InMemoryKvStore>> {
        let kv = Arc::new(InMemoryKvStore::new());
        let keys = Arc::new(KeyManager::new(SecretKey::from_bytes([1u8; 32])).unwrap());
        let store = Arc::new(EncryptedStoreService::new(kv, keys, Arc::new(SystemClock), "n1"));
        let principal = Principal::new("node-state").grant("node", Role::Admin);
        NodeStateService::new(store, principal)
    }

    #[test]
    fn initialize_then_legal_transition_succeeds() {
        let svc = service();
        let id = NodeId::new("v1");
        svc.initialize(id.clone(), NodeType::Validator).unwrap();
        let record = svc.transition(&id, NodeStatus::Running, "boot complete").unwrap();
        assert_eq!(record.status, NodeStatus::Running);
    }

    #[test]
    fn illegal_transition_rejected() {
        let svc = service();
        let id = NodeId::new("v1");
        svc.initialize(id.clone(), NodeType::Validator).unwrap();
        let err = svc.transition(&id, NodeStatus::Paused, "skip running").unwrap_err();
        assert!(matches!(err, NodeStateError::InvalidTransition(_)));
    }

    #[test]
    fn duplicate_initialize_rejected() {
        let svc = service();
        let id = NodeId::new("v1");
        svc.initialize(id.clone(), NodeType::Validator).unwrap();
        let err = svc.initialize(id, NodeType::Validator).unwrap_err();
        assert!(matches!(err, NodeStateError::AlreadyExists(_)));
    }

    #[test]
    fn listener_receives_committed_event_in_order() {
        let svc = service();
        let id = NodeId::new("v1");
        svc.initialize(id.clone(), NodeType::Validator).unwrap();
        let mut rx = svc.subscribe();
        svc.transition(&id, NodeStatus::Running, "up").unwrap();
        svc.transition(&id, NodeStatus::Paused, "maintenance").unwrap();
        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.new_status, NodeStatus::Running);
        assert_eq!(second.new_status, NodeStatus::Paused);
        assert!(first.sequence < second.sequence);
    }

    #[test]
    fn replay_demotes_running_to_initializing() {
        let svc = service();
        let id = NodeId::new("v1");
        svc.initialize(id.clone(), NodeType::Validator).unwrap();
        svc.transition(&id, NodeStatus::Running, "up").unwrap();

        let rebooted = NodeStateService::new(svc.store.clone(), svc.principal.clone());
        let count = rebooted.replay().unwrap();
        assert_eq!(count, 1);
        assert_eq!(rebooted.get(&id).unwrap().status, NodeStatus::Initializing);
    }
}
