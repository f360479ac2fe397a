//! Node Registry service (spec section 4.7): an eventually-consistent,
//! per-node directory plus the joint-consensus membership-change
//! workflow layered on [`ag_05_consensus::MembershipConfig`].

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::info;

use ag_05_consensus::MembershipConfig;
use shared_types::entities::{NodeId, NodeStatus, NodeType, now_unix};

use crate::domain::descriptor::{NodeDescriptor, RegistryChangeEvent, RegistryChangeKind};
use crate::domain::errors::RegistryError;
use crate::ports::inbound::NodeRegistryApi;

const CHANGE_CHANNEL_CAPACITY: usize = 1024;
const STATUS_CHANNEL_CAPACITY: usize = 256;

pub struct NodeRegistryService {
    descriptors: DashMap<NodeId, NodeDescriptor>,
    statuses: DashMap<NodeId, NodeStatus>,
    membership: Mutex<MembershipConfig>,
    changes: broadcast::Sender<RegistryChangeEvent>,
}

impl NodeRegistryService {
    #[must_use]
    pub fn new(genesis_validators: Vec<NodeId>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            descriptors: DashMap::new(),
            statuses: DashMap::new(),
            membership: Mutex::new(MembershipConfig::genesis(genesis_validators)),
            changes,
        }
    }

    #[must_use]
    pub fn current_membership_epoch(&self) -> u64 {
        self.membership.lock().epoch()
    }

    fn emit(&self, kind: RegistryChangeKind, node_id: NodeId) {
        let _ = self.changes.send(RegistryChangeEvent { kind, node_id, timestamp: now_unix() });
    }
}

impl NodeRegistryApi for NodeRegistryService {
    fn register(&self, descriptor: NodeDescriptor) -> Result<(), RegistryError> {
        if self.descriptors.contains_key(&descriptor.id) {
            return Err(RegistryError::AlreadyRegistered);
        }
        let id = descriptor.id.clone();
        self.descriptors.insert(id.clone(), descriptor);
        self.statuses.insert(id.clone(), NodeStatus::Initializing);
        info!(target: "audit", node = %id, "node registered");
        self.emit(RegistryChangeKind::Registered, id);
        Ok(())
    }

    fn unregister(&self, node_id: &NodeId) -> Result<(), RegistryError> {
        if self.descriptors.remove(node_id).is_none() {
            return Err(RegistryError::NotFound);
        }
        self.statuses.remove(node_id);
        info!(target: "audit", node = %node_id, "node unregistered");
        self.emit(RegistryChangeKind::Unregistered, node_id.clone());
        Ok(())
    }

    fn lookup(&self, node_id: &NodeId) -> Result<NodeDescriptor, RegistryError> {
        self.descriptors.get(node_id).map(|d| d.clone()).ok_or(RegistryError::NotFound)
    }

    fn list_by_type(&self, node_type: NodeType) -> Vec<NodeDescriptor> {
        self.descriptors.iter().filter(|d| d.node_type == node_type).map(|d| d.clone()).collect()
    }

    fn list_by_status(&self, status: NodeStatus) -> Vec<NodeDescriptor> {
        self.descriptors
            .iter()
            .filter(|d| self.statuses.get(&d.id).map(|s| *s) == Some(status))
            .map(|d| d.clone())
            .collect()
    }

    fn subscribe(&self) -> mpsc::Receiver<RegistryChangeEvent> {
        let (tx, rx) = mpsc::channel(STATUS_CHANNEL_CAPACITY);
        let mut changes = self.changes.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = changes.recv().await {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        rx
    }

    fn observe_status_change(&self, node_id: &NodeId, status: NodeStatus) {
        self.statuses.insert(node_id.clone(), status);
    }

    fn begin_membership_change(&self, target_validators: Vec<NodeId>) -> Result<u64, RegistryError> {
        let mut membership = self.membership.lock();
        let joint = membership.begin_change(target_validators).ok_or(RegistryError::MembershipChangeInProgress)?;
        let epoch = joint.epoch();
        info!(target: "audit", epoch, "membership change started: entering joint configuration");
        *membership = joint;
        Ok(epoch)
    }

    fn finalize_membership_change(&self) -> Result<u64, RegistryError> {
        let mut membership = self.membership.lock();
        let stable = membership.finalize().ok_or(RegistryError::MembershipChangeInProgress)?;
        let epoch = stable.epoch();
        info!(target: "audit", epoch, "membership change finalized: old validator set retired");
        *membership = stable;
        Ok(epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str) -> NodeDescriptor {
        NodeDescriptor::new(NodeId::new(id), NodeType::Validator, "127.0.0.1:9000", vec![], vec![])
    }

    #[test]
    fn register_then_lookup_round_trips() {
        let registry = NodeRegistryService::new(vec![NodeId::new("v1")]);
        registry.register(descriptor("v2")).unwrap();
        assert_eq!(registry.lookup(&NodeId::new("v2")).unwrap().id, NodeId::new("v2"));
    }

    #[test]
    fn double_register_is_rejected() {
        let registry = NodeRegistryService::new(vec![]);
        registry.register(descriptor("v2")).unwrap();
        assert!(matches!(registry.register(descriptor("v2")), Err(RegistryError::AlreadyRegistered)));
    }

    #[test]
    fn unregister_removes_from_directory() {
        let registry = NodeRegistryService::new(vec![]);
        registry.register(descriptor("v2")).unwrap();
        registry.unregister(&NodeId::new("v2")).unwrap();
        assert!(matches!(registry.lookup(&NodeId::new("v2")), Err(RegistryError::NotFound)));
    }

    #[test]
    fn list_by_status_reflects_observed_changes() {
        let registry = NodeRegistryService::new(vec![]);
        registry.register(descriptor("v2")).unwrap();
        assert_eq!(registry.list_by_status(NodeStatus::Initializing).len(), 1);
        registry.observe_status_change(&NodeId::new("v2"), NodeStatus::Running);
        assert_eq!(registry.list_by_status(NodeStatus::Initializing).len(), 0);
        assert_eq!(registry.list_by_status(NodeStatus::Running).len(), 1);
    }

    #[test]
    fn membership_change_goes_through_joint_then_stable() {
        let registry = NodeRegistryService::new(vec![NodeId::new("v1"), NodeId::new("v2")]);
        assert_eq!(registry.current_membership_epoch(), 0);
        registry.begin_membership_change(vec![NodeId::new("v2"), NodeId::new("v3")]).unwrap();
        assert_eq!(registry.current_membership_epoch(), 1);
        registry.finalize_membership_change().unwrap();
        assert_eq!(registry.current_membership_epoch(), 2);
    }

    #[test]
    fn cannot_begin_second_change_while_joint_is_pending() {
        let registry = NodeRegistryService::new(vec![NodeId::new("v1")]);
        registry.begin_membership_change(vec![NodeId::new("v2")]).unwrap();
        assert!(matches!(
            registry.begin_membership_change(vec![NodeId::new("v3")]),
            Err(RegistryError::MembershipChangeInProgress)
        ));
    }
}
