//! # Subsystem Container
//!
//! Wires the Node State Manager, Consensus Engine, Transaction Pipeline,
//! Node Registry, and Observability crates into one or more [`NodeHandle`]s
//! sharing a single in-process [`LoopbackNetwork`] (spec section 4.4: this
//! runtime hosts the whole validator set as a single-binary multi-node
//! deployment, since real TCP/QUIC transport is explicitly out of scope).
//! Grounded on the teacher's `container::subsystems::SubsystemContainer`
//! dependency-order bootstrap, generalized from a log-only stub into a
//! real construction of every C2-C8 service.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::info;

use ag_02_store::adapters::rocksdb_store::{RocksDbConfig, RocksDbStore};
use ag_02_store::{BatchOperation, EncryptedStoreService, InMemoryKvStore, KeyValueStore, Principal, Role, StoreError};
use ag_03_node_state::{NodeStateApi, NodeStateService};
use ag_04_transport::{InboundHandler, LoopbackNetwork, LoopbackTransport};
use ag_05_consensus::{ConsensusApi, ConsensusDependencies, ConsensusService, RandomizedElectionTimeout, SystemClock as ConsensusSystemClock};
use ag_05_consensus::adapters::store_backed::StoreBackedConsensusState;
use ag_06_tx_pipeline::{
    BatchingPolicy, InMemoryNonceLedger, SystemClock as PipelineSystemClock, TransactionPipelineApi,
    TxPipelineDependencies, TxPipelineService,
};
use ag_07_registry::{NodeDescriptor, NodeRegistryApi, NodeRegistryService, RegistryError};
use ag_08_observability::{AuditEventKind, ObservabilityApi, ObservabilityService, TracingAuditSink};
use shared_crypto::{KeyManager, SecretKey};
use shared_types::entities::{NodeId, NodeStatus, NodeType};
use shared_types::ipc::PeerMessage;

use crate::container::config::{AurigraphConfig, Profile};
use crate::errors::RuntimeError;

/// One of the two raw key-value backends this runtime ships: `InMemoryKvStore`
/// for dev/test, `RocksDbStore` for prod (spec section 4.2's "an
/// implementation-chosen embedded key/value engine").
pub enum KvBackend {
    Memory(InMemoryKvStore),
    RocksDb(RocksDbStore),
}

impl KeyValueStore for KvBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self {
            Self::Memory(s) => s.get(key),
            Self::RocksDb(s) => s.get(key),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.put(key, value),
            Self::RocksDb(s) => s.put(key, value),
        }
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.delete(key),
            Self::RocksDb(s) => s.delete(key),
        }
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.atomic_batch_write(operations),
            Self::RocksDb(s) => s.atomic_batch_write(operations),
        }
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        match self {
            Self::Memory(s) => s.prefix_scan(prefix),
            Self::RocksDb(s) => s.prefix_scan(prefix),
        }
    }
}

type Store = EncryptedStoreService<KvBackend>;
type ConsensusState = StoreBackedConsensusState<Store>;
type Consensus = ConsensusService<LoopbackTransport, ConsensusState>;
type Pipeline = TxPipelineService<Consensus, Store, LoopbackTransport, InMemoryNonceLedger, PipelineSystemClock>;

/// Forwards frames delivered over the loopback fabric into the consensus
/// engine, once it exists. The transport and the consensus service are
/// mutually dependent at construction time (the service needs the
/// transport to send RPCs; the transport's handler needs the service to
/// answer them), so the handler starts empty and is filled in once the
/// service is built.
struct ConsensusInboundHandler {
    consensus: OnceCell<Arc<Consensus>>,
}

#[async_trait]
impl InboundHandler for ConsensusInboundHandler {
    async fn handle(&self, sender: NodeId, message: PeerMessage) -> PeerMessage {
        match self.consensus.get() {
            Some(consensus) => consensus.handle_peer_message(sender, message),
            None => message,
        }
    }
}

/// Every subsystem instance for one validator in the hosted cluster.
pub struct NodeHandle {
    pub node_id: NodeId,
    pub store: Arc<Store>,
    pub node_state: Arc<NodeStateService<Store>>,
    pub consensus: Arc<Consensus>,
    pub pipeline: Arc<Pipeline>,
    pub observability: Arc<ObservabilityService<TracingAuditSink>>,
}

impl NodeHandle {
    /// One election-timer / heartbeat tick plus a commit-drain pass (spec
    /// sections 4.5.2 and 4.6): call this on a periodic scheduler from
    /// `main`.
    pub async fn tick(&self) -> Result<(), RuntimeError> {
        self.consensus.on_timer_tick().await;
        self.pipeline.drain_committed().map_err(RuntimeError::from)?;
        Ok(())
    }
}

/// The fully wired runtime: one shared registry and transport fabric, one
/// [`NodeHandle`] per configured validator.
pub struct SubsystemContainer {
    pub registry: Arc<NodeRegistryService>,
    pub network: Arc<LoopbackNetwork>,
    pub nodes: Vec<NodeHandle>,
}

fn build_principal(profile: Profile, owner: &str) -> Principal {
    if profile == Profile::Prod {
        Principal::new(owner)
            .grant("node", Role::Admin)
            .grant("consensus", Role::Admin)
            .grant("tx", Role::Admin)
            .grant("audit", Role::Admin)
    } else {
        Principal::unrestricted(owner)
    }
}

fn build_kv_backend(profile: Profile, data_dir: &Path, node_id: &str) -> Result<KvBackend, RuntimeError> {
    if profile == Profile::Prod {
        let path = data_dir.join(node_id);
        let config = RocksDbConfig { path: path.display().to_string(), ..RocksDbConfig::default() };
        Ok(KvBackend::RocksDb(RocksDbStore::open(config).map_err(RuntimeError::from)?))
    } else {
        Ok(KvBackend::Memory(InMemoryKvStore::new()))
    }
}

/// Derive this node's master key (spec section 4.1/6). Prod derives it
/// from an operator-supplied passphrase via Argon2id, salted per node;
/// dev/test use a deterministic key so runs are reproducible without an
/// operator secret.
fn derive_master_key(profile: Profile, node_id: &str) -> Result<SecretKey, RuntimeError> {
    let salt: [u8; 32] = Sha256::digest(node_id.as_bytes()).into();
    if profile == Profile::Prod {
        let passphrase = std::env::var("AURIGRAPH_MASTER_PASSPHRASE").map_err(|_| {
            RuntimeError(shared_types::errors::AurigraphError::ConfigurationError(
                "AURIGRAPH_MASTER_PASSPHRASE not set".into(),
            ))
        })?;
        shared_crypto::derive_master(passphrase.as_bytes(), &salt)
            .map_err(|e| RuntimeError(shared_types::errors::AurigraphError::ConfigurationError(e.to_string())))
    } else {
        Ok(SecretKey::from_bytes(salt))
    }
}

impl SubsystemContainer {
    pub async fn bootstrap(config: &AurigraphConfig) -> Result<Self, RuntimeError> {
        let validator_ids: Vec<NodeId> = config.consensus.validator_set.iter().map(|id| NodeId::new(id.clone())).collect();
        let registry = Arc::new(NodeRegistryService::new(validator_ids.clone()));
        let network = LoopbackNetwork::new();

        let mut nodes = Vec::with_capacity(validator_ids.len());
        for node_id in &validator_ids {
            let node = Self::bootstrap_one(config, &network, &registry, node_id, &validator_ids).await?;
            nodes.push(node);
        }

        info!(validators = validator_ids.len(), "subsystem container bootstrapped");
        Ok(Self { registry, network, nodes })
    }

    async fn bootstrap_one(
        config: &AurigraphConfig,
        network: &Arc<LoopbackNetwork>,
        registry: &Arc<NodeRegistryService>,
        node_id: &NodeId,
        validators: &[NodeId],
    ) -> Result<NodeHandle, RuntimeError> {
        let principal = build_principal(config.profile, node_id.as_str());
        let kv = build_kv_backend(config.profile, &config.store.data_dir, node_id.as_str())?;
        let master_key = derive_master_key(config.profile, node_id.as_str())?;
        let keys = Arc::new(
            KeyManager::new(master_key)
                .map_err(|e| RuntimeError(shared_types::errors::AurigraphError::ConfigurationError(e.to_string())))?,
        );
        let store = Arc::new(EncryptedStoreService::new(
            Arc::new(kv),
            keys,
            Arc::new(ag_02_store::SystemClock),
            node_id.as_str(),
        ));

        let node_state = Arc::new(NodeStateService::new(store.clone(), principal.clone()));
        node_state.replay().map_err(RuntimeError::from)?;
        if node_state.get(node_id).is_err() {
            node_state.initialize(node_id.clone(), NodeType::Validator).map_err(RuntimeError::from)?;
        }

        let handler = Arc::new(ConsensusInboundHandler { consensus: OnceCell::new() });
        let transport = LoopbackTransport::register(network.clone(), node_id.clone(), handler.clone());

        let consensus_state = Arc::new(StoreBackedConsensusState::new(store.clone(), principal.clone()));
        let consensus = Arc::new(ConsensusService::new(ConsensusDependencies {
            transport: transport.clone(),
            state_store: consensus_state,
            clock: Arc::new(ConsensusSystemClock),
            election_timeout: Arc::new(RandomizedElectionTimeout {
                min_millis: config.consensus.election_timeout_min_ms,
                max_millis: config.consensus.election_timeout_max_ms,
            }),
            node_id: node_id.clone(),
            validators: validators.to_vec(),
        }));
        consensus.recover().map_err(RuntimeError::from)?;
        // Only fails if this handler were filled twice, which can't happen
        // since each node's handler is built fresh right above.
        let _ = handler.consensus.set(consensus.clone());

        let pipeline = Arc::new(TxPipelineService::new(TxPipelineDependencies {
            consensus: consensus.clone(),
            store: store.clone(),
            client_channel: transport.clone(),
            nonce_ledger: Arc::new(InMemoryNonceLedger::default()),
            clock: Arc::new(PipelineSystemClock),
            principal: principal.clone(),
            node_id: node_id.clone(),
            policy: BatchingPolicy {
                max_batch_size: config.consensus.max_batch,
                max_open_duration: Duration::from_millis(config.consensus.target_commit_latency_ms),
            },
            max_pending_batches: config.consensus.pipeline_depth,
        }));

        let observability = Arc::new(ObservabilityService::new(Arc::new(TracingAuditSink)));

        let descriptor = NodeDescriptor::new(node_id.clone(), NodeType::Validator, format!("loopback:{}", node_id.as_str()), Vec::new());
        match registry.register(descriptor) {
            Ok(()) | Err(RegistryError::AlreadyRegistered) => {}
            Err(e) => return Err(e.into()),
        }
        registry.observe_status_change(node_id, NodeStatus::Running);
        observability.audit(AuditEventKind::NodeStateChange, node_id.as_str(), "node bootstrapped");

        Ok(NodeHandle { node_id: node_id.clone(), store, node_state, consensus, pipeline, observability })
    }
}
