//! The 7-stage transaction pipeline (spec section 4.6), wired over the
//! Consensus Engine and Encrypted Store ports. Ingress through
//! pre-batch validation runs inline inside [`TxPipelineService::submit`];
//! apply and notification run from [`TxPipelineService::drain_committed`],
//! intended to be polled by a background task once per commit-check
//! interval.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use ag_02_store::{EncryptedStoreApi, Principal};
use ag_04_transport::ClientChannel;
use ag_05_consensus::{ConsensusApi, Role};
use shared_types::entities::{NodeId, Transaction};
use shared_types::errors::LeaderHint;
use shared_types::ipc::{StreamEvent, SubmitOutcome};

use crate::domain::batch_builder::{BatchingPolicy, OpenBatch};
use crate::domain::dedup::SubmissionDedup;
use crate::domain::errors::PipelineError;
use crate::domain::validation::{validate_ingress, validate_pre_batch};
use crate::ports::inbound::TransactionPipelineApi;
use crate::ports::outbound::{Clock, NonceLedger};

const DEDUP_WINDOW_SIZE: usize = 65_536;
const NOTIFICATION_TOPIC: &str = "commits";

pub struct TxPipelineDependencies<C, P, T, N, Clk> {
    pub consensus: Arc<C>,
    pub store: Arc<P>,
    pub client_channel: Arc<T>,
    pub nonce_ledger: Arc<N>,
    pub clock: Arc<Clk>,
    pub principal: Principal,
    pub node_id: NodeId,
    pub policy: BatchingPolicy,
    pub max_pending_batches: usize,
}

pub struct TxPipelineService<C, P, T, N, Clk> {
    consensus: Arc<C>,
    store: Arc<P>,
    client_channel: Arc<T>,
    nonce_ledger: Arc<N>,
    clock: Arc<Clk>,
    principal: Principal,
    node_id: NodeId,
    policy: BatchingPolicy,
    dedup: SubmissionDedup,
    open_batch: Mutex<OpenBatch>,
    pending_batches: AtomicUsize,
    max_pending_batches: usize,
    notification_sequence: AtomicU64,
    /// `(term, next_sequence)`: spec section 3's `(term, sequence)` batch
    /// key requires sequence to be strictly increasing and gap-free
    /// within a term, so it resets to 0 whenever the observed term
    /// advances.
    term_sequence: Mutex<(u64, u64)>,
}

impl<C, P, T, N, Clk> TxPipelineService<C, P, T, N, Clk>
where
    C: ConsensusApi,
    P: EncryptedStoreApi,
    T: ClientChannel,
    N: NonceLedger,
    Clk: Clock,
{
    #[must_use]
    pub fn new(deps: TxPipelineDependencies<C, P, T, N, Clk>) -> Self {
        let now = deps.clock.now_millis();
        Self {
            consensus: deps.consensus,
            store: deps.store,
            client_channel: deps.client_channel,
            nonce_ledger: deps.nonce_ledger,
            clock: deps.clock,
            principal: deps.principal,
            node_id: deps.node_id,
            policy: deps.policy,
            dedup: SubmissionDedup::new(DEDUP_WINDOW_SIZE),
            open_batch: Mutex::new(OpenBatch::new(now)),
            pending_batches: AtomicUsize::new(0),
            max_pending_batches: deps.max_pending_batches,
            notification_sequence: AtomicU64::new(0),
            term_sequence: Mutex::new((0, 0)),
        }
    }

    /// The next `(term, sequence)` batch key (spec section 3), advancing
    /// the per-term counter and resetting it to 0 on a term change.
    fn next_batch_sequence(&self, term: u64) -> u64 {
        let mut ts = self.term_sequence.lock();
        if ts.0 != term {
            *ts = (term, 0);
        }
        let sequence = ts.1;
        ts.1 += 1;
        sequence
    }

    fn leader_hint(&self) -> SubmitOutcome {
        SubmitOutcome::NotLeader { hint: LeaderHint(self.consensus.leader_id().map(|n| n.as_str().to_string())) }
    }

    /// Close the open batch if its threshold is reached and hand it to
    /// the Consensus Engine (spec section 4.6, stages 4-5).
    fn maybe_close_batch(&self) -> Result<(), PipelineError> {
        let now = self.clock.now_millis();
        let mut guard = self.open_batch.lock();
        if !guard.should_close(&self.policy, now) {
            return Ok(());
        }
        if self.pending_batches.load(Ordering::SeqCst) >= self.max_pending_batches {
            // pipeline-depth slots are all full; stay open and stall
            // (spec section 4.6: "upstream stages stall rather than drop").
            return Ok(());
        }
        let finished = std::mem::replace(&mut *guard, OpenBatch::new(now));
        let transactions = finished.close();
        drop(guard);

        let term = self.consensus.current_term();
        let sequence = self.next_batch_sequence(term);
        let digest = shared_types::entities::Batch::compute_digest(term, sequence, &self.node_id, &transactions);
        let batch = shared_types::entities::Batch {
            sequence,
            term,
            leader_id: self.node_id.clone(),
            transactions,
            payload_digest: digest,
            proposer_signature: Vec::new(),
            previous_batch_digest: None,
        };
        self.pending_batches.fetch_add(1, Ordering::SeqCst);
        self.consensus.propose(batch)?;
        Ok(())
    }

    /// Apply one committed, not-yet-applied log entry's batch to the
    /// store (spec section 4.6, stage 6): every transaction is written
    /// within a single atomic batch; a per-transaction failure is
    /// recorded as that transaction's own outcome without aborting the
    /// rest.
    fn apply_entry(&self, entry: &ag_05_consensus::LogEntry) -> Result<(), PipelineError> {
        let mut ops = Vec::with_capacity(entry.batch.transactions.len());
        let mut outcomes = Vec::with_capacity(entry.batch.transactions.len());
        for (position, tx) in entry.batch.transactions.iter().enumerate() {
            let last_known = self.nonce_ledger.last_known_nonce(&tx.submitter);
            match validate_pre_batch(tx, last_known) {
                Ok(()) => {
                    let key = format!("tx:{}:{position}", entry.index);
                    ops.push(ag_02_store::StoreOp::Put { key, value: tx.signing_bytes() });
                    outcomes.push((
                        tx.id.clone(),
                        SubmitOutcome::Committed { batch_index: entry.index, tx_position: position as u32 },
                    ));
                }
                Err(e) => {
                    warn!(tx = %tx.id.0, error = %e, "transaction rejected during apply");
                    outcomes.push((tx.id.clone(), SubmitOutcome::RejectedInvalid { reason: e.to_string() }));
                }
            }
        }
        if !ops.is_empty() {
            self.store.batch(&self.principal, ops)?;
            for tx in &entry.batch.transactions {
                self.nonce_ledger.record_nonce(&tx.submitter, tx.nonce);
            }
        }
        self.notify(entry.index, outcomes);
        Ok(())
    }

    fn notify(&self, batch_index: u64, outcomes: Vec<(shared_types::entities::TransactionId, SubmitOutcome)>) {
        for (tx_id, outcome) in outcomes {
            let sequence = self.notification_sequence.fetch_add(1, Ordering::SeqCst);
            let event = StreamEvent {
                sequence,
                kind: "commit".to_string(),
                timestamp: shared_types::entities::now_unix(),
                payload: serde_json::json!({ "tx_id": tx_id.0, "batch_index": batch_index, "outcome": outcome }),
            };
            self.client_channel.publish(NOTIFICATION_TOPIC, event);
        }
    }
}

impl<C, P, T, N, Clk> TransactionPipelineApi for TxPipelineService<C, P, T, N, Clk>
where
    C: ConsensusApi,
    P: EncryptedStoreApi,
    T: ClientChannel,
    N: NonceLedger,
    Clk: Clock,
{
    fn submit(&self, tx: Transaction) -> Result<SubmitOutcome, PipelineError> {
        validate_ingress(&tx)?;
        if !self.dedup.observe(&tx.submitter, tx.nonce) {
            return Err(PipelineError::DuplicateSubmission);
        }
        if self.consensus.current_role() != Role::Leader {
            return Ok(self.leader_hint());
        }
        let last_known = self.nonce_ledger.last_known_nonce(&tx.submitter);
        validate_pre_batch(&tx, last_known)?;

        let request_id = tx.id.0.clone();
        self.open_batch.lock().push(tx);
        self.maybe_close_batch()?;
        info!(target: "audit", node = %self.node_id, request_id, "transaction accepted into pipeline");
        Ok(SubmitOutcome::Accepted { request_id })
    }

    fn drain_committed(&self) -> Result<usize, PipelineError> {
        self.maybe_close_batch()?;
        let entries = self.consensus.committed_unapplied();
        let count = entries.len();
        for entry in &entries {
            self.apply_entry(entry)?;
            self.consensus.acknowledge_applied(entry.index)?;
            if self.pending_batches.load(Ordering::SeqCst) > 0 {
                self.pending_batches.fetch_sub(1, Ordering::SeqCst);
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    use ag_02_store::{EncryptedStoreService, InMemoryKvStore, SystemClock as StoreSystemClock};
    use shared_types::entities::{SubmitterId, TransactionId};
    use shared_types::ipc::PeerMessage;

    use crate::adapters::in_memory_nonce_ledger::InMemoryNonceLedger;

    /// A consensus double that commits every proposed batch immediately,
    /// under a single fixed term, always acting as leader.
    struct ImmediateCommitConsensus {
        log: Mutex<Vec<ag_05_consensus::LogEntry>>,
        next_index: AtomicU64,
        is_leader: AtomicBool,
    }

    impl ImmediateCommitConsensus {
        fn new() -> Self {
            Self { log: Mutex::new(Vec::new()), next_index: AtomicU64::new(1), is_leader: AtomicBool::new(true) }
        }
    }

    impl ConsensusApi for ImmediateCommitConsensus {
        fn propose(&self, batch: shared_types::entities::Batch) -> Result<u64, ag_05_consensus::ConsensusError> {
            let index = self.next_index.fetch_add(1, Ordering::SeqCst);
            self.log.lock().push(ag_05_consensus::LogEntry {
                index,
                term: 1,
                batch,
                status: ag_05_consensus::EntryStatus::Committed,
            });
            Ok(index)
        }

        fn handle_peer_message(&self, _sender: NodeId, message: PeerMessage) -> PeerMessage {
            message
        }

        fn current_role(&self) -> Role {
            if self.is_leader.load(Ordering::SeqCst) { Role::Leader } else { Role::Follower }
        }

        fn current_term(&self) -> u64 {
            1
        }

        fn leader_id(&self) -> Option<NodeId> {
            Some(NodeId::new("v1"))
        }

        fn commit_index(&self) -> u64 {
            self.log.lock().len() as u64
        }

        fn committed_unapplied(&self) -> Vec<ag_05_consensus::LogEntry> {
            self.log.lock().iter().filter(|e| e.status != ag_05_consensus::EntryStatus::Applied).cloned().collect()
        }

        fn acknowledge_applied(&self, index: u64) -> Result<(), ag_05_consensus::ConsensusError> {
            if let Some(entry) = self.log.lock().iter_mut().find(|e| e.index == index) {
                entry.status = ag_05_consensus::EntryStatus::Applied;
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingClientChannel {
        published: Mutex<Vec<StreamEvent>>,
    }

    impl ClientChannel for RecordingClientChannel {
        fn publish(&self, _topic: &str, event: StreamEvent) {
            self.published.lock().push(event);
        }

        fn subscribe(&self, _topic: &str) -> tokio::sync::mpsc::Receiver<StreamEvent> {
            let (_tx, rx) = tokio::sync::mpsc::channel(1);
            rx
        }
    }

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now_millis(&self) -> u64 {
            self.0
        }
    }

    fn test_store() -> Arc<EncryptedStoreService<InMemoryKvStore>> {
        let kv = Arc::new(InMemoryKvStore::default());
        let keys = Arc::new(
            shared_crypto::KeyManager::new(shared_crypto::SecretKey::from_bytes([3u8; 32])).unwrap(),
        );
        Arc::new(EncryptedStoreService::new(kv, keys, Arc::new(StoreSystemClock), "node-1"))
    }

    fn tx(nonce: u64) -> Transaction {
        Transaction {
            id: TransactionId(format!("t{nonce}")),
            payload: vec![1, 2, 3],
            submitter: SubmitterId("alice".into()),
            nonce,
            submit_timestamp: 0,
            signature: vec![9],
        }
    }

    fn build_service() -> TxPipelineService<
        ImmediateCommitConsensus,
        EncryptedStoreService<InMemoryKvStore>,
        RecordingClientChannel,
        InMemoryNonceLedger,
        FixedClock,
    > {
        TxPipelineService::new(TxPipelineDependencies {
            consensus: Arc::new(ImmediateCommitConsensus::new()),
            store: test_store(),
            client_channel: Arc::new(RecordingClientChannel::default()),
            nonce_ledger: Arc::new(InMemoryNonceLedger::default()),
            clock: Arc::new(FixedClock(0)),
            principal: ag_02_store::Principal::unrestricted("pipeline"),
            node_id: NodeId::new("node-1"),
            policy: BatchingPolicy { max_batch_size: 1, max_open_duration: std::time::Duration::from_secs(60) },
            max_pending_batches: 4,
        })
    }

    #[test]
    fn submit_as_leader_closes_batch_and_commits_and_applies() {
        let service = build_service();
        let outcome = service.submit(tx(1)).unwrap();
        assert!(matches!(outcome, SubmitOutcome::Accepted { .. }));
        let applied = service.drain_committed().unwrap();
        assert_eq!(applied, 1);
        let published = service.client_channel.published.lock();
        assert_eq!(published.len(), 1);
        let payload = &published[0].payload;
        assert_eq!(payload["outcome"]["Committed"]["batch_index"], 1);
    }

    #[test]
    fn successive_batches_get_strictly_increasing_sequence_numbers_within_a_term() {
        let service = build_service();
        service.submit(tx(1)).unwrap();
        service.submit(tx(2)).unwrap();
        let first = service.consensus.log.lock()[0].batch.sequence;
        let second = service.consensus.log.lock()[1].batch.sequence;
        assert_eq!(first, 0);
        assert_eq!(second, 1);
    }

    #[test]
    fn duplicate_submission_is_rejected() {
        let service = build_service();
        service.submit(tx(1)).unwrap();
        assert!(matches!(service.submit(tx(1)), Err(PipelineError::DuplicateSubmission)));
    }

    #[test]
    fn empty_payload_is_rejected_before_dedup() {
        let service = build_service();
        let mut t = tx(1);
        t.payload.clear();
        assert!(matches!(service.submit(t), Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn non_leader_returns_leader_hint_instead_of_accepting() {
        let service = TxPipelineService::new(TxPipelineDependencies {
            consensus: Arc::new({
                let c = ImmediateCommitConsensus::new();
                c.is_leader.store(false, Ordering::SeqCst);
                c
            }),
            store: test_store(),
            client_channel: Arc::new(RecordingClientChannel::default()),
            nonce_ledger: Arc::new(InMemoryNonceLedger::default()),
            clock: Arc::new(FixedClock(0)),
            principal: ag_02_store::Principal::unrestricted("pipeline"),
            node_id: NodeId::new("node-1"),
            policy: BatchingPolicy::default(),
            max_pending_batches: 4,
        });
        let outcome = service.submit(tx(1)).unwrap();
        assert!(matches!(outcome, SubmitOutcome::NotLeader { .. }));
    }
}
