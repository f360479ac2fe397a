//! The HyperRAFT++ consensus service (spec section 4.5): ties together
//! the pure domain logic in [`crate::domain`] with the transport and
//! persistence ports. Generic over its ports, following the same
//! `Service<P1, P2, ...>`-over-traits shape the teacher's
//! `qc-08-consensus::service` uses for its own `ConsensusService`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use shared_types::entities::{Batch, NodeId};
use shared_types::errors::LeaderHint;
use shared_types::ipc::{PeerMessage, SubmitOutcome, WireLogEntry};

use crate::domain::election::{candidate_log_is_up_to_date, quorum_size, should_grant_vote};
use crate::domain::errors::ConsensusError;
use crate::domain::log::{EntryStatus, LogEntry, ReplicatedLog};
use crate::domain::membership::MembershipConfig;
use crate::domain::replication::{BatchSizeController, FollowerProgress};
use crate::domain::roles::{ConsensusView, Role, Term};
use crate::ports::inbound::ConsensusApi;
use crate::ports::outbound::{Clock, ConsensusStateStore, ElectionTimeoutSource};

const DEFAULT_MIN_BATCH: usize = 1;
const DEFAULT_MAX_BATCH: usize = 512;
const DEFAULT_TARGET_COMMIT_LATENCY_MS: u64 = 100;
/// Heartbeat interval; election timeouts (150-300ms) are kept at least
/// 3x this, per spec section 4.5.2.
const HEARTBEAT_INTERVAL_MS: u64 = 50;
/// Max in-flight `AppendEntries` per follower before the leader stalls
/// further sends to it, per spec section 4.5.4's pipelining model.
const PIPELINE_DEPTH: usize = 8;

#[async_trait::async_trait]
pub trait PeerBroadcaster: Send + Sync {
    async fn send(&self, target: &NodeId, message: PeerMessage) -> Result<PeerMessage, ConsensusError>;
}

#[async_trait::async_trait]
impl<T: ag_04_transport::PeerChannel> PeerBroadcaster for T {
    async fn send(&self, target: &NodeId, message: PeerMessage) -> Result<PeerMessage, ConsensusError> {
        ag_04_transport::PeerChannel::send(self, target, message).await.map_err(ConsensusError::from)
    }
}

pub struct ConsensusDependencies<T, S> {
    pub transport: Arc<T>,
    pub state_store: Arc<S>,
    pub clock: Arc<dyn Clock>,
    pub election_timeout: Arc<dyn ElectionTimeoutSource>,
    pub node_id: NodeId,
    pub validators: Vec<NodeId>,
}

/// A single validator's consensus engine instance.
pub struct ConsensusService<T, S> {
    node_id: NodeId,
    transport: Arc<T>,
    state_store: Arc<S>,
    clock: Arc<dyn Clock>,
    election_timeout: Arc<dyn ElectionTimeoutSource>,

    view: Mutex<ConsensusView>,
    log: Mutex<ReplicatedLog>,
    membership: Mutex<MembershipConfig>,
    progress: Mutex<FollowerProgress>,
    batch_controller: Mutex<BatchSizeController>,
    last_contact_millis: AtomicU64,
    current_election_deadline_ms: AtomicU64,
    /// When each still-uncommitted index was proposed, so a commit can
    /// feed its latency into `batch_controller` (spec section 4.5.4).
    proposed_at_millis: Mutex<std::collections::HashMap<u64, u64>>,
}

impl<T, S> ConsensusService<T, S>
where
    T: PeerBroadcaster,
    S: ConsensusStateStore,
{
    #[must_use]
    pub fn new(deps: ConsensusDependencies<T, S>) -> Self {
        let now = deps.clock.now_millis();
        let timeout = deps.election_timeout.next_timeout_millis();
        Self {
            node_id: deps.node_id,
            transport: deps.transport,
            state_store: deps.state_store,
            clock: deps.clock,
            election_timeout: deps.election_timeout,
            view: Mutex::new(ConsensusView::new()),
            log: Mutex::new(ReplicatedLog::new()),
            membership: Mutex::new(MembershipConfig::genesis(deps.validators)),
            progress: Mutex::new(FollowerProgress::new()),
            batch_controller: Mutex::new(BatchSizeController::new(
                DEFAULT_MIN_BATCH,
                DEFAULT_MAX_BATCH,
                DEFAULT_TARGET_COMMIT_LATENCY_MS,
            )),
            last_contact_millis: AtomicU64::new(now),
            current_election_deadline_ms: AtomicU64::new(now + timeout),
            proposed_at_millis: Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Restore term/voted_for/log/applied_index from durable storage
    /// (spec section 4.5.5). `commit_index` is volatile and is
    /// re-established from the leader's next heartbeat, matching the
    /// RAFT convention that only the log itself must survive a restart.
    pub fn recover(&self) -> Result<(), ConsensusError> {
        let term = self.state_store.load_term()?;
        let voted_for = self.state_store.load_voted_for()?;
        let entries = self.state_store.load_log()?;
        let applied_index = self.state_store.load_applied_index()?;

        let mut view = self.view.lock();
        view.current_term = term;
        view.voted_for = voted_for.map(NodeId::new);
        drop(view);

        let mut log = self.log.lock();
        for entry in entries {
            log.leader_append_raw(entry);
        }
        log.applied_index = applied_index;
        info!(target: "audit", node = %self.node_id, term, applied_index, "consensus state recovered");
        Ok(())
    }

    fn persist_term_and_vote(&self, view: &ConsensusView) -> Result<(), ConsensusError> {
        self.state_store.save_term(view.current_term)?;
        self.state_store.save_voted_for(view.voted_for.as_ref().map(|n| n.as_str()))?;
        Ok(())
    }

    /// The election-timeout loop body; call this on a periodic tick
    /// (e.g. every 10-20ms) from `node-runtime`'s scheduler.
    pub async fn on_timer_tick(&self) {
        let now = self.clock.now_millis();
        let role = self.view.lock().role;
        if role == Role::Leader {
            self.leader_tick().await;
            return;
        }
        if now >= self.current_election_deadline_ms.load(Ordering::SeqCst) {
            self.start_election().await;
        }
    }

    fn reset_election_deadline(&self) {
        let now = self.clock.now_millis();
        let timeout = self.election_timeout.next_timeout_millis();
        self.last_contact_millis.store(now, Ordering::SeqCst);
        self.current_election_deadline_ms.store(now + timeout, Ordering::SeqCst);
    }

    /// Spec section 4.5.2: become CANDIDATE, vote for self, request votes
    /// from every other validator; become LEADER on majority, step down
    /// to FOLLOWER on a higher observed term.
    pub async fn start_election(&self) {
        let (term, last_log_index, last_log_term, members) = {
            let mut view = self.view.lock();
            view.become_candidate(&self.node_id);
            let log = self.log.lock();
            (view.current_term, log.last_log_index(), log.last_log_term(), self.membership.lock().all_members())
        };
        if let Err(e) = self.persist_term_and_vote(&self.view.lock()) {
            warn!(error = %e, "failed to persist candidacy");
            return;
        }
        self.reset_election_deadline();
        info!(target: "audit", node = %self.node_id, term, "starting election");

        let mut votes = 1usize; // self-vote
        for peer in members.iter().filter(|m| **m != self.node_id) {
            let request = PeerMessage::RequestVote {
                term,
                candidate_id: self.node_id.clone(),
                last_log_index,
                last_log_term,
            };
            if let Ok(PeerMessage::RequestVoteReply { term: reply_term, vote_granted }) =
                self.transport.send(peer, request).await
            {
                if self.observe_term(reply_term) {
                    return;
                }
                if vote_granted && reply_term == term {
                    votes += 1;
                }
            }
        }

        let mut view = self.view.lock();
        if view.current_term != term || view.role != Role::Candidate {
            return; // stale; someone else already moved us on.
        }
        if votes >= quorum_size(members.len()) {
            view.become_leader(&self.node_id);
            drop(view);
            let mut progress = self.progress.lock();
            let last_index = self.log.lock().last_log_index();
            for peer in members.iter().filter(|m| **m != self.node_id) {
                progress.init_follower(peer.clone(), last_index);
            }
            info!(target: "audit", node = %self.node_id, term, "became leader");
        }
    }

    /// Leader-side tick (spec section 4.5.3/4.5.4): replicate outstanding
    /// entries to every follower (falling back to a bare heartbeat once
    /// it is fully caught up), then advance `commit_index` to whatever a
    /// majority of the current validator set has acknowledged.
    async fn leader_tick(&self) {
        let (term, leader_last_index, followers) = {
            let view = self.view.lock();
            let log = self.log.lock();
            let members = self.membership.lock().all_members();
            let followers: Vec<NodeId> = members.into_iter().filter(|m| *m != self.node_id).collect();
            (view.current_term, log.last_log_index(), followers)
        };
        for peer in &followers {
            self.replicate_to_follower(peer, term).await;
        }
        self.try_advance_commit_index(term, &followers, leader_last_index);
    }

    /// Send `peer` either the entries it is missing (from its
    /// `next_index`) as `AppendEntries`, or a bare `Heartbeat` once it is
    /// caught up, honoring the pipeline-depth cap in `FollowerProgress`.
    async fn replicate_to_follower(&self, peer: &NodeId, term: Term) {
        let may_send = self.progress.lock().may_send_more(peer, PIPELINE_DEPTH);
        if !may_send {
            return;
        }
        let (prev_log_index, prev_log_term, entries, leader_commit_index) = {
            let next_index = *self.progress.lock().next_index.get(peer).unwrap_or(&1);
            let log = self.log.lock();
            let prev_log_index = next_index.saturating_sub(1);
            let prev_log_term = log.term_at(prev_log_index).unwrap_or(0);
            let entries: Vec<WireLogEntry> = log
                .entries_from(next_index)
                .into_iter()
                .map(|e| WireLogEntry { index: e.index, term: e.term, batch: e.batch })
                .collect();
            (prev_log_index, prev_log_term, entries, log.commit_index)
        };
        let message = if entries.is_empty() {
            PeerMessage::Heartbeat { term, leader_id: self.node_id.clone(), leader_commit_index }
        } else {
            PeerMessage::AppendEntries { term, leader_id: self.node_id.clone(), prev_log_index, prev_log_term, entries, leader_commit_index }
        };

        *self.progress.lock().in_flight.entry(peer.clone()).or_insert(0) += 1;
        let reply = self.transport.send(peer, message).await;
        if let Some(count) = self.progress.lock().in_flight.get_mut(peer) {
            *count = count.saturating_sub(1);
        }

        match reply {
            Ok(PeerMessage::AppendEntriesReply { term: reply_term, success, match_index, conflict_hint }) => {
                if self.observe_term(reply_term) {
                    return;
                }
                let mut progress = self.progress.lock();
                if success {
                    progress.on_append_success(peer, match_index);
                } else {
                    progress.on_append_rejected(peer, conflict_hint);
                }
            }
            Ok(other) => {
                if let Some(reply_term) = other.term() {
                    self.observe_term(reply_term);
                }
            }
            Err(e) => {
                debug!(peer = %peer, error = %e, "replication send failed");
            }
        }
    }

    /// Move `commit_index` to the highest index `followers` has
    /// acknowledged a majority of, and feed each newly committed entry's
    /// age into the batch-size controller (spec section 4.5.4).
    ///
    /// `followers` is the flat membership `all_members()` returns, so
    /// during a joint configuration change this computes an ordinary
    /// majority over old ∪ new rather than `MembershipConfig::is_committed`'s
    /// two-independent-majorities rule; see `DESIGN.md`.
    fn try_advance_commit_index(&self, term: Term, followers: &[NodeId], leader_last_index: u64) {
        let candidate = self.progress.lock().majority_match_index(followers, leader_last_index);
        if candidate == 0 {
            return;
        }
        let before = self.log.lock().commit_index;
        if !self.log.lock().advance_commit_index(candidate, term) {
            return;
        }
        let now = self.clock.now_millis();
        let mut proposed = self.proposed_at_millis.lock();
        for index in (before + 1)..=candidate {
            if let Some(started) = proposed.remove(&index) {
                self.batch_controller.lock().observe_commit_latency(now.saturating_sub(started));
            }
        }
        drop(proposed);
        info!(target: "audit", node = %self.node_id, commit_index = candidate, "advanced commit index");
    }

    /// Step down to FOLLOWER if `observed_term` exceeds our current term
    /// (spec section 4.5.2). Returns whether a step-down occurred.
    fn observe_term(&self, observed_term: Term) -> bool {
        let mut view = self.view.lock();
        let stepped_down = view.observe_term(observed_term);
        if stepped_down {
            let _ = self.persist_term_and_vote(&view);
        }
        stepped_down
    }

    fn handle_request_vote(
        &self,
        term: Term,
        candidate_id: NodeId,
        last_log_index: u64,
        last_log_term: Term,
    ) -> PeerMessage {
        self.observe_term(term);
        let mut view = self.view.lock();
        let log = self.log.lock();
        let up_to_date = candidate_log_is_up_to_date(last_log_term, last_log_index, log.last_log_term(), log.last_log_index());
        let granted = should_grant_vote(
            term,
            view.current_term,
            view.voted_for.as_ref().map(NodeId::as_str),
            candidate_id.as_str(),
            up_to_date,
        );
        if granted {
            view.voted_for = Some(candidate_id);
            let _ = self.persist_term_and_vote(&view);
            self.reset_election_deadline();
        }
        PeerMessage::RequestVoteReply { term: view.current_term, vote_granted: granted }
    }

    fn handle_append_entries(
        &self,
        term: Term,
        leader_id: NodeId,
        prev_log_index: u64,
        prev_log_term: Term,
        entries: Vec<shared_types::ipc::WireLogEntry>,
        leader_commit_index: u64,
    ) -> PeerMessage {
        self.observe_term(term);
        let current_term = self.view.lock().current_term;
        if term < current_term {
            return PeerMessage::AppendEntriesReply { term: current_term, success: false, match_index: 0, conflict_hint: None };
        }
        self.reset_election_deadline();
        {
            let mut view = self.view.lock();
            view.role = Role::Follower;
            view.leader_id = Some(leader_id);
        }

        let mut log = self.log.lock();
        if !log.matches_at(prev_log_index, prev_log_term) {
            let conflict_hint = (1..=prev_log_index).rev().find(|i| log.term_at(*i) == Some(prev_log_term));
            return PeerMessage::AppendEntriesReply { term: current_term, success: false, match_index: log.last_log_index(), conflict_hint };
        }
        let new_entries: Vec<LogEntry> = entries
            .into_iter()
            .map(|e| LogEntry { index: e.index, term: e.term, batch: e.batch, status: EntryStatus::Replicated })
            .collect();
        for entry in &new_entries {
            let _ = self.state_store.append_log_entry(entry);
        }
        log.append_entries(prev_log_index, new_entries);
        if leader_commit_index > log.commit_index {
            let candidate = leader_commit_index.min(log.last_log_index());
            if let Some(entry_term) = log.term_at(candidate) {
                log.advance_commit_index(candidate, entry_term);
            }
        }
        PeerMessage::AppendEntriesReply { term: current_term, success: true, match_index: log.last_log_index(), conflict_hint: None }
    }

    fn handle_heartbeat(&self, term: Term, leader_id: NodeId, leader_commit_index: u64) -> PeerMessage {
        self.observe_term(term);
        self.reset_election_deadline();
        let current_term = self.view.lock().current_term;
        if term < current_term {
            return PeerMessage::AppendEntriesReply { term: current_term, success: false, match_index: 0, conflict_hint: None };
        }
        {
            let mut view = self.view.lock();
            view.role = Role::Follower;
            view.leader_id = Some(leader_id);
        }
        let mut log = self.log.lock();
        if leader_commit_index > log.commit_index {
            let candidate = leader_commit_index.min(log.last_log_index());
            if let Some(entry_term) = log.term_at(candidate) {
                log.advance_commit_index(candidate, entry_term);
            }
        }
        PeerMessage::AppendEntriesReply { term: current_term, success: true, match_index: log.last_log_index(), conflict_hint: None }
    }

    #[must_use]
    pub fn batch_size_hint(&self) -> usize {
        self.batch_controller.lock().current
    }

    pub fn observe_commit_latency(&self, observed_ms: u64) {
        self.batch_controller.lock().observe_commit_latency(observed_ms);
    }
}

impl<T, S> ConsensusApi for ConsensusService<T, S>
where
    T: PeerBroadcaster,
    S: ConsensusStateStore,
{
    fn propose(&self, batch: Batch) -> Result<u64, ConsensusError> {
        let mut view_guard = self.view.lock();
        if view_guard.role != Role::Leader {
            return Err(ConsensusError::NotLeader);
        }
        let term = view_guard.current_term;
        drop(view_guard);
        let mut log = self.log.lock();
        let index = log.leader_append(term, batch);
        let entry = log.get(index).expect("just appended").clone();
        drop(log);
        self.state_store.append_log_entry(&entry)?;
        self.proposed_at_millis.lock().insert(index, self.clock.now_millis());
        debug!(index, term, "proposed batch");
        Ok(index)
    }

    fn handle_peer_message(&self, _sender: NodeId, message: PeerMessage) -> PeerMessage {
        match message {
            PeerMessage::RequestVote { term, candidate_id, last_log_index, last_log_term } => {
                self.handle_request_vote(term, candidate_id, last_log_index, last_log_term)
            }
            PeerMessage::AppendEntries { term, leader_id, prev_log_index, prev_log_term, entries, leader_commit_index } => {
                self.handle_append_entries(term, leader_id, prev_log_index, prev_log_term, entries, leader_commit_index)
            }
            PeerMessage::Heartbeat { term, leader_id, leader_commit_index } => {
                self.handle_heartbeat(term, leader_id, leader_commit_index)
            }
            other => other,
        }
    }

    fn current_role(&self) -> Role {
        self.view.lock().role
    }

    fn current_term(&self) -> Term {
        self.view.lock().current_term
    }

    fn leader_id(&self) -> Option<NodeId> {
        self.view.lock().leader_id.clone()
    }

    fn commit_index(&self) -> u64 {
        self.log.lock().commit_index
    }

    fn committed_unapplied(&self) -> Vec<LogEntry> {
        let log = self.log.lock();
        log.committed_unapplied().into_iter().cloned().collect()
    }

    fn acknowledge_applied(&self, index: u64) -> Result<(), ConsensusError> {
        self.log.lock().mark_applied(index);
        self.state_store.save_applied_index(index)
    }
}

/// Hint a client or peer toward the believed current leader, for
/// `SubmitOutcome::NotLeader` (spec section 6).
#[must_use]
pub fn leader_hint<T, S>(service: &ConsensusService<T, S>) -> SubmitOutcome
where
    T: PeerBroadcaster,
    S: ConsensusStateStore,
{
    SubmitOutcome::NotLeader { hint: LeaderHint(service.leader_id().map(|n| n.as_str().to_string())) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::entities::{SubmitterId, Transaction, TransactionId};

    struct NullStateStore;

    impl ConsensusStateStore for NullStateStore {
        fn save_term(&self, _term: Term) -> Result<(), ConsensusError> {
            Ok(())
        }
        fn load_term(&self) -> Result<Term, ConsensusError> {
            Ok(0)
        }
        fn save_voted_for(&self, _candidate: Option<&str>) -> Result<(), ConsensusError> {
            Ok(())
        }
        fn load_voted_for(&self) -> Result<Option<String>, ConsensusError> {
            Ok(None)
        }
        fn append_log_entry(&self, _entry: &LogEntry) -> Result<(), ConsensusError> {
            Ok(())
        }
        fn load_log(&self) -> Result<Vec<LogEntry>, ConsensusError> {
            Ok(Vec::new())
        }
        fn save_applied_index(&self, _index: u64) -> Result<(), ConsensusError> {
            Ok(())
        }
        fn load_applied_index(&self) -> Result<u64, ConsensusError> {
            Ok(0)
        }
    }

    struct ZeroTimeout;

    impl ElectionTimeoutSource for ZeroTimeout {
        fn next_timeout_millis(&self) -> u64 {
            0
        }
    }

    struct FixedClock(AtomicU64);

    impl Clock for FixedClock {
        fn now_millis(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Grants every vote and acknowledges every `AppendEntries`/
    /// `Heartbeat` it receives, echoing back the sender's term and the
    /// highest index it was sent.
    struct AlwaysAckBroadcaster;

    #[async_trait::async_trait]
    impl PeerBroadcaster for AlwaysAckBroadcaster {
        async fn send(&self, _target: &NodeId, message: PeerMessage) -> Result<PeerMessage, ConsensusError> {
            match message {
                PeerMessage::RequestVote { term, .. } => Ok(PeerMessage::RequestVoteReply { term, vote_granted: true }),
                PeerMessage::AppendEntries { term, entries, .. } => {
                    let match_index = entries.last().map_or(0, |e| e.index);
                    Ok(PeerMessage::AppendEntriesReply { term, success: true, match_index, conflict_hint: None })
                }
                PeerMessage::Heartbeat { term, leader_commit_index, .. } => {
                    Ok(PeerMessage::AppendEntriesReply { term, success: true, match_index: leader_commit_index, conflict_hint: None })
                }
                other => Ok(other),
            }
        }
    }

    fn build_service(validators: Vec<NodeId>, node_id: NodeId) -> ConsensusService<AlwaysAckBroadcaster, NullStateStore> {
        ConsensusService::new(ConsensusDependencies {
            transport: Arc::new(AlwaysAckBroadcaster),
            state_store: Arc::new(NullStateStore),
            clock: Arc::new(FixedClock(AtomicU64::new(0))),
            election_timeout: Arc::new(ZeroTimeout),
            node_id,
            validators,
        })
    }

    fn sample_batch(leader: &str) -> Batch {
        Batch {
            sequence: 0,
            term: 0,
            leader_id: NodeId::new(leader),
            transactions: vec![Transaction {
                id: TransactionId("t1".into()),
                payload: vec![1],
                submitter: SubmitterId("alice".into()),
                nonce: 0,
                submit_timestamp: 0,
                signature: vec![],
            }],
            payload_digest: [0u8; 32],
            proposer_signature: Vec::new(),
            previous_batch_digest: None,
        }
    }

    #[tokio::test]
    async fn single_node_leader_self_commits_without_peers() {
        let service = build_service(vec![NodeId::new("v1")], NodeId::new("v1"));
        service.start_election().await;
        assert_eq!(service.current_role(), Role::Leader);

        let index = service.propose(sample_batch("v1")).unwrap();
        service.on_timer_tick().await;

        assert_eq!(service.commit_index(), index);
        assert_eq!(service.committed_unapplied().len(), 1);
    }

    #[tokio::test]
    async fn leader_replicates_entries_and_commits_after_majority_ack() {
        let service = build_service(vec![NodeId::new("v1"), NodeId::new("v2")], NodeId::new("v1"));
        service.start_election().await;
        assert_eq!(service.current_role(), Role::Leader);

        let index = service.propose(sample_batch("v1")).unwrap();
        assert_eq!(service.commit_index(), 0, "nothing committed before a follower acknowledges");

        service.on_timer_tick().await;
        assert_eq!(service.commit_index(), index);
    }

    #[tokio::test]
    async fn commit_feeds_batch_controller_latency_observation() {
        let service = build_service(vec![NodeId::new("v1")], NodeId::new("v1"));
        service.start_election().await;
        let before = service.batch_size_hint();
        service.propose(sample_batch("v1")).unwrap();
        service.on_timer_tick().await;
        // A fast (0ms) observed commit latency should grow the hint by
        // one step, never shrink it.
        assert!(service.batch_size_hint() >= before);
    }
}
