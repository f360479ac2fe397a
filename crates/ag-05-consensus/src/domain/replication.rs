//! Leader-side replication bookkeeping (spec section 4.5.3/4.5.4):
//! per-follower match indices, the majority-commit computation, and the
//! adaptive batch-size controller.

use std::collections::HashMap;

use shared_types::entities::NodeId;

use super::election::quorum_size;

/// Tracks, for a leader, the highest log index each follower is known to
/// have persisted (`match_index`) and the next index to send it
/// (`next_index`), per spec section 4.5.4's pipelining model.
#[derive(Default)]
pub struct FollowerProgress {
    pub match_index: HashMap<NodeId, u64>,
    pub next_index: HashMap<NodeId, u64>,
    pub in_flight: HashMap<NodeId, usize>,
}

impl FollowerProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init_follower(&mut self, follower: NodeId, leader_last_log_index: u64) {
        self.next_index.insert(follower.clone(), leader_last_log_index + 1);
        self.match_index.insert(follower.clone(), 0);
        self.in_flight.insert(follower, 0);
    }

    pub fn on_append_success(&mut self, follower: &NodeId, new_match_index: u64) {
        self.match_index.insert(follower.clone(), new_match_index);
        self.next_index.insert(follower.clone(), new_match_index + 1);
    }

    /// Retreat `next_index` for `follower` toward `conflict_hint` (or by
    /// one if no hint), per spec section 4.5.3: "the leader retreats
    /// prev_log_index until a match is found."
    pub fn on_append_rejected(&mut self, follower: &NodeId, conflict_hint: Option<u64>) {
        let current = *self.next_index.get(follower).unwrap_or(&1);
        let retreated = conflict_hint.unwrap_or(current.saturating_sub(1)).max(1);
        self.next_index.insert(follower.clone(), retreated.min(current.saturating_sub(1).max(1)));
    }

    #[must_use]
    pub fn may_send_more(&self, follower: &NodeId, pipeline_depth: usize) -> bool {
        *self.in_flight.get(follower).unwrap_or(&0) < pipeline_depth
    }

    /// The highest index replicated to a strict majority of `validator_set`
    /// (leader's own log counts as already-replicated to itself).
    #[must_use]
    pub fn majority_match_index(&self, validator_set: &[NodeId], leader_last_log_index: u64) -> u64 {
        let mut indices: Vec<u64> =
            validator_set.iter().map(|v| *self.match_index.get(v).unwrap_or(&0)).collect();
        indices.push(leader_last_log_index);
        indices.sort_unstable();
        let quorum = quorum_size(indices.len());
        indices[indices.len() - quorum]
    }
}

/// Additive-increase / multiplicative-decrease batch-size controller
/// (spec section 4.5.4): grows toward `target_commit_latency`, shrinks on
/// overshoot, always within `[min_batch, max_batch]`.
pub struct BatchSizeController {
    pub current: usize,
    pub min_batch: usize,
    pub max_batch: usize,
    pub target_commit_latency_ms: u64,
}

impl BatchSizeController {
    #[must_use]
    pub fn new(min_batch: usize, max_batch: usize, target_commit_latency_ms: u64) -> Self {
        Self { current: min_batch, min_batch, max_batch, target_commit_latency_ms }
    }

    /// Feed an observed commit latency, adjusting `current` for the next
    /// batch. A pluggable advisor may suggest a value via
    /// [`Self::apply_advisor_suggestion`] but can never escape
    /// `[min_batch, max_batch]` (spec section 4.5.4: "cannot override the
    /// safety bounds").
    pub fn observe_commit_latency(&mut self, observed_ms: u64) {
        if observed_ms > self.target_commit_latency_ms {
            self.current = (self.current / 2).max(self.min_batch);
        } else {
            self.current = (self.current + 1).min(self.max_batch);
        }
    }

    pub fn apply_advisor_suggestion(&mut self, suggested: usize) {
        self.current = suggested.clamp(self.min_batch, self.max_batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn majority_match_index_is_median_with_leader_counted() {
        let mut progress = FollowerProgress::new();
        let validators = vec![NodeId::new("v2"), NodeId::new("v3"), NodeId::new("v4"), NodeId::new("v5")];
        for v in &validators {
            progress.init_follower(v.clone(), 0);
        }
        progress.on_append_success(&NodeId::new("v2"), 5);
        progress.on_append_success(&NodeId::new("v3"), 5);
        // v4, v5 lag at 0; leader (self) is at 5.
        let result = progress.majority_match_index(&validators, 5);
        assert_eq!(result, 5);
    }

    #[test]
    fn rejected_append_retreats_next_index() {
        let mut progress = FollowerProgress::new();
        let follower = NodeId::new("v2");
        progress.init_follower(follower.clone(), 10);
        progress.on_append_rejected(&follower, Some(3));
        assert!(*progress.next_index.get(&follower).unwrap() <= 3);
    }

    #[test]
    fn batch_controller_shrinks_on_overshoot_grows_otherwise() {
        let mut ctrl = BatchSizeController::new(10, 1000, 100);
        ctrl.current = 200;
        ctrl.observe_commit_latency(150);
        assert_eq!(ctrl.current, 100);
        ctrl.observe_commit_latency(50);
        assert_eq!(ctrl.current, 101);
    }

    #[test]
    fn batch_controller_never_exceeds_bounds() {
        let mut ctrl = BatchSizeController::new(10, 20, 100);
        for _ in 0..100 {
            ctrl.observe_commit_latency(10);
        }
        assert_eq!(ctrl.current, 20);
        ctrl.apply_advisor_suggestion(10_000);
        assert_eq!(ctrl.current, 20);
        ctrl.apply_advisor_suggestion(0);
        assert_eq!(ctrl.current, 10);
    }
}
