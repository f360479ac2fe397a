//! Ingress-stage deduplication by `(submitter, nonce)` within a sliding
//! window (spec section 4.6, stage 1).

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;
use shared_types::entities::SubmitterId;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct Key(SubmitterId, u64);

pub struct SubmissionDedup {
    capacity: usize,
    seen: Mutex<(HashSet<Key>, VecDeque<Key>)>,
}

impl SubmissionDedup {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity, seen: Mutex::new((HashSet::new(), VecDeque::new())) }
    }

    /// Returns `true` if this is the first time `(submitter, nonce)` has
    /// been observed within the window.
    pub fn observe(&self, submitter: &SubmitterId, nonce: u64) -> bool {
        let key = Key(submitter.clone(), nonce);
        let mut guard = self.seen.lock();
        let (set, order) = &mut *guard;
        if !set.insert(key.clone()) {
            return false;
        }
        order.push_back(key);
        if order.len() > self.capacity {
            if let Some(evicted) = order.pop_front() {
                set.remove(&evicted);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_accepted_repeat_is_rejected() {
        let dedup = SubmissionDedup::new(4);
        let submitter = SubmitterId("alice".into());
        assert!(dedup.observe(&submitter, 1));
        assert!(!dedup.observe(&submitter, 1));
    }

    #[test]
    fn window_eviction_allows_reuse_once_evicted() {
        let dedup = SubmissionDedup::new(2);
        let submitter = SubmitterId("alice".into());
        assert!(dedup.observe(&submitter, 1));
        assert!(dedup.observe(&submitter, 2));
        assert!(dedup.observe(&submitter, 3));
        assert!(dedup.observe(&submitter, 1));
    }
}
