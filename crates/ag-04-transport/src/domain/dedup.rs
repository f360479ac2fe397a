//! Sliding-window deduplication for at-least-once delivery (spec section
//! 4.4): "receivers deduplicate by ID within a sliding window."

use std::collections::VecDeque;

use parking_lot::Mutex;

pub struct DedupWindow {
    capacity: usize,
    seen: Mutex<(std::collections::HashSet<String>, VecDeque<String>)>,
}

impl DedupWindow {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity, seen: Mutex::new((std::collections::HashSet::new(), VecDeque::new())) }
    }

    /// Returns `true` if `id` has not been seen within the current
    /// window (and records it), `false` if it's a duplicate.
    pub fn observe(&self, id: &str) -> bool {
        let mut guard = self.seen.lock();
        if guard.0.contains(id) {
            return false;
        }
        guard.0.insert(id.to_string());
        guard.1.push_back(id.to_string());
        if guard.1.len() > self.capacity {
            if let Some(evicted) = guard.1.pop_front() {
                guard.0.remove(&evicted);
            }
        }
        true
    }
}
