//! Nonce-monotonicity replay protection (spec section 4.4): "receivers
//! reject nonces <= last-seen from the same sender."

use dashmap::DashMap;
use shared_types::entities::NodeId;

#[derive(Default)]
pub struct NonceTracker {
    last_seen: DashMap<NodeId, u64>,
}

impl NonceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `nonce` from `sender` if it is strictly greater than the
    /// last one accepted from that sender, recording it as the new high
    /// water mark. Returns `false` (and does not advance the tracker) on
    /// a replayed or stale nonce.
    pub fn accept(&self, sender: &NodeId, nonce: u64) -> bool {
        let mut entry = self.last_seen.entry(sender.clone()).or_insert(0);
        if nonce > *entry {
            *entry = nonce;
            true
        } else {
            false
        }
    }
}
