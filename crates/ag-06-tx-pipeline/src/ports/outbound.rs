use shared_types::entities::SubmitterId;

/// Tracks the last nonce observed per submitter, for the pre-batch
/// monotonicity check (spec section 4.6, stage 3). Backed in practice by
/// the Encrypted Store under a `nonce:{submitter}` prefix.
pub trait NonceLedger: Send + Sync {
    fn last_known_nonce(&self, submitter: &SubmitterId) -> Option<u64>;
    fn record_nonce(&self, submitter: &SubmitterId, nonce: u64);
}

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }
}
