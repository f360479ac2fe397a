use dashmap::DashMap;
use shared_types::entities::SubmitterId;

use crate::ports::outbound::NonceLedger;

/// Process-local nonce ledger, useful for tests and single-node
/// deployments where the authoritative nonce record lives entirely in
/// the Encrypted Store's committed-transaction history rather than a
/// separate index.
#[derive(Default)]
pub struct InMemoryNonceLedger {
    last: DashMap<SubmitterId, u64>,
}

impl NonceLedger for InMemoryNonceLedger {
    fn last_known_nonce(&self, submitter: &SubmitterId) -> Option<u64> {
        self.last.get(submitter).map(|v| *v)
    }

    fn record_nonce(&self, submitter: &SubmitterId, nonce: u64) {
        self.last
            .entry(submitter.clone())
            .and_modify(|existing| *existing = (*existing).max(nonce))
            .or_insert(nonce);
    }
}
