//! Batching (spec section 4.6, stage 4): "the leader appends the
//! transaction to the current open batch. Batches close on one of: size
//! threshold reached, time threshold expired, or the pipeline-depth slot
//! becomes available."

use std::time::Duration;

use shared_types::entities::Transaction;

pub struct BatchingPolicy {
    pub max_batch_size: usize,
    pub max_open_duration: Duration,
}

impl Default for BatchingPolicy {
    fn default() -> Self {
        Self { max_batch_size: 256, max_open_duration: Duration::from_millis(50) }
    }
}

/// The leader's single currently-open batch (spec: "one open batch at a
/// time per log index slot").
pub struct OpenBatch {
    transactions: Vec<Transaction>,
    opened_at_millis: u64,
}

impl OpenBatch {
    #[must_use]
    pub fn new(opened_at_millis: u64) -> Self {
        Self { transactions: Vec::new(), opened_at_millis }
    }

    pub fn push(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Whether this batch should close given the policy and current
    /// wall-clock time. A batch with no transactions never closes on
    /// elapsed time alone — there is nothing to propose.
    #[must_use]
    pub fn should_close(&self, policy: &BatchingPolicy, now_millis: u64) -> bool {
        if self.transactions.is_empty() {
            return false;
        }
        if self.transactions.len() >= policy.max_batch_size {
            return true;
        }
        now_millis.saturating_sub(self.opened_at_millis) >= policy.max_open_duration.as_millis() as u64
    }

    #[must_use]
    pub fn close(self) -> Vec<Transaction> {
        self.transactions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::entities::{SubmitterId, TransactionId};

    fn tx(nonce: u64) -> Transaction {
        Transaction {
            id: TransactionId(format!("t{nonce}")),
            payload: vec![1],
            submitter: SubmitterId("alice".into()),
            nonce,
            submit_timestamp: 0,
            signature: vec![9],
        }
    }

    #[test]
    fn empty_batch_never_closes_on_time() {
        let policy = BatchingPolicy { max_batch_size: 10, max_open_duration: Duration::from_millis(1) };
        let batch = OpenBatch::new(0);
        assert!(!batch.should_close(&policy, 1000));
    }

    #[test]
    fn closes_on_size_threshold() {
        let policy = BatchingPolicy { max_batch_size: 2, max_open_duration: Duration::from_secs(60) };
        let mut batch = OpenBatch::new(0);
        batch.push(tx(1));
        assert!(!batch.should_close(&policy, 0));
        batch.push(tx(2));
        assert!(batch.should_close(&policy, 0));
    }

    #[test]
    fn closes_on_time_threshold() {
        let policy = BatchingPolicy { max_batch_size: 1000, max_open_duration: Duration::from_millis(10) };
        let mut batch = OpenBatch::new(0);
        batch.push(tx(1));
        assert!(!batch.should_close(&policy, 5));
        assert!(batch.should_close(&policy, 11));
    }
}
