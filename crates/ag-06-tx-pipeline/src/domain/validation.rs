//! Ingress and pre-batch validation (spec section 4.6, stages 1 and 3).

use shared_types::entities::Transaction;

use super::errors::PipelineError;

/// Signature presence and payload-size checks performed at Ingress,
/// before the transaction enters any queue.
pub fn validate_ingress(tx: &Transaction) -> Result<(), PipelineError> {
    if tx.payload.is_empty() {
        return Err(PipelineError::InvalidInput("empty payload".into()));
    }
    if tx.payload.len() > Transaction::MAX_PAYLOAD_BYTES {
        return Err(PipelineError::InvalidInput(format!(
            "payload {} bytes exceeds cap of {} bytes",
            tx.payload.len(),
            Transaction::MAX_PAYLOAD_BYTES
        )));
    }
    if tx.signature.is_empty() {
        return Err(PipelineError::InvalidInput("missing signature".into()));
    }
    Ok(())
}

/// Business-rule (pre-batch) validation against currently committed
/// state (spec section 4.6, stage 3). The nonce check here is the
/// monotonicity rule; balance/contract-state checks are delegated to the
/// caller-supplied `state_check` since they depend on the application
/// domain built on top of the raw KV store.
pub fn validate_pre_batch(
    tx: &Transaction,
    last_known_nonce: Option<u64>,
) -> Result<(), PipelineError> {
    if let Some(last) = last_known_nonce {
        if tx.nonce <= last {
            return Err(PipelineError::ValidationFailed(format!(
                "nonce {} is not greater than last known nonce {last}",
                tx.nonce
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::entities::{SubmitterId, TransactionId};

    fn tx(nonce: u64) -> Transaction {
        Transaction {
            id: TransactionId("t1".into()),
            payload: vec![1, 2, 3],
            submitter: SubmitterId("alice".into()),
            nonce,
            submit_timestamp: 0,
            signature: vec![9],
        }
    }

    #[test]
    fn empty_payload_rejected() {
        let mut t = tx(1);
        t.payload.clear();
        assert!(validate_ingress(&t).is_err());
    }

    #[test]
    fn oversized_payload_rejected() {
        let mut t = tx(1);
        t.payload = vec![0u8; Transaction::MAX_PAYLOAD_BYTES + 1];
        assert!(validate_ingress(&t).is_err());
    }

    #[test]
    fn payload_at_cap_accepted() {
        let mut t = tx(1);
        t.payload = vec![0u8; Transaction::MAX_PAYLOAD_BYTES];
        assert!(validate_ingress(&t).is_ok());
    }

    #[test]
    fn missing_signature_rejected() {
        let mut t = tx(1);
        t.signature.clear();
        assert!(validate_ingress(&t).is_err());
    }

    #[test]
    fn nonce_must_increase() {
        assert!(validate_pre_batch(&tx(5), Some(4)).is_ok());
        assert!(validate_pre_batch(&tx(4), Some(4)).is_err());
        assert!(validate_pre_batch(&tx(1), None).is_ok());
    }
}
