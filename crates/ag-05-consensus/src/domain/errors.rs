use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("safety invariant violated: {0}")]
    SafetyViolation(String),
    #[error("not the current leader")]
    NotLeader,
    #[error("stale term {received}, current term is {current}")]
    StaleTerm { received: u64, current: u64 },
    #[error("unknown validator {0}")]
    UnknownValidator(String),
    #[error("membership change already in progress")]
    MembershipChangeInProgress,
    #[error("persistence error: {0}")]
    PersistenceError(String),
    #[error("transport error: {0}")]
    TransportError(String),
}

impl From<ag_02_store::StoreError> for ConsensusError {
    fn from(err: ag_02_store::StoreError) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl From<ag_04_transport::TransportError> for ConsensusError {
    fn from(err: ag_04_transport::TransportError) -> Self {
        Self::TransportError(err.to_string())
    }
}
