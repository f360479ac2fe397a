use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("overloaded")]
    Overloaded,
    #[error("no leader known")]
    NoLeader,
    #[error("duplicate submission for (submitter, nonce)")]
    DuplicateSubmission,
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("persistence error: {0}")]
    PersistenceError(String),
}

impl From<ag_02_store::StoreError> for PipelineError {
    fn from(err: ag_02_store::StoreError) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl From<ag_05_consensus::ConsensusError> for PipelineError {
    fn from(err: ag_05_consensus::ConsensusError) -> Self {
        match err {
            ag_05_consensus::ConsensusError::NotLeader => Self::NoLeader,
            other => Self::PersistenceError(other.to_string()),
        }
    }
}
