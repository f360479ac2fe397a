//! Error kinds for the node state manager (spec section 4.3/7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeStateError {
    #[error("node {0} already known")]
    AlreadyExists(String),

    #[error("node {0} unknown")]
    NotFound(String),

    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("persistence failure: {0}")]
    PersistenceError(String),
}

impl From<ag_02_store::StoreError> for NodeStateError {
    fn from(err: ag_02_store::StoreError) -> Self {
        NodeStateError::PersistenceError(err.to_string())
    }
}
