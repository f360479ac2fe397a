//! Maps every crate-local error onto [`AurigraphError`] at the runtime's
//! outermost boundary (spec section 7). Each `ag-*` crate keeps its own
//! narrow `thiserror` enum; this is the one place that knows about all of
//! them at once, so the mapping lives here rather than as `From` impls
//! scattered (and orphan-rule-blocked) across the library crates.

use shared_types::errors::{AurigraphError, LeaderHint};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct RuntimeError(pub AurigraphError);

impl From<AurigraphError> for RuntimeError {
    fn from(err: AurigraphError) -> Self {
        Self(err)
    }
}

impl From<ag_02_store::StoreError> for RuntimeError {
    fn from(err: ag_02_store::StoreError) -> Self {
        use ag_02_store::StoreError as E;
        Self(match err {
            E::InvalidInput(m) => AurigraphError::InvalidInput(m),
            E::Unauthorized => AurigraphError::Unauthorized,
            E::Forbidden(m) => AurigraphError::Forbidden(m),
            E::NotFound => AurigraphError::InvalidInput("not found".into()),
            E::PersistenceError(m) => AurigraphError::PersistenceError(m),
            E::Tampered => AurigraphError::Tampered,
            E::UnknownKeyVersion(v) => AurigraphError::UnknownKeyVersion(v),
            E::InvalidFormat(m) => AurigraphError::InvalidFormat(m),
        })
    }
}

impl From<ag_03_node_state::NodeStateError> for RuntimeError {
    fn from(err: ag_03_node_state::NodeStateError) -> Self {
        use ag_03_node_state::NodeStateError as E;
        Self(match err {
            E::AlreadyExists(m) => AurigraphError::InvalidInput(format!("already exists: {m}")),
            E::NotFound(m) => AurigraphError::InvalidInput(format!("not found: {m}")),
            E::InvalidTransition(m) => AurigraphError::InvalidTransition(m),
            E::PersistenceError(m) => AurigraphError::PersistenceError(m),
        })
    }
}

impl From<ag_04_transport::TransportError> for RuntimeError {
    fn from(err: ag_04_transport::TransportError) -> Self {
        use ag_04_transport::TransportError as E;
        Self(match err {
            E::UnknownPeer(m) => AurigraphError::InvalidInput(format!("unknown peer: {m}")),
            E::ReplayDetected(m) => AurigraphError::Forbidden(format!("replay detected from {m}")),
            E::InvalidSignature(m) => AurigraphError::Forbidden(format!("invalid signature from {m}")),
            E::Disconnected(m) => AurigraphError::Transient(format!("disconnected: {m}")),
            E::Timeout(_) => AurigraphError::Timeout,
            E::CircuitOpen(_) => AurigraphError::Overloaded,
        })
    }
}

impl From<ag_05_consensus::ConsensusError> for RuntimeError {
    fn from(err: ag_05_consensus::ConsensusError) -> Self {
        use ag_05_consensus::ConsensusError as E;
        Self(match err {
            E::SafetyViolation(m) => AurigraphError::SafetyViolation(m),
            E::NotLeader => AurigraphError::NotLeader(LeaderHint(None)),
            E::StaleTerm { received, current } => {
                AurigraphError::Transient(format!("stale term: received {received}, current {current}"))
            }
            E::UnknownValidator(m) => AurigraphError::InvalidInput(format!("unknown validator: {m}")),
            E::MembershipChangeInProgress => AurigraphError::Transient("membership change in progress".into()),
            E::PersistenceError(m) => AurigraphError::PersistenceError(m),
            E::TransportError(m) => AurigraphError::Transient(m),
        })
    }
}

impl From<ag_06_tx_pipeline::PipelineError> for RuntimeError {
    fn from(err: ag_06_tx_pipeline::PipelineError) -> Self {
        use ag_06_tx_pipeline::PipelineError as E;
        Self(match err {
            E::InvalidInput(m) => AurigraphError::InvalidInput(m),
            E::Overloaded => AurigraphError::Overloaded,
            E::NoLeader => AurigraphError::NotLeader(LeaderHint(None)),
            E::DuplicateSubmission => AurigraphError::InvalidInput("duplicate submission".into()),
            E::ValidationFailed(m) => AurigraphError::InvalidInput(m),
            E::PersistenceError(m) => AurigraphError::PersistenceError(m),
        })
    }
}

impl From<ag_07_registry::RegistryError> for RuntimeError {
    fn from(err: ag_07_registry::RegistryError) -> Self {
        use ag_07_registry::RegistryError as E;
        Self(match err {
            E::AlreadyRegistered => AurigraphError::InvalidInput("node already registered".into()),
            E::NotFound => AurigraphError::InvalidInput("node not found".into()),
            E::MembershipChangeInProgress => AurigraphError::Transient("membership change in progress".into()),
        })
    }
}

impl From<ag_08_observability::ObservabilityError> for RuntimeError {
    fn from(err: ag_08_observability::ObservabilityError) -> Self {
        use ag_08_observability::ObservabilityError as E;
        Self(match err {
            E::Registry(m) => AurigraphError::PersistenceError(m),
        })
    }
}
