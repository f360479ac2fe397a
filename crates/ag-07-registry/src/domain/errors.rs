use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("node already registered")]
    AlreadyRegistered,
    #[error("node not found")]
    NotFound,
    #[error("membership change already in progress")]
    MembershipChangeInProgress,
}
