//! Error kinds for the encrypted store (spec section 7's taxonomy,
//! narrowed to what this crate can actually produce).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found")]
    NotFound,

    #[error("persistence failure: {0}")]
    PersistenceError(String),

    #[error("cryptographic tamper detected")]
    Tampered,

    #[error("unknown key version {0}")]
    UnknownKeyVersion(u32),

    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

impl From<shared_crypto::CryptoError> for StoreError {
    fn from(err: shared_crypto::CryptoError) -> Self {
        match err {
            shared_crypto::CryptoError::Tampered => StoreError::Tampered,
            shared_crypto::CryptoError::UnknownKeyVersion(v) => StoreError::UnknownKeyVersion(v),
            shared_crypto::CryptoError::InvalidFormat(m) => StoreError::InvalidFormat(m),
            other => StoreError::InvalidInput(other.to_string()),
        }
    }
}
