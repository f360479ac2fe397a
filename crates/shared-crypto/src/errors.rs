//! Crypto error types (spec section 7's crypto-failure kinds).

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Plaintext was empty for a layer that forbids it, or exceeded the
    /// layer's size cap.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// AEAD tag verification failed: the ciphertext was tampered with.
    #[error("tamper detected: authentication tag mismatch")]
    Tampered,

    /// The format-version byte did not match the expected value.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The key version required to decrypt has been destroyed or was
    /// never issued.
    #[error("unknown key version {0}")]
    UnknownKeyVersion(u32),

    /// Key generation or derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// Signature verification failed (as opposed to returning `false`,
    /// used where the API path requires an error, e.g. malformed input).
    #[error("invalid signature")]
    InvalidSignature,

    /// A public or private key was malformed.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),
}
