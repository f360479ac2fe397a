//! # Crypto Primitives
//!
//! AES-256-GCM encryption at rest, HKDF/Argon2id key derivation, and
//! pluggable digital signatures (spec section 4.1). Every other Aurigraph
//! crate that touches key material goes through this crate rather than
//! reaching for a cipher crate directly.

pub mod errors;
pub mod iv;
pub mod kdf;
pub mod key_manager;
pub mod layer;
pub mod signatures;
pub mod symmetric;

pub use errors::CryptoError;
pub use iv::IvGenerator;
pub use kdf::{derive_layer_key, derive_master, derive_master_with_params};
pub use key_manager::{EncryptionKey, KeyManager};
pub use layer::Layer;
pub use signatures::{scheme_by_name, Dilithium5Scheme, Ed25519Scheme, SignatureScheme};
pub use symmetric::{decrypt, encrypt, EncryptedValue, SecretKey};
