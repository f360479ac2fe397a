//! Pluggable digital signatures (spec section 4.1). The default scheme is
//! a post-quantum lattice signature at NIST Level 5 (Dilithium5); Ed25519
//! remains available as a lightweight alternative for tests and
//! development profiles where the larger PQ keys/signatures are overkill.

use pqcrypto_dilithium::dilithium5;
use pqcrypto_traits::sign::{
    DetachedSignature as _, PublicKey as _, SecretKey as _,
};
use zeroize::Zeroize;

use crate::errors::CryptoError;

/// A keypair and verification/signing operations for one signature scheme.
/// Each scheme owns its own key encoding; callers should not assume a
/// fixed key or signature length across schemes.
pub trait SignatureScheme: Send + Sync {
    /// Stable scheme identifier, persisted alongside keys so a verifier
    /// knows which algorithm to parse bytes with.
    fn scheme_id(&self) -> &'static str;

    /// Sign `message`, returning a detached signature.
    fn sign(&self, secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Verify `signature` over `message` under `public_key`.
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, CryptoError>;

    /// Generate a fresh keypair, returning `(public_key, secret_key)`.
    fn generate_keypair(&self) -> (Vec<u8>, Vec<u8>);
}

/// Dilithium5: the default scheme (spec section 4.1), NIST PQC Level 5.
#[derive(Debug, Default, Clone, Copy)]
pub struct Dilithium5Scheme;

impl SignatureScheme for Dilithium5Scheme {
    fn scheme_id(&self) -> &'static str {
        "dilithium5"
    }

    fn sign(&self, secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let sk = dilithium5::SecretKey::from_bytes(secret_key)
            .map_err(|_| CryptoError::InvalidKeyMaterial("malformed dilithium5 secret key".into()))?;
        let sig = dilithium5::detached_sign(message, &sk);
        Ok(sig.as_bytes().to_vec())
    }

    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        let pk = dilithium5::PublicKey::from_bytes(public_key)
            .map_err(|_| CryptoError::InvalidKeyMaterial("malformed dilithium5 public key".into()))?;
        let sig = dilithium5::DetachedSignature::from_bytes(signature)
            .map_err(|_| CryptoError::InvalidSignature)?;
        Ok(dilithium5::verify_detached_signature(&sig, message, &pk).is_ok())
    }

    fn generate_keypair(&self) -> (Vec<u8>, Vec<u8>) {
        let (pk, sk) = dilithium5::keypair();
        (pk.as_bytes().to_vec(), sk.as_bytes().to_vec())
    }
}

/// Ed25519: the lightweight alternative scheme, for test and dev profiles.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Scheme;

impl SignatureScheme for Ed25519Scheme {
    fn scheme_id(&self) -> &'static str {
        "ed25519"
    }

    fn sign(&self, secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        use ed25519_dalek::Signer;
        let bytes: [u8; 32] =
            secret_key.try_into().map_err(|_| CryptoError::InvalidKeyMaterial("ed25519 secret key must be 32 bytes".into()))?;
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&bytes);
        Ok(signing_key.sign(message).to_bytes().to_vec())
    }

    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        use ed25519_dalek::Verifier;
        let pk_bytes: [u8; 32] =
            public_key.try_into().map_err(|_| CryptoError::InvalidKeyMaterial("ed25519 public key must be 32 bytes".into()))?;
        let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(&pk_bytes)
            .map_err(|_| CryptoError::InvalidKeyMaterial("malformed ed25519 public key".into()))?;
        let sig_bytes: [u8; 64] =
            signature.try_into().map_err(|_| CryptoError::InvalidSignature)?;
        let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        Ok(verifying_key.verify(message, &signature).is_ok())
    }

    fn generate_keypair(&self) -> (Vec<u8>, Vec<u8>) {
        use rand::rngs::OsRng;
        let mut csprng = OsRng;
        let signing_key = ed25519_dalek::SigningKey::generate(&mut csprng);
        let verifying_key = signing_key.verifying_key();
        let mut secret_bytes = signing_key.to_bytes().to_vec();
        let result = (verifying_key.to_bytes().to_vec(), secret_bytes.clone());
        secret_bytes.zeroize();
        result
    }
}

/// Construct the configured default scheme by name, as read from
/// `node-runtime`'s configuration (spec section 4.1 names `dilithium5` as
/// the default, `ed25519` as the lightweight alternative).
pub fn scheme_by_name(name: &str) -> Result<Box<dyn SignatureScheme>, CryptoError> {
    match name {
        "dilithium5" => Ok(Box::new(Dilithium5Scheme)),
        "ed25519" => Ok(Box::new(Ed25519Scheme)),
        other => Err(CryptoError::InvalidKeyMaterial(format!("unknown signature scheme '{other}'"))),
    }
}
