//! Key derivation (spec section 4.1): HKDF-SHA256 to fan a master key out
//! into per-layer keys, and Argon2id to turn an operator passphrase into
//! that master key in the first place.

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use sha2::Sha256;

use crate::errors::CryptoError;
use crate::layer::Layer;
use crate::symmetric::SecretKey;

/// Floor parameters for the master Argon2id derivation (spec section 4.1):
/// memory >= 64 MiB, iterations >= 4, parallelism >= 4.
pub const MIN_MEMORY_KIB: u32 = 65_536;
pub const MIN_ITERATIONS: u32 = 4;
pub const MIN_PARALLELISM: u32 = 4;

/// Derive a 32-byte master key from an operator passphrase and a stored
/// salt, using Argon2id at or above the spec's floor parameters.
pub fn derive_master(passphrase: &[u8], salt: &[u8]) -> Result<SecretKey, CryptoError> {
    derive_master_with_params(passphrase, salt, MIN_MEMORY_KIB, MIN_ITERATIONS, MIN_PARALLELISM)
}

/// Same as [`derive_master`] but with explicit Argon2id cost parameters,
/// rejected if any falls below the spec's floor.
pub fn derive_master_with_params(
    passphrase: &[u8],
    salt: &[u8],
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
) -> Result<SecretKey, CryptoError> {
    if memory_kib < MIN_MEMORY_KIB || iterations < MIN_ITERATIONS || parallelism < MIN_PARALLELISM {
        return Err(CryptoError::KeyDerivationFailed(
            "argon2id parameters below the mandated floor (64 MiB / 4 iterations / 4 lanes)".into(),
        ));
    }
    let params = Params::new(memory_kib, iterations, parallelism, Some(32))
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt_string =
        SaltString::encode_b64(salt).map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    let hash = argon2
        .hash_password(passphrase, &salt_string)
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    let raw = hash.hash.ok_or_else(|| CryptoError::KeyDerivationFailed("argon2 produced no output hash".into()))?;
    let bytes = raw.as_bytes();
    if bytes.len() != 32 {
        return Err(CryptoError::KeyDerivationFailed(format!("unexpected argon2 output length {}", bytes.len())));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(bytes);
    Ok(SecretKey::from_bytes(out))
}

/// Derive a layer's encryption key from the master key via HKDF-SHA256,
/// using info label `aurigraph-{layer}-encryption-v1` (spec section 4.1).
/// `key_version` salts the derivation so rotated versions produce
/// distinct, independent keys from the same master.
pub fn derive_layer_key(master: &SecretKey, layer: Layer, key_version: u32) -> Result<SecretKey, CryptoError> {
    let salt = key_version.to_be_bytes();
    let hk = Hkdf::<Sha256>::new(Some(&salt), master.as_bytes());
    let info = layer.hkdf_info();
    let mut out = [0u8; 32];
    hk.expand(info.as_bytes(), &mut out)
        .map_err(|_| CryptoError::KeyDerivationFailed("hkdf expand produced invalid length".into()))?;
    Ok(SecretKey::from_bytes(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_derivation_is_deterministic_for_fixed_salt() {
        let salt = b"0123456789abcdef";
        let a = derive_master(b"correct horse battery staple", salt).unwrap();
        let b = derive_master(b"correct horse battery staple", salt).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn below_floor_params_rejected() {
        let salt = b"0123456789abcdef";
        let err = derive_master_with_params(b"pw", salt, 1024, 1, 1).unwrap_err();
        assert!(matches!(err, CryptoError::KeyDerivationFailed(_)));
    }

    #[test]
    fn layer_keys_differ_across_layers() {
        let master = SecretKey::from_bytes([3u8; 32]);
        let tx_key = derive_layer_key(&master, Layer::Transaction, 1).unwrap();
        let storage_key = derive_layer_key(&master, Layer::Storage, 1).unwrap();
        assert_ne!(tx_key.as_bytes(), storage_key.as_bytes());
    }

    #[test]
    fn layer_keys_differ_across_versions() {
        let master = SecretKey::from_bytes([3u8; 32]);
        let v1 = derive_layer_key(&master, Layer::Transaction, 1).unwrap();
        let v2 = derive_layer_key(&master, Layer::Transaction, 2).unwrap();
        assert_ne!(v1.as_bytes(), v2.as_bytes());
    }
}
