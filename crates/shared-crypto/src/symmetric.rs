//! Symmetric AEAD encryption (spec section 4.1).
//!
//! Wire layout of an `EncryptedValue`: `[ver:1][layer:1][iv:12][ct:N][tag:16]`,
//! `ver = 1` for this spec. AES-256-GCM's 96-bit nonce is what fixes the
//! 12-byte IV field; the teacher's default of XChaCha20-Poly1305 (24-byte
//! nonce) does not fit this layout, so the cipher choice diverges here.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use zeroize::Zeroize;

use crate::errors::CryptoError;
use crate::iv::IvGenerator;
use crate::layer::Layer;

pub const FORMAT_VERSION: u8 = 1;
const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// A 32-byte AES-256 key. Zeroized on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey(pub(crate) [u8; 32]);

impl SecretKey {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey").field("bytes", &"<redacted>").finish()
    }
}

/// A decoded or freshly-produced ciphertext envelope, matching the exact
/// wire layout from spec section 4.1.
#[derive(Debug, Clone)]
pub struct EncryptedValue {
    pub version: u8,
    pub layer: Layer,
    pub iv: [u8; IV_LEN],
    pub ciphertext_and_tag: Vec<u8>,
}

impl EncryptedValue {
    /// Serialize to the flat wire layout `[ver:1][layer:1][iv:12][ct:N][tag:16]`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + IV_LEN + self.ciphertext_and_tag.len());
        out.push(self.version);
        out.push(self.layer.tag());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext_and_tag);
        out
    }

    /// Parse the wire layout. Fails with `InvalidFormat` if the version
    /// byte, layer tag, or minimum length don't match.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < 2 + IV_LEN + TAG_LEN {
            return Err(CryptoError::InvalidFormat("encrypted value shorter than minimum frame".into()));
        }
        let version = bytes[0];
        if version != FORMAT_VERSION {
            return Err(CryptoError::InvalidFormat(format!("unsupported format version {version}")));
        }
        let layer = Layer::from_tag(bytes[1])
            .ok_or_else(|| CryptoError::InvalidFormat(format!("unknown layer tag {}", bytes[1])))?;
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&bytes[2..2 + IV_LEN]);
        let ciphertext_and_tag = bytes[2 + IV_LEN..].to_vec();
        Ok(Self { version, layer, iv, ciphertext_and_tag })
    }
}

/// Encrypt `plaintext` under `key` for `layer`, using associated data `aad`
/// (typically the storage key or record id, binding ciphertext to context).
///
/// Fails with `InvalidInput` if the plaintext is empty for a layer that
/// forbids it, or exceeds the layer's size cap (spec section 4.1).
pub fn encrypt(
    key: &SecretKey,
    layer: Layer,
    plaintext: &[u8],
    aad: &[u8],
    iv_gen: &IvGenerator,
) -> Result<EncryptedValue, CryptoError> {
    if plaintext.is_empty() && !layer.allows_empty() {
        return Err(CryptoError::InvalidInput(format!("empty plaintext not allowed for layer {:?}", layer)));
    }
    if plaintext.len() > layer.max_plaintext_bytes() {
        return Err(CryptoError::InvalidInput(format!(
            "plaintext of {} bytes exceeds {:?} cap of {} bytes",
            plaintext.len(),
            layer,
            layer.max_plaintext_bytes()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(&key.0).map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))?;
    let iv = iv_gen.next_iv();
    let nonce = Nonce::from_slice(&iv);
    let ciphertext_and_tag = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::InvalidInput("AEAD encryption failed".into()))?;

    Ok(EncryptedValue { version: FORMAT_VERSION, layer, iv, ciphertext_and_tag })
}

/// Decrypt an `EncryptedValue` under `key`, verifying `aad` matches what it
/// was encrypted with. Fails with `Tampered` if the authentication tag does
/// not verify.
pub fn decrypt(key: &SecretKey, value: &EncryptedValue, aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if value.version != FORMAT_VERSION {
        return Err(CryptoError::InvalidFormat(format!("unsupported format version {}", value.version)));
    }
    let cipher = Aes256Gcm::new_from_slice(&key.0).map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))?;
    let nonce = Nonce::from_slice(&value.iv);
    cipher
        .decrypt(nonce, Payload { msg: &value.ciphertext_and_tag, aad })
        .map_err(|_| CryptoError::Tampered)
}
