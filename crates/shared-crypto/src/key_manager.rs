//! Key lifecycle management (spec section 4.2): one active key per layer
//! plus at most one retained previous version, so in-flight ciphertexts
//! encrypted just before a rotation can still be read.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::CryptoError;
use crate::kdf::derive_layer_key;
use crate::layer::Layer;
use crate::symmetric::SecretKey;

fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// A single versioned key for one layer, with its validity window.
pub struct EncryptionKey {
    pub layer: Layer,
    pub version: u32,
    pub key: SecretKey,
    pub created_at: u64,
    /// `None` while active; set to the rotation timestamp once superseded.
    pub retired_at: Option<u64>,
}

struct LayerKeys {
    active: EncryptionKey,
    previous: Option<EncryptionKey>,
}

/// Holds the active and previous key per layer, derived on demand from a
/// master key via HKDF. Only one previous version is retained per layer
/// (spec section 4.2); older versions are unrecoverable once rotated past.
pub struct KeyManager {
    master: SecretKey,
    layers: RwLock<HashMap<Layer, LayerKeys>>,
}

impl KeyManager {
    /// Bootstrap with version 1 active for every layer.
    #[must_use]
    pub fn new(master: SecretKey) -> Result<Self, CryptoError> {
        let mut layers = HashMap::new();
        for layer in Layer::ALL {
            let key = derive_layer_key(&master, layer, 1)?;
            layers.insert(
                layer,
                LayerKeys {
                    active: EncryptionKey { layer, version: 1, key, created_at: now_unix(), retired_at: None },
                    previous: None,
                },
            );
        }
        Ok(Self { master, layers: RwLock::new(layers) })
    }

    /// The currently active key and its version for `layer`.
    pub fn active_key(&self, layer: Layer) -> (SecretKey, u32) {
        let guard = self.layers.read();
        let entry = &guard[&layer];
        (entry.active.key.clone(), entry.active.version)
    }

    /// Look up a specific version for `layer`, searching both the active
    /// and the retained previous slot. Returns `UnknownKeyVersion` if the
    /// requested version has been rotated past or was never issued.
    pub fn key_for_version(&self, layer: Layer, version: u32) -> Result<SecretKey, CryptoError> {
        let guard = self.layers.read();
        let entry = &guard[&layer];
        if entry.active.version == version {
            return Ok(entry.active.key.clone());
        }
        if let Some(prev) = &entry.previous {
            if prev.version == version {
                return Ok(prev.key.clone());
            }
        }
        Err(CryptoError::UnknownKeyVersion(version))
    }

    /// Rotate `layer` to the next version, demoting the current active key
    /// to "previous" and discarding whatever was previously retained.
    pub fn rotate(&self, layer: Layer) -> Result<u32, CryptoError> {
        let mut guard = self.layers.write();
        let entry = guard.get_mut(&layer).expect("all layers seeded at construction");
        let next_version = entry.active.version + 1;
        let next_key = derive_layer_key(&self.master, layer, next_version)?;
        let now = now_unix();
        let mut retiring = std::mem::replace(
            &mut entry.active,
            EncryptionKey { layer, version: next_version, key: next_key, created_at: now, retired_at: None },
        );
        retiring.retired_at = Some(now);
        entry.previous = Some(retiring);
        Ok(next_version)
    }

    /// Whether `layer` is due for rotation given its configured period.
    #[must_use]
    pub fn is_due_for_rotation(&self, layer: Layer, rotation_period_secs: u64) -> bool {
        let guard = self.layers.read();
        let entry = &guard[&layer];
        now_unix().saturating_sub(entry.active.created_at) >= rotation_period_secs
    }
}
