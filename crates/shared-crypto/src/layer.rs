//! Encryption layers (spec section 3/4.1): a logical purpose tag used to
//! derive a distinct key from the master with a stable context label.

use serde::{Deserialize, Serialize};

/// A logical purpose tag for key derivation and size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Transaction,
    Bridge,
    Contract,
    Storage,
}

impl Layer {
    /// All layers, for iterating e.g. during key-rotation sweeps.
    pub const ALL: [Layer; 4] = [Layer::Transaction, Layer::Bridge, Layer::Contract, Layer::Storage];

    /// Wire tag byte (persisted in `EncryptedValue`).
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Layer::Transaction => 0,
            Layer::Bridge => 1,
            Layer::Contract => 2,
            Layer::Storage => 3,
        }
    }

    /// Decode a wire tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Layer::Transaction),
            1 => Some(Layer::Bridge),
            2 => Some(Layer::Contract),
            3 => Some(Layer::Storage),
            _ => None,
        }
    }

    /// Lowercase name used in the HKDF info label
    /// `aurigraph-{layer}-encryption-v1` (spec section 4.1).
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Layer::Transaction => "transaction",
            Layer::Bridge => "bridge",
            Layer::Contract => "contract",
            Layer::Storage => "storage",
        }
    }

    /// HKDF info string for this layer.
    #[must_use]
    pub fn hkdf_info(self) -> String {
        format!("aurigraph-{}-encryption-v1", self.label())
    }

    /// Maximum plaintext size in bytes (spec section 4.1).
    #[must_use]
    pub fn max_plaintext_bytes(self) -> usize {
        match self {
            Layer::Transaction => 10 * 1024 * 1024,
            Layer::Bridge => 5 * 1024 * 1024,
            Layer::Contract => 50 * 1024 * 1024,
            Layer::Storage => 50 * 1024 * 1024,
        }
    }

    /// Whether an empty plaintext is permitted for this layer (spec
    /// section 4.1: only STORAGE allows it).
    #[must_use]
    pub fn allows_empty(self) -> bool {
        matches!(self, Layer::Storage)
    }

    /// Default key rotation period in days (spec section 4.2).
    #[must_use]
    pub fn default_rotation_days(self) -> u32 {
        match self {
            Layer::Transaction => 30,
            Layer::Bridge => 7,
            Layer::Contract => 30,
            Layer::Storage => 90,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrip() {
        for layer in Layer::ALL {
            assert_eq!(Layer::from_tag(layer.tag()), Some(layer));
        }
    }

    #[test]
    fn only_storage_allows_empty() {
        assert!(Layer::Storage.allows_empty());
        assert!(!Layer::Transaction.allows_empty());
        assert!(!Layer::Bridge.allows_empty());
        assert!(!Layer::Contract.allows_empty());
    }

    #[test]
    fn hkdf_info_matches_spec_format() {
        assert_eq!(Layer::Transaction.hkdf_info(), "aurigraph-transaction-encryption-v1");
    }
}
