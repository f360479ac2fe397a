//! Outbound ports: what `EncryptedStoreService` requires of its host.
//! Grounded on the teacher's `qc-02-block-storage` `KeyValueStore`
//! outbound port (same shape, extended with ordered iteration since
//! spec section 4.2 requires ascending-key iteration over an encrypted
//! store, not just block lookup by hash).

use crate::domain::errors::StoreError;
use std::collections::BTreeMap;

/// A single atomic-batch write operation at the raw-bytes level.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Abstract raw key-value storage. Production: a RocksDB adapter.
/// Testing: [`InMemoryKvStore`] below.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;
    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Apply `operations` atomically: either all persist or none
    /// (spec section 4.2's batch crash-consistency requirement).
    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError>;

    /// Keys with `prefix`, ascending, each paired with its value.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}

/// Wall-clock access, abstracted for deterministic tests (teacher
/// pattern: `TimeSource`).
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> u64;
}

#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// In-memory key-value store for unit tests. An ordered `BTreeMap` gives
/// `prefix_scan` ascending order for free, matching spec section 4.2's
/// `iterate(prefix)` contract without needing RocksDB at test time.
#[derive(Default)]
pub struct InMemoryKvStore {
    data: parking_lot::RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.data.write().remove(key);
        Ok(())
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        let mut guard = self.data.write();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    guard.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    guard.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(self
            .data
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
