//! Production `KeyValueStore` backed by RocksDB (spec section 4.2).
//! Grounded on the teacher's `node-runtime::adapters::storage::rocksdb_adapter`:
//! a single column family here since this store has no sub-namespacing
//! need beyond the key's own data-type prefix.

use std::sync::Arc;

use parking_lot::RwLock;
use rocksdb::{IteratorMode, Options, WriteBatch, DB};

use crate::domain::errors::StoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore};

#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    pub path: String,
    pub block_cache_bytes: usize,
    pub write_buffer_bytes: usize,
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/store".to_string(),
            block_cache_bytes: 256 * 1024 * 1024,
            write_buffer_bytes: 64 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    #[must_use]
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self { path: path.into(), block_cache_bytes: 8 * 1024 * 1024, write_buffer_bytes: 4 * 1024 * 1024, sync_writes: false }
    }
}

pub struct RocksDbStore {
    db: Arc<RwLock<DB>>,
}

impl RocksDbStore {
    pub fn open(config: RocksDbConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_bytes);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_bytes));
        opts.set_block_based_table_factory(&block_opts);

        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(config.sync_writes);

        let db = DB::open(&opts, &config.path).map_err(|e| StoreError::PersistenceError(e.to_string()))?;
        Ok(Self { db: Arc::new(RwLock::new(db)) })
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.db.read().get(key).map_err(|e| StoreError::PersistenceError(e.to_string()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db.write().put(key, value).map_err(|e| StoreError::PersistenceError(e.to_string()))
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.db.write().delete(key).map_err(|e| StoreError::PersistenceError(e.to_string()))
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        let mut batch = WriteBatch::default();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => batch.put(&key, &value),
                BatchOperation::Delete { key } => batch.delete(&key),
            }
        }
        self.db.write().write(batch).map_err(|e| StoreError::PersistenceError(e.to_string()))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let guard = self.db.read();
        let iter = guard.iterator(IteratorMode::From(prefix, rocksdb::Direction::Forward));
        let mut out = Vec::new();
        for item in iter {
            let (k, v) = item.map_err(|e| StoreError::PersistenceError(e.to_string()))?;
            if !k.starts_with(prefix) {
                break;
            }
            out.push((k.to_vec(), v.to_vec()));
        }
        Ok(out)
    }
}
