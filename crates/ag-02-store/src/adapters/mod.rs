#[cfg(feature = "rocksdb-backend")]
pub mod rocksdb_store;
