//! Inbound port: the API `node-runtime` and sibling crates drive against
//! (spec section 4.2's operation contract).

use crate::domain::access::Principal;
use crate::domain::backup::BackupMetadata;
use crate::domain::errors::StoreError;

pub trait EncryptedStoreApi: Send + Sync {
    fn put(&self, principal: &Principal, key: &str, value: &[u8]) -> Result<(), StoreError>;
    fn get(&self, principal: &Principal, key: &str) -> Result<Vec<u8>, StoreError>;
    fn delete(&self, principal: &Principal, key: &str) -> Result<(), StoreError>;

    fn batch(&self, principal: &Principal, ops: Vec<crate::domain::store::StoreOp>) -> Result<(), StoreError>;

    /// Ascending-key iteration under `prefix`, values decrypted.
    fn iterate(&self, principal: &Principal, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError>;

    fn snapshot(&self) -> Result<String, StoreError>;
    fn create_backup(&self) -> Result<BackupMetadata, StoreError>;
}
