//! `EncryptedStoreService`: wires access control, encryption, and the raw
//! KV port together into the operations from spec section 4.2. Grounded
//! on the teacher's `qc-02-block-storage::service` shape (a service
//! struct generic over its outbound port, delegating pure decisions to
//! `domain::*`).

use std::sync::Arc;

use shared_crypto::{decrypt, encrypt, EncryptedValue, KeyManager, Layer};

use crate::domain::access::{Permission, Principal};
use crate::domain::backup::{prune_candidates, BackupMetadata};
use crate::domain::errors::StoreError;
use crate::domain::keys::{data_type_prefix, validate_key};
use crate::domain::rotation::RotationPolicy;
use crate::domain::store::{AuditEvent, Outcome, StoreOp};
use crate::ports::inbound::EncryptedStoreApi;
use crate::ports::outbound::{BatchOperation, Clock, KeyValueStore};

/// Everything written through this service lives at layer STORAGE (spec
/// section 4.2: "encrypts the value at layer STORAGE").
const LAYER: Layer = Layer::Storage;

pub struct EncryptedStoreService<S: KeyValueStore> {
    kv: Arc<S>,
    keys: Arc<KeyManager>,
    clock: Arc<dyn Clock>,
    iv_gen: shared_crypto::IvGenerator,
    rotation_policy: RotationPolicy,
    backups: parking_lot::Mutex<Vec<BackupMetadata>>,
    node_id: String,
}

impl<S: KeyValueStore> EncryptedStoreService<S> {
    #[must_use]
    pub fn new(kv: Arc<S>, keys: Arc<KeyManager>, clock: Arc<dyn Clock>, node_id: impl Into<String>) -> Self {
        Self {
            kv,
            keys,
            clock,
            iv_gen: shared_crypto::IvGenerator::new(),
            rotation_policy: RotationPolicy::default_for(LAYER),
            backups: parking_lot::Mutex::new(Vec::new()),
            node_id: node_id.into(),
        }
    }

    fn audit(&self, principal: &Principal, key: &str, action: &str, outcome: Outcome) {
        let event = AuditEvent {
            principal: principal.id.clone(),
            key: key.to_string(),
            action: action.to_string(),
            outcome,
            timestamp: self.clock.now_unix(),
        };
        tracing::info!(target: "audit", principal = %event.principal, key = %event.key, action = %event.action, outcome = ?event.outcome, "store access");
    }

    fn encrypt_value(&self, key: &str, value: &[u8]) -> Result<Vec<u8>, StoreError> {
        let (secret, version) = self.keys.active_key(LAYER);
        let envelope = encrypt(&secret, LAYER, value, key.as_bytes(), &self.iv_gen)?;
        let mut wire = Vec::with_capacity(4 + envelope.to_bytes().len());
        wire.extend_from_slice(&version.to_be_bytes());
        wire.extend_from_slice(&envelope.to_bytes());
        Ok(wire)
    }

    fn decrypt_value(&self, key: &str, wire: &[u8]) -> Result<Vec<u8>, StoreError> {
        if wire.len() < 4 {
            return Err(StoreError::InvalidFormat("stored value shorter than version prefix".into()));
        }
        let version = u32::from_be_bytes(wire[0..4].try_into().unwrap());
        let envelope = EncryptedValue::from_bytes(&wire[4..])?;
        let secret = self.keys.key_for_version(LAYER, version)?;
        Ok(decrypt(&secret, &envelope, key.as_bytes())?)
    }

    fn check(&self, principal: &Principal, key: &str, permission: Permission) -> Result<(), StoreError> {
        validate_key(key)?;
        let prefix = data_type_prefix(key);
        if !principal.is_authorized(prefix, permission) {
            return Err(StoreError::Unauthorized);
        }
        Ok(())
    }
}

impl<S: KeyValueStore> EncryptedStoreApi for EncryptedStoreService<S> {
    fn put(&self, principal: &Principal, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if let Err(e) = self.check(principal, key, Permission::Write) {
            self.audit(principal, key, "put", Outcome::Denied);
            return Err(e);
        }
        let encrypted = self.encrypt_value(key, value)?;
        match self.kv.put(key.as_bytes(), &encrypted) {
            Ok(()) => {
                self.audit(principal, key, "put", Outcome::Success);
                Ok(())
            }
            Err(e) => {
                self.audit(principal, key, "put", Outcome::Failed);
                Err(e)
            }
        }
    }

    fn get(&self, principal: &Principal, key: &str) -> Result<Vec<u8>, StoreError> {
        self.check(principal, key, Permission::Read).map_err(|e| {
            self.audit(principal, key, "get", Outcome::Denied);
            e
        })?;
        let raw = self.kv.get(key.as_bytes())?.ok_or(StoreError::NotFound)?;
        match self.decrypt_value(key, &raw) {
            Ok(v) => Ok(v),
            Err(e) => {
                if matches!(e, StoreError::Tampered) {
                    tracing::warn!(target: "audit", %key, "tamper-suspect read");
                }
                Err(e)
            }
        }
    }

    fn delete(&self, principal: &Principal, key: &str) -> Result<(), StoreError> {
        if let Err(e) = self.check(principal, key, Permission::Delete) {
            self.audit(principal, key, "delete", Outcome::Denied);
            return Err(e);
        }
        self.kv.delete(key.as_bytes())?;
        self.audit(principal, key, "delete", Outcome::Success);
        Ok(())
    }

    fn batch(&self, principal: &Principal, ops: Vec<StoreOp>) -> Result<(), StoreError> {
        let mut raw_ops = Vec::with_capacity(ops.len());
        for op in &ops {
            let permission = match op {
                StoreOp::Put { .. } => Permission::Write,
                StoreOp::Delete { .. } => Permission::Delete,
            };
            self.check(principal, op.key(), permission)?;
        }
        for op in ops {
            match op {
                StoreOp::Put { key, value } => {
                    let encrypted = self.encrypt_value(&key, &value)?;
                    raw_ops.push(BatchOperation::Put { key: key.into_bytes(), value: encrypted });
                }
                StoreOp::Delete { key } => raw_ops.push(BatchOperation::Delete { key: key.into_bytes() }),
            }
        }
        self.kv.atomic_batch_write(raw_ops)
    }

    fn iterate(&self, principal: &Principal, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        if !principal.is_authorized(data_type_prefix(prefix), Permission::Read) {
            return Err(StoreError::Unauthorized);
        }
        let raw = self.kv.prefix_scan(prefix.as_bytes())?;
        raw.into_iter()
            .map(|(k, v)| {
                let key = String::from_utf8(k).map_err(|_| StoreError::InvalidFormat("non-utf8 key".into()))?;
                let value = self.decrypt_value(&key, &v)?;
                Ok((key, value))
            })
            .collect()
    }

    fn snapshot(&self) -> Result<String, StoreError> {
        Ok(format!("snap-{}-{}", self.node_id, self.clock.now_unix()))
    }

    fn create_backup(&self) -> Result<BackupMetadata, StoreError> {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let entries = self.kv.prefix_scan(b"")?;
        let mut plain = Vec::new();
        for (k, v) in &entries {
            plain.extend_from_slice(&(k.len() as u32).to_be_bytes());
            plain.extend_from_slice(k);
            plain.extend_from_slice(&(v.len() as u32).to_be_bytes());
            plain.extend_from_slice(v);
        }
        let uncompressed_size = plain.len() as u64;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&plain).map_err(|e| StoreError::PersistenceError(e.to_string()))?;
        let compressed = encoder.finish().map_err(|e| StoreError::PersistenceError(e.to_string()))?;

        let (secret, version) = self.keys.active_key(LAYER);
        let backup_id = format!("backup-{}-{}", self.node_id, self.clock.now_unix());
        let envelope = encrypt(&secret, LAYER, &compressed, backup_id.as_bytes(), &self.iv_gen)?;
        let compressed_size = envelope.to_bytes().len() as u64;

        let metadata = BackupMetadata {
            backup_id: backup_id.clone(),
            origin_node: self.node_id.clone(),
            created_at: self.clock.now_unix(),
            compressed_size,
            uncompressed_size,
            storage_key_version: version,
        };
        self.backups.lock().push(metadata.clone());
        Ok(metadata)
    }
}

impl<S: KeyValueStore> EncryptedStoreService<S> {
    /// Apply the retention policy, dropping backups beyond the `keep_count`
    /// most recent. Returns the ids removed.
    pub fn prune_backups(&self, keep_count: usize) -> Vec<String> {
        let mut guard = self.backups.lock();
        let removed = prune_candidates(guard.clone(), keep_count);
        guard.retain(|b| !removed.contains(&b.backup_id));
        removed
    }

    /// Run one rotation sweep: if the active STORAGE key has aged past its
    /// rotation period, rotate it. Never called from the request hot
    /// path (spec section 4.2).
    pub fn rotation_sweep(&self, active_since_secs: u64) -> Option<u32> {
        if self.rotation_policy.is_due(active_since_secs, self.clock.now_unix()) {
            self.keys.rotate(LAYER).ok()
        } else {
            None
        }
    }
}
