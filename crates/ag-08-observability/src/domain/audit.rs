//! The audit-log stream (spec section 4.8): "append-only, structured
//! records for every security-sensitive event... never include
//! plaintext payloads or secrets. Retention is configurable (default >=
//! 1 year)."

use shared_types::entities::{Timestamp, now_unix};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AuditEventKind {
    KeyRotation,
    AccessDenied,
    TamperDetected,
    RoleChange,
    NodeStateChange,
    BackupCreated,
    BackupRestored,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AuditRecord {
    pub kind: AuditEventKind,
    pub subject: String,
    pub detail: String,
    pub timestamp: Timestamp,
}

impl AuditRecord {
    #[must_use]
    pub fn new(kind: AuditEventKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { kind, subject: subject.into(), detail: detail.into(), timestamp: now_unix() }
    }
}

/// Default audit retention period in days (spec: "default >= 1 year").
pub const DEFAULT_RETENTION_DAYS: u32 = 365;

#[must_use]
pub fn is_expired(record: &AuditRecord, now: Timestamp, retention_days: u32) -> bool {
    let retention_secs = u64::from(retention_days) * 86_400;
    now.saturating_sub(record.timestamp) > retention_secs
}
