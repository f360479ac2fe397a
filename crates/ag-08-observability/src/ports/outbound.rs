use crate::domain::audit::AuditRecord;

/// Where audit records are written once emitted. Never receives
/// plaintext payload bytes, only the already-redacted `AuditRecord`.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}
