//! An [`AuditSink`] that writes through `tracing`'s dedicated `"audit"`
//! target, the same convention `ag-02-store` uses for its own audit
//! events.

use tracing::info;

use crate::domain::audit::AuditRecord;
use crate::ports::outbound::AuditSink;

pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: AuditRecord) {
        info!(
            target: "audit",
            kind = ?record.kind,
            subject = %record.subject,
            detail = %record.detail,
            timestamp = record.timestamp,
            "audit event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::AuditEventKind;

    #[test]
    fn record_does_not_panic() {
        TracingAuditSink.record(AuditRecord::new(AuditEventKind::KeyRotation, "layer:storage", "rotated to v2"));
    }
}
