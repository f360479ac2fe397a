use std::sync::Arc;

use crate::domain::audit::{AuditEventKind, AuditRecord};
use crate::domain::health::{evaluate, HealthInputs, HealthReport};
use crate::domain::metrics;
use crate::ports::inbound::ObservabilityApi;
use crate::ports::outbound::AuditSink;

pub struct ObservabilityService<A: AuditSink> {
    sink: Arc<A>,
}

impl<A: AuditSink> ObservabilityService<A> {
    #[must_use]
    pub fn new(sink: Arc<A>) -> Self {
        Self { sink }
    }
}

impl<A: AuditSink> ObservabilityApi for ObservabilityService<A> {
    fn health(&self, inputs: &HealthInputs) -> HealthReport {
        evaluate(inputs)
    }

    fn audit(&self, kind: AuditEventKind, subject: &str, detail: &str) {
        self.sink.record(AuditRecord::new(kind, subject, detail));
    }

    fn metrics_text(&self) -> String {
        metrics::render().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use shared_types::entities::NodeStatus;

    #[derive(Default)]
    struct CapturingSink {
        records: Mutex<Vec<AuditRecord>>,
    }

    impl AuditSink for CapturingSink {
        fn record(&self, record: AuditRecord) {
            self.records.lock().push(record);
        }
    }

    #[test]
    fn audit_forwards_to_sink() {
        let sink = Arc::new(CapturingSink::default());
        let service = ObservabilityService::new(sink.clone());
        service.audit(AuditEventKind::AccessDenied, "principal:svc", "missing write grant");
        assert_eq!(sink.records.lock().len(), 1);
    }

    #[test]
    fn health_delegates_to_domain_evaluation() {
        let sink = Arc::new(CapturingSink::default());
        let service = ObservabilityService::new(sink);
        let inputs = HealthInputs {
            node_status: NodeStatus::Running,
            consensus_role: crate::domain::health::ConsensusRoleSnapshot::Leader,
            store_reachable: true,
            recovery_complete: true,
        };
        assert!(service.health(&inputs).ready);
    }
}
