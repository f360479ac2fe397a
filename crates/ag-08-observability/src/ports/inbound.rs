use crate::domain::audit::AuditEventKind;
use crate::domain::health::{HealthInputs, HealthReport};

pub trait ObservabilityApi: Send + Sync {
    fn health(&self, inputs: &HealthInputs) -> HealthReport;
    fn audit(&self, kind: AuditEventKind, subject: &str, detail: &str);
    fn metrics_text(&self) -> String;
}
