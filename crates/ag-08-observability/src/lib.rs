//! # Observability (C8)
//!
//! Metrics, health checks, and the structured audit-log stream (spec
//! section 4.8).

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::tracing_audit_sink::TracingAuditSink;
pub use domain::audit::{AuditEventKind, AuditRecord, DEFAULT_RETENTION_DAYS};
pub use domain::errors::ObservabilityError;
pub use domain::health::{ConsensusRoleSnapshot, HealthInputs, HealthReport};
pub use domain::metrics::{register_all, render};
pub use ports::inbound::ObservabilityApi;
pub use ports::outbound::AuditSink;
pub use service::ObservabilityService;
