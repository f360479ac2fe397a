pub mod tracing_audit_sink;
