//! Prometheus metrics (spec section 4.8): "counters, gauges, and
//! histograms for submission rate, batch sizes, commit latency
//! percentiles, leader-election count, follower lag, encryption/
//! decryption counts, key-rotation events." Naming convention:
//! `aurigraph_<subsystem>_<metric>_<unit>`, matching the teacher
//! workspace's `quantum-telemetry` crate.

use lazy_static::lazy_static;
use prometheus::{exponential_buckets, Counter, CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry};

use crate::domain::errors::ObservabilityError;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref TRANSACTIONS_SUBMITTED: Counter = Counter::new(
        "aurigraph_pipeline_transactions_submitted_total",
        "Total transactions accepted at Ingress"
    ).expect("metric creation failed");

    pub static ref BATCH_SIZE: Histogram = Histogram::with_opts(
        HistogramOpts::new("aurigraph_pipeline_batch_size", "Number of transactions per closed batch")
            .buckets(exponential_buckets(1.0, 2.0, 12).unwrap())
    ).expect("metric creation failed");

    pub static ref COMMIT_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "aurigraph_consensus_commit_latency_seconds",
            "End-to-end latency from batch proposal to commit"
        ).buckets(exponential_buckets(0.001, 2.0, 16).unwrap())
    ).expect("metric creation failed");

    pub static ref LEADER_ELECTIONS: Counter = Counter::new(
        "aurigraph_consensus_leader_elections_total",
        "Total leader elections observed by this node"
    ).expect("metric creation failed");

    pub static ref FOLLOWER_LAG: Gauge = Gauge::new(
        "aurigraph_consensus_follower_lag_entries",
        "Entries the local log trails the leader's commit index by"
    ).expect("metric creation failed");

    pub static ref ENCRYPT_OPS: CounterVec = CounterVec::new(
        Opts::new("aurigraph_store_crypto_ops_total", "Encryption/decryption operations by layer and direction"),
        &["layer", "direction"]
    ).expect("metric creation failed");

    pub static ref KEY_ROTATIONS: CounterVec = CounterVec::new(
        Opts::new("aurigraph_store_key_rotations_total", "Key-rotation events by layer"),
        &["layer"]
    ).expect("metric creation failed");
}

/// Register every metric with the global registry. Idempotent in
/// practice (called once at startup); a second call surfaces
/// `AlreadyReg` from the underlying `prometheus` crate as an error
/// rather than panicking.
pub fn register_all() -> Result<(), ObservabilityError> {
    REGISTRY.register(Box::new(TRANSACTIONS_SUBMITTED.clone()))?;
    REGISTRY.register(Box::new(BATCH_SIZE.clone()))?;
    REGISTRY.register(Box::new(COMMIT_LATENCY_SECONDS.clone()))?;
    REGISTRY.register(Box::new(LEADER_ELECTIONS.clone()))?;
    REGISTRY.register(Box::new(FOLLOWER_LAG.clone()))?;
    REGISTRY.register(Box::new(ENCRYPT_OPS.clone()))?;
    REGISTRY.register(Box::new(KEY_ROTATIONS.clone()))?;
    Ok(())
}

/// Render the registry in Prometheus text-exposition format, for a
/// `/metrics` HTTP handler wired up in `node-runtime`.
pub fn render() -> Result<String, ObservabilityError> {
    use prometheus::{Encoder, TextEncoder};
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buf = Vec::new();
    encoder.encode(&metric_families, &mut buf)?;
    Ok(String::from_utf8(buf).unwrap_or_default())
}
