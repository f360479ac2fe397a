//! # Aurigraph V11 Node Runtime
//!
//! Entry point for the hard core: Node State Manager, Consensus Engine
//! (HyperRAFT++), Transaction Processing Pipeline, and Encrypted
//! Persistent Store, hosted as a single-binary multi-node validator
//! cluster over an in-process transport (spec section 4.4 — no real
//! network adapter is in scope).

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use node_runtime::container::{AurigraphConfig, SubsystemContainer};

/// How often each hosted node's timer tick (election timeout check,
/// heartbeat broadcast, commit drain) runs.
const TICK_INTERVAL: Duration = Duration::from_millis(25);

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    init_logging(&config.observability.log_level);

    info!("===========================================");
    info!("  Aurigraph V11 Node Runtime");
    info!("===========================================");
    info!(profile = ?config.profile, validators = config.consensus.validator_set.len(), "starting");

    let container = SubsystemContainer::bootstrap(&config).await.context("subsystem bootstrap failed")?;
    info!(nodes = container.nodes.len(), "cluster bootstrapped, entering tick loop");

    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for node in &container.nodes {
                    if let Err(err) = node.tick().await {
                        tracing::warn!(node = %node.node_id.as_str(), error = %err, "tick failed");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received, stopping gracefully");
                break;
            }
        }
    }

    Ok(())
}

fn load_config() -> Result<AurigraphConfig> {
    match env::args().nth(1) {
        Some(path) => AurigraphConfig::from_file(&path).with_context(|| format!("loading config from {path}")),
        None => {
            let config = AurigraphConfig::default();
            config.validate().context("default configuration is invalid")?;
            Ok(config)
        }
    }
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
