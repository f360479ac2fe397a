//! # Node Configuration
//!
//! `AurigraphConfig`: the single structured document (spec section 6) with
//! its six recognized sections, loaded from TOML. Grounded on the teacher's
//! `container::config::NodeConfig` (one struct per concern, `Default` impls
//! carrying sane out-of-the-box values, a `validate_for_production` gate).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("configuration error: {0}")]
    Invalid(String),
}

/// Dev: encryption/access-control bypass permitted. Test: security
/// features disabled by default. Prod: all security features required;
/// startup refuses to proceed otherwise (spec section 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Dev,
    Test,
    Prod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    pub id: String,
    pub node_type: String,
    pub bind_address: String,
    pub peer_addresses: Vec<String>,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self { id: "node-1".to_string(), node_type: "validator".to_string(), bind_address: "127.0.0.1:7000".to_string(), peer_addresses: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusSection {
    pub validator_set: Vec<String>,
    pub heartbeat_interval_ms: u64,
    pub election_timeout_min_ms: u64,
    pub election_timeout_max_ms: u64,
    pub pipeline_depth: usize,
    pub min_batch: usize,
    pub max_batch: usize,
    pub target_commit_latency_ms: u64,
}

impl Default for ConsensusSection {
    fn default() -> Self {
        Self {
            validator_set: vec!["node-1".to_string()],
            heartbeat_interval_ms: 50,
            election_timeout_min_ms: 150,
            election_timeout_max_ms: 300,
            pipeline_depth: 4,
            min_batch: 1,
            max_batch: 512,
            target_commit_latency_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoSection {
    /// Path to the file holding the Argon2id salt for the master
    /// passphrase (spec section 6's "key file"). The wrapped master key
    /// itself never touches disk in this implementation: the passphrase
    /// is re-supplied via environment on every start (spec section 6).
    pub master_key_path: PathBuf,
    pub rotation_days_per_layer: u32,
    pub kdf_memory_kb: u32,
    pub kdf_iterations: u32,
    pub kdf_parallelism: u32,
    pub signature_scheme: String,
}

impl Default for CryptoSection {
    fn default() -> Self {
        Self {
            master_key_path: PathBuf::from("./data/master.salt"),
            rotation_days_per_layer: 90,
            kdf_memory_kb: 64 * 1024,
            kdf_iterations: 4,
            kdf_parallelism: 4,
            signature_scheme: "ed25519".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub data_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub backup_retention: u32,
    pub snapshot_interval_secs: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/store"),
            backup_dir: PathBuf::from("./data/backups"),
            backup_retention: 7,
            snapshot_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSection {
    pub listen_port: u16,
    pub tls_enabled: bool,
    pub max_inflight_per_peer: usize,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self { listen_port: 7000, tls_enabled: false, max_inflight_per_peer: 64 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilitySection {
    pub metrics_bind: String,
    pub audit_retention_days: u32,
    pub log_level: String,
}

impl Default for ObservabilitySection {
    fn default() -> Self {
        Self { metrics_bind: "127.0.0.1:9100".to_string(), audit_retention_days: ag_08_observability::DEFAULT_RETENTION_DAYS, log_level: "info".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AurigraphConfig {
    pub profile: Profile,
    pub node: NodeSection,
    pub consensus: ConsensusSection,
    pub crypto: CryptoSection,
    pub store: StoreSection,
    pub transport: TransportSection,
    pub observability: ObservabilitySection,
}

impl AurigraphConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Startup validation (spec section 6/7's `ConfigurationError`):
    /// `prod` refuses to start with a dev-shaped configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.consensus.validator_set.is_empty() {
            return Err(ConfigError::Invalid("consensus.validator_set must not be empty".into()));
        }
        if !self.consensus.validator_set.contains(&self.node.id) {
            return Err(ConfigError::Invalid("node.id must appear in consensus.validator_set".into()));
        }
        if self.consensus.election_timeout_min_ms >= self.consensus.election_timeout_max_ms {
            return Err(ConfigError::Invalid("election_timeout_min_ms must be < election_timeout_max_ms".into()));
        }
        if self.consensus.min_batch == 0 || self.consensus.min_batch > self.consensus.max_batch {
            return Err(ConfigError::Invalid("min_batch must be nonzero and <= max_batch".into()));
        }
        if self.profile == Profile::Prod {
            if std::env::var("AURIGRAPH_MASTER_PASSPHRASE").is_err() {
                return Err(ConfigError::Invalid("prod profile requires AURIGRAPH_MASTER_PASSPHRASE to be set".into()));
            }
            if !self.transport.tls_enabled {
                return Err(ConfigError::Invalid("prod profile requires transport.tls_enabled".into()));
            }
        }
        Ok(())
    }
}
