//! # Runtime Container
//!
//! Configuration and dependency-injection wiring for the validator
//! cluster this binary hosts: [`config::AurigraphConfig`] loads the
//! six recognized TOML sections, and [`subsystems::SubsystemContainer`]
//! bootstraps every per-node subsystem against them.

pub mod config;
pub mod subsystems;

pub use config::{AurigraphConfig, ConfigError, Profile};
pub use subsystems::{KvBackend, NodeHandle, SubsystemContainer};
