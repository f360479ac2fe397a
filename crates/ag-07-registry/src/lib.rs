//! # Node Registry (C7)
//!
//! Typed directory of known nodes plus the joint-consensus membership
//! change workflow (spec section 4.7).

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::descriptor::{NodeDescriptor, RegistryChangeEvent, RegistryChangeKind};
pub use domain::errors::RegistryError;
pub use ports::inbound::NodeRegistryApi;
pub use service::NodeRegistryService;
