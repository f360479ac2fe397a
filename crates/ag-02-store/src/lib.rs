//! # Encrypted Store (C2)
//!
//! A per-node ordered key/value store, encrypted at rest, role-gated by
//! data-type prefix, with background key rotation and backup/restore
//! (spec section 4.2).

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use domain::access::{Permission, Principal, Role};
pub use domain::errors::StoreError;
pub use domain::store::StoreOp;
pub use ports::inbound::EncryptedStoreApi;
pub use ports::outbound::{BatchOperation, Clock, InMemoryKvStore, KeyValueStore, SystemClock};
pub use service::EncryptedStoreService;
