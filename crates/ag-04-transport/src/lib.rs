//! # Transport (C4)
//!
//! Peer channel (authenticated request/response + streaming) and client
//! channel (topic event streams), plus the in-process `LoopbackTransport`
//! adapter used by tests and by multi-node-in-one-process deployments
//! (spec section 4.4).

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::loopback::{InboundHandler, LoopbackNetwork, LoopbackTransport};
pub use domain::circuit_breaker::{CircuitBreaker, CircuitState};
pub use domain::dedup::DedupWindow;
pub use domain::errors::TransportError;
pub use domain::replay::NonceTracker;
pub use ports::{ClientChannel, PeerChannel};
