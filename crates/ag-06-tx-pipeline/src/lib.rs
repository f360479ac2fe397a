//! # Transaction Pipeline (C6)
//!
//! Ingress, forwarding, pre-batch validation, batching, consensus
//! handoff, apply, and notification (spec section 4.6), bounded-queue
//! backpressured at every stage boundary.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::in_memory_nonce_ledger::InMemoryNonceLedger;
pub use domain::batch_builder::BatchingPolicy;
pub use domain::errors::PipelineError;
pub use ports::inbound::TransactionPipelineApi;
pub use ports::outbound::{Clock, NonceLedger, SystemClock};
pub use service::{TxPipelineDependencies, TxPipelineService};
