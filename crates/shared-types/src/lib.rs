//! # Shared Types
//!
//! Cross-cutting domain types shared by every crate in the workspace: node
//! identity and lifecycle types, the transaction/batch data model, the
//! `AuthenticatedMessage<T>` IPC envelope used by the in-process event bus,
//! and the peer wire-protocol messages from spec section 6.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-crate types live here, not duplicated.
//! - **Envelope Integrity**: `AuthenticatedMessage<T>` is the sole wrapper for
//!   in-process, cross-subsystem communication (the event bus).
//! - **No Redundant Identity**: payloads MUST NOT carry their own sender
//!   field; the envelope's `sender_id` is authoritative.

pub mod entities;
pub mod envelope;
pub mod errors;
pub mod ipc;
pub mod rate_limiter;
pub mod security;

pub use entities::*;
pub use envelope::AuthenticatedMessage;
pub use errors::*;
pub use ipc::*;
pub use rate_limiter::RateLimiter;
pub use security::*;
