//! Error kinds for transport (spec section 4.4/7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unknown peer {0}")]
    UnknownPeer(String),

    #[error("replayed or stale nonce from {0}")]
    ReplayDetected(String),

    #[error("invalid signature from {0}")]
    InvalidSignature(String),

    #[error("peer {0} disconnected")]
    Disconnected(String),

    #[error("timeout waiting for response from {0}")]
    Timeout(String),

    #[error("circuit open for {0}")]
    CircuitOpen(String),
}
