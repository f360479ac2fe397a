//! # Aurigraph V11 Integration Suite
//!
//! Cross-crate tests that exercise the hard core end to end, beyond what
//! each crate's own `#[cfg(test)]` module covers in isolation: the seed
//! scenarios and the universal invariants.
//!
//! ```bash
//! cargo test -p aurigraph-tests
//! ```

pub mod integration;
