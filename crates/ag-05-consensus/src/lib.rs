//! # Consensus Engine (C5) — HyperRAFT++
//!
//! Leader election, log replication, adaptive batching, and
//! joint-consensus membership changes (spec section 4.5). "This is the
//! hardest subsystem; the following contracts MUST be preserved": the
//! five safety invariants are enforced entirely within
//! [`domain::log::ReplicatedLog`] and [`domain::election`], independent
//! of any transport or storage adapter.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use domain::election::{candidate_log_is_up_to_date, quorum_size, should_grant_vote};
pub use domain::errors::ConsensusError;
pub use domain::log::{EntryStatus, LogEntry, ReplicatedLog};
pub use domain::membership::MembershipConfig;
pub use domain::replication::{BatchSizeController, FollowerProgress};
pub use domain::roles::{ConsensusView, Role, Term};
pub use ports::inbound::ConsensusApi;
pub use ports::outbound::{Clock, ConsensusStateStore, ElectionTimeoutSource, RandomizedElectionTimeout, SystemClock};
pub use service::{ConsensusDependencies, ConsensusService, PeerBroadcaster};
