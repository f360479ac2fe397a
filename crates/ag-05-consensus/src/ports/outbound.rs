//! Outbound ports: durable state (spec section 4.5.5: "term, voted_for,
//! and the log are persisted before a vote or append is acknowledged")
//! and a clock for election-timeout scheduling.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::domain::errors::ConsensusError;
use crate::domain::log::LogEntry;
use crate::domain::roles::Term;

/// The reserved on-disk keys this port writes through to `ag-02-store`
/// (spec section 6): `consensus:term`, `consensus:voted_for`,
/// `consensus:log:{index}`, `consensus:applied_index`.
pub trait ConsensusStateStore: Send + Sync {
    fn save_term(&self, term: Term) -> Result<(), ConsensusError>;
    fn load_term(&self) -> Result<Term, ConsensusError>;

    fn save_voted_for(&self, candidate: Option<&str>) -> Result<(), ConsensusError>;
    fn load_voted_for(&self) -> Result<Option<String>, ConsensusError>;

    fn append_log_entry(&self, entry: &LogEntry) -> Result<(), ConsensusError>;
    fn load_log(&self) -> Result<Vec<LogEntry>, ConsensusError>;

    fn save_applied_index(&self, index: u64) -> Result<(), ConsensusError>;
    fn load_applied_index(&self) -> Result<u64, ConsensusError>;
}

/// Millisecond wall-clock source, abstracted so election-timeout logic
/// can be driven deterministically in tests.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }
}

/// Supplies a randomized election timeout in the 150-300ms range (spec
/// section 4.5.2), "at least 3x the heartbeat interval."
pub trait ElectionTimeoutSource: Send + Sync {
    fn next_timeout_millis(&self) -> u64;
}

pub struct RandomizedElectionTimeout {
    pub min_millis: u64,
    pub max_millis: u64,
}

impl Default for RandomizedElectionTimeout {
    fn default() -> Self {
        Self { min_millis: 150, max_millis: 300 }
    }
}

impl ElectionTimeoutSource for RandomizedElectionTimeout {
    fn next_timeout_millis(&self) -> u64 {
        use rand::Rng;
        rand::thread_rng().gen_range(self.min_millis..=self.max_millis)
    }
}
