//! [`ConsensusStateStore`] over `ag-02-store`'s [`EncryptedStoreApi`],
//! using the reserved key namespace from spec section 6.

use std::sync::Arc;

use ag_02_store::{EncryptedStoreApi, Principal};

use crate::domain::errors::ConsensusError;
use crate::domain::log::LogEntry;
use crate::domain::roles::Term;
use crate::ports::outbound::ConsensusStateStore;

const TERM_KEY: &str = "consensus:term";
const VOTED_FOR_KEY: &str = "consensus:voted_for";
const APPLIED_INDEX_KEY: &str = "consensus:applied_index";

fn log_key(index: u64) -> String {
    format!("consensus:log:{index}")
}

pub struct StoreBackedConsensusState<S: EncryptedStoreApi> {
    store: Arc<S>,
    principal: Principal,
}

impl<S: EncryptedStoreApi> StoreBackedConsensusState<S> {
    #[must_use]
    pub fn new(store: Arc<S>, principal: Principal) -> Self {
        Self { store, principal }
    }
}

impl<S: EncryptedStoreApi> ConsensusStateStore for StoreBackedConsensusState<S> {
    fn save_term(&self, term: Term) -> Result<(), ConsensusError> {
        self.store.put(&self.principal, TERM_KEY, &term.to_be_bytes())?;
        Ok(())
    }

    fn load_term(&self) -> Result<Term, ConsensusError> {
        match self.store.get(&self.principal, TERM_KEY) {
            Ok(bytes) => Ok(u64::from_be_bytes(bytes.try_into().unwrap_or([0; 8]))),
            Err(ag_02_store::StoreError::NotFound) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn save_voted_for(&self, candidate: Option<&str>) -> Result<(), ConsensusError> {
        let bytes = serde_json::to_vec(&candidate)
            .map_err(|e| ConsensusError::PersistenceError(e.to_string()))?;
        self.store.put(&self.principal, VOTED_FOR_KEY, &bytes)?;
        Ok(())
    }

    fn load_voted_for(&self) -> Result<Option<String>, ConsensusError> {
        match self.store.get(&self.principal, VOTED_FOR_KEY) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| ConsensusError::PersistenceError(e.to_string())),
            Err(ag_02_store::StoreError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn append_log_entry(&self, entry: &LogEntry) -> Result<(), ConsensusError> {
        let bytes = serde_json::to_vec(entry)
            .map_err(|e| ConsensusError::PersistenceError(e.to_string()))?;
        self.store.put(&self.principal, &log_key(entry.index), &bytes)?;
        Ok(())
    }

    fn load_log(&self) -> Result<Vec<LogEntry>, ConsensusError> {
        let mut entries: Vec<LogEntry> = self
            .store
            .iterate(&self.principal, "consensus:log:")?
            .into_iter()
            .map(|(_, bytes)| {
                serde_json::from_slice(&bytes).map_err(|e| ConsensusError::PersistenceError(e.to_string()))
            })
            .collect::<Result<_, _>>()?;
        entries.sort_by_key(|e: &LogEntry| e.index);
        Ok(entries)
    }

    fn save_applied_index(&self, index: u64) -> Result<(), ConsensusError> {
        self.store.put(&self.principal, APPLIED_INDEX_KEY, &index.to_be_bytes())?;
        Ok(())
    }

    fn load_applied_index(&self) -> Result<u64, ConsensusError> {
        match self.store.get(&self.principal, APPLIED_INDEX_KEY) {
            Ok(bytes) => Ok(u64::from_be_bytes(bytes.try_into().unwrap_or([0; 8]))),
            Err(ag_02_store::StoreError::NotFound) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
