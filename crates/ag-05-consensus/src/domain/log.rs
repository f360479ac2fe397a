//! The replicated log (spec section 4.5.3/4.5.6): exclusively owned by
//! the Consensus Engine, append-only for a leader's own term, truncated
//! only during conflict resolution against a leader's authoritative
//! suffix.

use shared_types::entities::Batch;

use super::roles::Term;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EntryStatus {
    Proposed,
    Replicated,
    Committed,
    Applied,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LogEntry {
    pub index: u64,
    pub term: Term,
    pub batch: Batch,
    pub status: EntryStatus,
}

/// The validator's local view of the replicated log plus derived
/// indices (`commit_index`, `applied_index`).
#[derive(Debug, Default)]
pub struct ReplicatedLog {
    entries: Vec<LogEntry>,
    pub commit_index: u64,
    pub applied_index: u64,
}

impl ReplicatedLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_log_index(&self) -> u64 {
        self.entries.last().map_or(0, |e| e.index)
    }

    #[must_use]
    pub fn last_log_term(&self) -> Term {
        self.entries.last().map_or(0, |e| e.term)
    }

    #[must_use]
    pub fn get(&self, index: u64) -> Option<&LogEntry> {
        if index == 0 {
            return None;
        }
        self.entries.get((index - 1) as usize)
    }

    #[must_use]
    pub fn term_at(&self, index: u64) -> Option<Term> {
        self.get(index).map(|e| e.term)
    }

    /// Leader-only: append a freshly proposed entry at the next index.
    pub fn leader_append(&mut self, term: Term, batch: Batch) -> u64 {
        let index = self.last_log_index() + 1;
        self.entries.push(LogEntry { index, term, batch, status: EntryStatus::Proposed });
        index
    }

    /// Re-insert an entry loaded from durable storage during recovery.
    /// Entries must arrive in ascending index order.
    pub fn leader_append_raw(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Follower-side acceptance test (spec section 4.5.3): the log at
    /// `prev_log_index` must match `prev_log_term`, or `prev_log_index`
    /// must be 0 (meaning "append from the start").
    #[must_use]
    pub fn matches_at(&self, prev_log_index: u64, prev_log_term: Term) -> bool {
        if prev_log_index == 0 {
            return true;
        }
        self.term_at(prev_log_index) == Some(prev_log_term)
    }

    /// Append `new_entries` starting right after `prev_log_index`,
    /// truncating any conflicting divergent suffix first (spec section
    /// 4.5.3: "overwrites divergent suffix. Followers never reorder
    /// entries.").
    pub fn append_entries(&mut self, prev_log_index: u64, new_entries: Vec<LogEntry>) {
        self.entries.truncate(prev_log_index as usize);
        for entry in new_entries {
            match self.entries.get((entry.index - 1) as usize) {
                Some(existing) if existing.term == entry.term => continue,
                _ => {
                    self.entries.truncate((entry.index - 1) as usize);
                    self.entries.push(entry);
                }
            }
        }
    }

    /// Advance `commit_index` to `candidate_index` if it is higher and
    /// the entry at that index belongs to `current_term` (spec section
    /// 4.5.3's safety rule: "earlier-term entries are committed only
    /// indirectly").
    pub fn advance_commit_index(&mut self, candidate_index: u64, current_term: Term) -> bool {
        if candidate_index <= self.commit_index {
            return false;
        }
        if self.term_at(candidate_index) != Some(current_term) {
            return false;
        }
        self.commit_index = candidate_index;
        for entry in self.entries.iter_mut().take(candidate_index as usize) {
            if matches!(entry.status, EntryStatus::Proposed | EntryStatus::Replicated) {
                entry.status = EntryStatus::Committed;
            }
        }
        true
    }

    /// Entries in `(applied_index, commit_index]`, in index order, for
    /// the applier to hand to the Transaction Pipeline.
    #[must_use]
    pub fn committed_unapplied(&self) -> Vec<&LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.index > self.applied_index && e.index <= self.commit_index)
            .collect()
    }

    pub fn mark_applied(&mut self, index: u64) {
        if let Some(entry) = self.entries.get_mut((index - 1) as usize) {
            entry.status = EntryStatus::Applied;
        }
        self.applied_index = self.applied_index.max(index);
    }

    #[must_use]
    pub fn entries_from(&self, index: u64) -> Vec<LogEntry> {
        self.entries.iter().filter(|e| e.index >= index).cloned().collect()
    }
}
