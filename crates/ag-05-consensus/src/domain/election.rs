//! Leader election decision logic (spec section 4.5.2), kept free of I/O
//! so it can be unit tested without a running cluster.

use super::roles::Term;

/// Whether a candidate's log is at least as up-to-date as the voter's
/// own (spec section 4.5.2): "higher last_log_term wins; if equal,
/// higher last_log_index wins."
#[must_use]
pub fn candidate_log_is_up_to_date(
    candidate_last_log_term: Term,
    candidate_last_log_index: u64,
    voter_last_log_term: Term,
    voter_last_log_index: u64,
) -> bool {
    match candidate_last_log_term.cmp(&voter_last_log_term) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate_last_log_index >= voter_last_log_index,
    }
}

/// Vote-granting decision (spec section 4.5.2): grant iff `received_term
/// >= current_term`, the voter has not yet voted this term (or already
/// voted for this exact candidate, for RPC retries), and the candidate's
/// log is at least as up-to-date.
#[must_use]
pub fn should_grant_vote(
    received_term: Term,
    current_term: Term,
    already_voted_for: Option<&str>,
    candidate_id: &str,
    candidate_log_up_to_date: bool,
) -> bool {
    if received_term < current_term {
        return false;
    }
    let vote_available = match already_voted_for {
        None => true,
        Some(existing) => existing == candidate_id,
    };
    vote_available && candidate_log_up_to_date
}

/// The minimum number of votes (including the candidate's own) that
/// forms a strict majority of a validator set of size `n`.
#[must_use]
pub fn quorum_size(n: usize) -> usize {
    n / 2 + 1
}
