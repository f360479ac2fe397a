//! Roles and terms (spec section 4.5.1): "each validator holds a role
//! FOLLOWER, CANDIDATE, or LEADER, and a term number... a term has at
//! most one leader."

use shared_types::entities::NodeId;

pub type Term = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Role {
    Follower,
    Candidate,
    Leader,
}

/// A validator's current consensus view: its role, term, and (if voted
/// this term) who it voted for.
#[derive(Debug, Clone)]
pub struct ConsensusView {
    pub role: Role,
    pub current_term: Term,
    pub voted_for: Option<NodeId>,
    pub leader_id: Option<NodeId>,
}

impl ConsensusView {
    #[must_use]
    pub fn new() -> Self {
        Self { role: Role::Follower, current_term: 0, voted_for: None, leader_id: None }
    }

    /// Observe a term carried on an incoming message. If it exceeds ours,
    /// step down to FOLLOWER for the new term (spec section 4.5.2: "if a
    /// node receives any message with a higher term, it updates its term
    /// and reverts to FOLLOWER before processing further").
    pub fn observe_term(&mut self, observed_term: Term) -> bool {
        if observed_term > self.current_term {
            self.current_term = observed_term;
            self.role = Role::Follower;
            self.voted_for = None;
            self.leader_id = None;
            true
        } else {
            false
        }
    }

    pub fn become_candidate(&mut self, self_id: &NodeId) {
        self.current_term += 1;
        self.role = Role::Candidate;
        self.voted_for = Some(self_id.clone());
        self.leader_id = None;
    }

    pub fn become_leader(&mut self, self_id: &NodeId) {
        self.role = Role::Leader;
        self.leader_id = Some(self_id.clone());
    }

    pub fn become_follower(&mut self) {
        self.role = Role::Follower;
    }
}

impl Default for ConsensusView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_observed_term_demotes_to_follower() {
        let mut view = ConsensusView::new();
        view.become_candidate(&NodeId::new("v1"));
        assert_eq!(view.role, Role::Candidate);
        assert!(view.observe_term(5));
        assert_eq!(view.role, Role::Follower);
        assert_eq!(view.current_term, 5);
        assert!(view.voted_for.is_none());
    }

    #[test]
    fn lower_or_equal_term_does_not_demote() {
        let mut view = ConsensusView::new();
        view.current_term = 3;
        assert!(!view.observe_term(3));
        assert!(!view.observe_term(2));
    }

    #[test]
    fn candidacy_increments_term_and_votes_for_self() {
        let mut view = ConsensusView::new();
        let id = NodeId::new("v1");
        view.become_candidate(&id);
        assert_eq!(view.current_term, 1);
        assert_eq!(view.voted_for, Some(id));
    }
}
