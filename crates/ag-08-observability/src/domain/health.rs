//! Health probes (spec section 4.8): "live (process up), ready (node
//! state == RUNNING && consensus role in {LEADER, FOLLOWER} && store
//! reachable), started (initial recovery complete)."

use shared_types::entities::NodeStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ConsensusRoleSnapshot {
    Follower,
    Candidate,
    Leader,
}

#[derive(Debug, Clone)]
pub struct HealthInputs {
    pub node_status: NodeStatus,
    pub consensus_role: ConsensusRoleSnapshot,
    pub store_reachable: bool,
    pub recovery_complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HealthReport {
    pub live: bool,
    pub ready: bool,
    pub started: bool,
}

#[must_use]
pub fn evaluate(inputs: &HealthInputs) -> HealthReport {
    let ready = inputs.node_status == NodeStatus::Running
        && inputs.consensus_role != ConsensusRoleSnapshot::Candidate
        && inputs.store_reachable;
    HealthReport { live: true, ready, started: inputs.recovery_complete }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> HealthInputs {
        HealthInputs {
            node_status: NodeStatus::Running,
            consensus_role: ConsensusRoleSnapshot::Follower,
            store_reachable: true,
            recovery_complete: true,
        }
    }

    #[test]
    fn fully_healthy_node_reports_all_true() {
        let report = evaluate(&base());
        assert!(report.live && report.ready && report.started);
    }

    #[test]
    fn candidate_role_is_not_ready() {
        let mut inputs = base();
        inputs.consensus_role = ConsensusRoleSnapshot::Candidate;
        assert!(!evaluate(&inputs).ready);
    }

    #[test]
    fn unreachable_store_is_not_ready() {
        let mut inputs = base();
        inputs.store_reachable = false;
        assert!(!evaluate(&inputs).ready);
    }

    #[test]
    fn process_is_always_live_even_when_not_ready() {
        let mut inputs = base();
        inputs.node_status = NodeStatus::Initializing;
        let report = evaluate(&inputs);
        assert!(report.live);
        assert!(!report.ready);
    }
}
