//! Joint-consensus validator-set changes (spec section 4.7/9 Open
//! Questions: "joint-consensus-style membership change is REQUIRED: the
//! new set is committed by a joint quorum across old ∪ new sets before
//! the old set is retired").

use shared_types::entities::NodeId;

use super::election::quorum_size;

/// A configuration epoch: either a stable single validator set, or a
/// transitional joint configuration spanning an old and new set.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum MembershipConfig {
    Stable { epoch: u64, validators: Vec<NodeId> },
    Joint { epoch: u64, old: Vec<NodeId>, new: Vec<NodeId> },
}

impl MembershipConfig {
    #[must_use]
    pub fn genesis(validators: Vec<NodeId>) -> Self {
        Self::Stable { epoch: 0, validators }
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        match self {
            Self::Stable { epoch, .. } | Self::Joint { epoch, .. } => *epoch,
        }
    }

    /// Begin a membership change: move from the current stable set to a
    /// joint configuration spanning it and `target`.
    #[must_use]
    pub fn begin_change(&self, target: Vec<NodeId>) -> Option<Self> {
        match self {
            Self::Stable { epoch, validators } => {
                Some(Self::Joint { epoch: epoch + 1, old: validators.clone(), new: target })
            }
            Self::Joint { .. } => None,
        }
    }

    /// Finalize a joint configuration into a stable one over the new set,
    /// once it has been committed (spec: "before the old set is
    /// retired").
    #[must_use]
    pub fn finalize(&self) -> Option<Self> {
        match self {
            Self::Joint { epoch, new, .. } => {
                Some(Self::Stable { epoch: epoch + 1, validators: new.clone() })
            }
            Self::Stable { .. } => None,
        }
    }

    /// Whether `candidate_index` is committed under this configuration:
    /// a stable set needs an ordinary majority; a joint configuration
    /// needs a majority of BOTH the old and the new set independently.
    #[must_use]
    pub fn is_committed(&self, votes_or_matches: &[NodeId], threshold_index: u64, match_index: impl Fn(&NodeId) -> u64) -> bool {
        match self {
            Self::Stable { validators, .. } => {
                count_at_least(validators, threshold_index, &match_index) >= quorum_size(validators.len())
            }
            Self::Joint { old, new, .. } => {
                let old_ok = count_at_least(old, threshold_index, &match_index) >= quorum_size(old.len());
                let new_ok = count_at_least(new, threshold_index, &match_index) >= quorum_size(new.len());
                old_ok && new_ok && !votes_or_matches.is_empty()
            }
        }
    }

    #[must_use]
    pub fn all_members(&self) -> Vec<NodeId> {
        match self {
            Self::Stable { validators, .. } => validators.clone(),
            Self::Joint { old, new, .. } => {
                let mut members = old.clone();
                for n in new {
                    if !members.contains(n) {
                        members.push(n.clone());
                    }
                }
                members
            }
        }
    }
}

fn count_at_least(set: &[NodeId], threshold: u64, match_index: &impl Fn(&NodeId) -> u64) -> usize {
    set.iter().filter(|n| match_index(n) >= threshold).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ids(names: &[&str]) -> Vec<NodeId> {
        names.iter().map(|n| NodeId::new(*n)).collect()
    }

    #[test]
    fn begin_change_produces_joint_config_spanning_both_sets() {
        let stable = MembershipConfig::genesis(ids(&["v1", "v2", "v3"]));
        let joint = stable.begin_change(ids(&["v2", "v3", "v4"])).unwrap();
        match joint {
            MembershipConfig::Joint { old, new, epoch } => {
                assert_eq!(epoch, 1);
                assert_eq!(old, ids(&["v1", "v2", "v3"]));
                assert_eq!(new, ids(&["v2", "v3", "v4"]));
            }
            MembershipConfig::Stable { .. } => panic!("expected joint"),
        }
    }

    #[test]
    fn cannot_begin_change_while_already_joint() {
        let joint = MembershipConfig::Joint { epoch: 1, old: ids(&["v1"]), new: ids(&["v2"]) };
        assert!(joint.begin_change(ids(&["v3"])).is_none());
    }

    #[test]
    fn finalize_retires_old_set() {
        let joint = MembershipConfig::Joint { epoch: 1, old: ids(&["v1", "v2"]), new: ids(&["v2", "v3"]) };
        let stable = joint.finalize().unwrap();
        match stable {
            MembershipConfig::Stable { validators, epoch } => {
                assert_eq!(epoch, 2);
                assert_eq!(validators, ids(&["v2", "v3"]));
            }
            MembershipConfig::Joint { .. } => panic!("expected stable"),
        }
    }

    #[test]
    fn joint_commit_requires_majority_of_both_sets() {
        let joint = MembershipConfig::Joint { epoch: 1, old: ids(&["v1", "v2", "v3"]), new: ids(&["v3", "v4", "v5"]) };
        let matches: HashMap<NodeId, u64> = [
            ("v1", 10), ("v2", 10), ("v3", 10), ("v4", 0), ("v5", 0),
        ]
        .into_iter()
        .map(|(n, i)| (NodeId::new(n), i))
        .collect();
        let lookup = |id: &NodeId| *matches.get(id).unwrap_or(&0);
        // old set has 3/3 at index 10 (majority), new set only has v3 (1/3, not majority).
        assert!(!joint.is_committed(&joint.all_members(), 10, lookup));
    }

    #[test]
    fn all_members_dedups_overlap() {
        let joint = MembershipConfig::Joint { epoch: 1, old: ids(&["v1", "v2"]), new: ids(&["v2", "v3"]) };
        assert_eq!(joint.all_members(), ids(&["v1", "v2", "v3"]));
    }
}
