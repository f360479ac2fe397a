//! Backup metadata and retention pruning (spec section 4.2).

use serde::{Deserialize, Serialize};

/// Metadata persisted alongside a backup archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub backup_id: String,
    pub origin_node: String,
    pub created_at: u64,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub storage_key_version: u32,
}

/// Given a retention policy of keeping the `keep_count` most recent
/// backups, return the ids of the backups to delete (oldest-first
/// survivors are never included in the result).
#[must_use]
pub fn prune_candidates(mut backups: Vec<BackupMetadata>, keep_count: usize) -> Vec<String> {
    backups.sort_by_key(|b| std::cmp::Reverse(b.created_at));
    backups.into_iter().skip(keep_count).map(|b| b.backup_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str, created_at: u64) -> BackupMetadata {
        BackupMetadata {
            backup_id: id.into(),
            origin_node: "n1".into(),
            created_at,
            compressed_size: 10,
            uncompressed_size: 20,
            storage_key_version: 1,
        }
    }

    #[test]
    fn keeps_most_recent_n() {
        let backups = vec![meta("a", 1), meta("b", 3), meta("c", 2)];
        let to_delete = prune_candidates(backups, 2);
        assert_eq!(to_delete, vec!["a".to_string()]);
    }

    #[test]
    fn keep_count_zero_deletes_all() {
        let backups = vec![meta("a", 1), meta("b", 2)];
        let mut to_delete = prune_candidates(backups, 0);
        to_delete.sort();
        assert_eq!(to_delete, vec!["a".to_string(), "b".to_string()]);
    }
}
