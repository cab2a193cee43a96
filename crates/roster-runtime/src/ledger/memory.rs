//! In-memory membership ledger

use super::{MembershipDiff, MembershipLedger};
use crate::error::Result;
use crate::population::EntityId;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

/// In-memory ledger
///
/// A diff is applied under a single write lock, so readers never observe a
/// half-applied change.
#[derive(Default)]
pub struct MemoryLedger {
    /// Map of segment_id -> member ids
    segments: RwLock<HashMap<String, BTreeSet<EntityId>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MembershipLedger for MemoryLedger {
    async fn members(&self, segment_id: &str) -> Result<BTreeSet<EntityId>> {
        let segments = self.segments.read().await;
        Ok(segments.get(segment_id).cloned().unwrap_or_default())
    }

    async fn apply_diff(&self, segment_id: &str, diff: &MembershipDiff) -> Result<()> {
        let mut segments = self.segments.write().await;
        let members = segments.entry(segment_id.to_string()).or_default();

        for id in &diff.left {
            members.remove(id);
        }
        members.extend(diff.joined.iter().cloned());

        tracing::debug!(
            segment = segment_id,
            joined = diff.joined.len(),
            left = diff.left.len(),
            "Applied membership diff"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> BTreeSet<EntityId> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_apply_diff() {
        let ledger = MemoryLedger::new();
        assert!(ledger.members("s1").await.unwrap().is_empty());

        let first = MembershipDiff::compute(&ids(&[]), &ids(&["a", "b"]));
        ledger.apply_diff("s1", &first).await.unwrap();
        assert_eq!(ledger.members("s1").await.unwrap(), ids(&["a", "b"]));

        let second = MembershipDiff::compute(&ids(&["a", "b"]), &ids(&["b", "c"]));
        ledger.apply_diff("s1", &second).await.unwrap();
        assert_eq!(ledger.members("s1").await.unwrap(), ids(&["b", "c"]));
    }

    #[tokio::test]
    async fn test_segments_are_independent() {
        let ledger = MemoryLedger::new();
        let diff = MembershipDiff::compute(&ids(&[]), &ids(&["a"]));
        ledger.apply_diff("s1", &diff).await.unwrap();

        assert!(ledger.members("s2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reapplying_is_idempotent() {
        let ledger = MemoryLedger::new();
        let diff = MembershipDiff::compute(&ids(&["x"]), &ids(&["a"]));
        ledger.apply_diff("s1", &diff).await.unwrap();
        ledger.apply_diff("s1", &diff).await.unwrap();

        assert_eq!(ledger.members("s1").await.unwrap(), ids(&["a"]));
    }
}
