//! Segment membership ledger
//!
//! The ledger is the only record of who was in a segment at the end of the
//! last run. Each run diffs the freshly matched population against it and
//! checkpoints the diff before any side effect is dispatched.

mod file;
mod memory;
#[cfg(feature = "sqlx")]
mod postgresql;

pub use file::FileLedger;
pub use memory::MemoryLedger;
#[cfg(feature = "sqlx")]
pub use postgresql::PostgresLedger;

use crate::error::Result;
use crate::population::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Entities that entered and left a segment between two runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipDiff {
    pub joined: BTreeSet<EntityId>,
    pub left: BTreeSet<EntityId>,
}

impl MembershipDiff {
    /// `joined = matched - previous`, `left = previous - matched`
    pub fn compute(previous: &BTreeSet<EntityId>, matched: &BTreeSet<EntityId>) -> Self {
        Self {
            joined: matched.difference(previous).cloned().collect(),
            left: previous.difference(matched).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// Persistent segment membership
#[async_trait::async_trait]
pub trait MembershipLedger: Send + Sync {
    /// Current members of a segment
    async fn members(&self, segment_id: &str) -> Result<BTreeSet<EntityId>>;

    /// Remove `left` and insert `joined` as one atomic change
    async fn apply_diff(&self, segment_id: &str, diff: &MembershipDiff) -> Result<()>;
}
