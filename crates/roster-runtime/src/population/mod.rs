//! Entity populations
//!
//! A population source answers "which entities match this rule tree right
//! now". Results are exhaustive: callers diff them against stored
//! memberships, so a partial page would read as mass departures.

mod memory;
#[cfg(feature = "sqlx")]
mod postgresql;

pub use memory::MemoryPopulation;
#[cfg(feature = "sqlx")]
pub use postgresql::PostgresPopulation;

use crate::error::Result;
use roster_core::ValidatedRuleGroup;
use std::collections::BTreeSet;

/// Primary key of a filtered entity
pub type EntityId = String;

/// Source of entities matching a validated rule tree
#[async_trait::async_trait]
pub trait PopulationSource: Send + Sync {
    /// Ids of every entity matching the group
    async fn matching_ids(&self, group: &ValidatedRuleGroup) -> Result<BTreeSet<EntityId>>;

    /// Whether this source can evaluate every field of the group
    ///
    /// Lets callers reject a rule tree when it is saved rather than on every
    /// run. Sources that can evaluate any schema field keep the default.
    fn check_rules(&self, _group: &ValidatedRuleGroup) -> Result<()> {
        Ok(())
    }
}
