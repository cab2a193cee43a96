//! Flattening and combining rule groups

use super::types::{Condition, Rule, RuleGroup, RuleNode};

/// Collect every leaf rule of a group, depth-first pre-order
///
/// Group structure is discarded; use this when only the referenced fields
/// matter (e.g. to find which callouts a contact filter refers to).
pub fn flatten_rules(group: &RuleGroup) -> Vec<&Rule> {
    group.flatten()
}

/// AND together a list of optional rule groups
///
/// Each present group is kept as a nested group, so a mandatory
/// access-control group cannot be weakened by whatever the caller supplies
/// alongside it. Absent groups are skipped.
pub fn merge_rules<I>(groups: I) -> RuleGroup
where
    I: IntoIterator<Item = Option<RuleGroup>>,
{
    RuleGroup {
        condition: Condition::And,
        rules: groups.into_iter().flatten().map(RuleNode::Group).collect(),
    }
}
