//! Rule validation
//!
//! Untrusted rules are checked against a [`FilterSchema`](crate::FilterSchema)
//! and turned into validated rules annotated with the resolved field type.
//! Validated rules cannot be built any other way, so query adapters that only
//! accept them never see unchecked input.

mod validated;
mod validator;

pub use validated::{ValidatedRule, ValidatedRuleGroup, ValidatedRuleNode};
pub use validator::{
    validate_rule, validate_rule_group, validate_rule_group_with_depth, RuleValidator,
};
