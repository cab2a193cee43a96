//! Roster Core - Rule DSL and filter schemas for the Roster segment engine
//!
//! This crate provides the pure, synchronous building blocks shared by every
//! consumer of the filter engine (contact search, callout response search,
//! payment search, segment definitions):
//! - Rule and rule group types (the query DSL)
//! - Filter schemas and the static per-entity registry
//! - Relative and absolute date expressions
//! - Rule validation against a schema
//! - Callout form driven schema extensions
//! - Error types

pub mod callout;
pub mod date;
pub mod error;
pub mod rules;
pub mod schema;
pub mod validation;

// Re-export commonly used types
pub use date::{get_min_date_unit, is_date_between, is_valid_date, parse_date, DateUnit};
pub use error::{FilterError, InvalidRuleReason, Result};
pub use rules::{
    flatten_rules, merge_rules, Condition, Operator, Rule, RuleGroup, RuleNode, RuleValue,
    ValueType,
};
pub use schema::{FilterEntity, FilterField, FilterSchema, FilterType};
pub use validation::{
    validate_rule, validate_rule_group, validate_rule_group_with_depth, RuleValidator,
    ValidatedRule, ValidatedRuleGroup, ValidatedRuleNode,
};
