//! Error types for Roster Core

use crate::rules::{Rule, ValueType};
use crate::schema::FilterType;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// A rule failed schema, operator, arity or value checks
    #[error("Invalid rule on field '{}': {reason}", .rule.field)]
    InvalidRule {
        /// The offending rule, as submitted
        rule: Rule,
        /// Why the rule was rejected
        reason: InvalidRuleReason,
    },

    /// A rule group was nested deeper than the caller allows
    #[error("Rule group exceeds maximum depth of {max_depth}")]
    TooDeep { max_depth: usize },
}

/// Reason a rule was rejected by the validator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidRuleReason {
    #[error("Invalid field: {field}")]
    UnknownField { field: String },

    #[error("Operator '{operator}' cannot be used on non-nullable field '{field}'")]
    NotNullable { field: String, operator: String },

    #[error("Invalid operator '{operator}' for {field_type} field '{field}'")]
    OperatorNotAllowed {
        field: String,
        operator: String,
        field_type: FilterType,
    },

    #[error("Operator '{operator}' expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        operator: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid argument type for field '{field}': expected {expected}, got {actual}")]
    ArgumentType {
        field: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("Invalid date '{value}' for field '{field}'")]
    InvalidDate { field: String, value: String },

    #[error("Invalid value '{value}' for field '{field}', expected one of: {}", .options.join(", "))]
    InvalidOption {
        field: String,
        value: String,
        options: Vec<String>,
    },
}

impl FilterError {
    /// The rejected rule, if this error concerns a single rule
    pub fn rule(&self) -> Option<&Rule> {
        match self {
            FilterError::InvalidRule { rule, .. } => Some(rule),
            FilterError::TooDeep { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;
