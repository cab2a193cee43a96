//! Operator catalogue
//!
//! Operators are scoped by field type: numeric comparisons are undefined for
//! text, string matching is undefined for dates, and so on. The two
//! nullable-class operators (`is_empty`, `is_not_empty`) test presence rather
//! than compare against a value and are checked against field nullability
//! instead of the per-type table.

use crate::schema::FilterType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rule operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    // Equality
    Equal,
    NotEqual,

    // String matching
    BeginsWith,
    NotBeginsWith,
    EndsWith,
    NotEndsWith,
    Contains,
    NotContains,

    // Ordering
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Between,
    NotBetween,

    // Presence
    IsEmpty,
    IsNotEmpty,
}

const EQUALITY: &[Operator] = &[Operator::Equal, Operator::NotEqual];

const TEXT: &[Operator] = &[
    Operator::Equal,
    Operator::NotEqual,
    Operator::BeginsWith,
    Operator::NotBeginsWith,
    Operator::EndsWith,
    Operator::NotEndsWith,
    Operator::Contains,
    Operator::NotContains,
];

const ORDERED: &[Operator] = &[
    Operator::Equal,
    Operator::NotEqual,
    Operator::Less,
    Operator::LessOrEqual,
    Operator::Greater,
    Operator::GreaterOrEqual,
    Operator::Between,
    Operator::NotBetween,
];

const MEMBERSHIP: &[Operator] = &[Operator::Contains, Operator::NotContains];

const BOOLEAN: &[Operator] = &[Operator::Equal];

impl Operator {
    pub const ALL: [Operator; 16] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::BeginsWith,
        Operator::NotBeginsWith,
        Operator::EndsWith,
        Operator::NotEndsWith,
        Operator::Contains,
        Operator::NotContains,
        Operator::Less,
        Operator::LessOrEqual,
        Operator::Greater,
        Operator::GreaterOrEqual,
        Operator::Between,
        Operator::NotBetween,
        Operator::IsEmpty,
        Operator::IsNotEmpty,
    ];

    /// Parse an operator name, returning None for unknown names
    pub fn parse(name: &str) -> Option<Operator> {
        Self::ALL.iter().copied().find(|op| op.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "equal",
            Operator::NotEqual => "not_equal",
            Operator::BeginsWith => "begins_with",
            Operator::NotBeginsWith => "not_begins_with",
            Operator::EndsWith => "ends_with",
            Operator::NotEndsWith => "not_ends_with",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::Less => "less",
            Operator::LessOrEqual => "less_or_equal",
            Operator::Greater => "greater",
            Operator::GreaterOrEqual => "greater_or_equal",
            Operator::Between => "between",
            Operator::NotBetween => "not_between",
            Operator::IsEmpty => "is_empty",
            Operator::IsNotEmpty => "is_not_empty",
        }
    }

    /// Number of arguments the operator takes
    pub fn arity(&self) -> usize {
        match self {
            Operator::IsEmpty | Operator::IsNotEmpty => 0,
            Operator::Between | Operator::NotBetween => 2,
            _ => 1,
        }
    }

    /// Returns true for operators that test presence rather than compare
    pub fn is_nullable(&self) -> bool {
        matches!(self, Operator::IsEmpty | Operator::IsNotEmpty)
    }

    /// Returns true for the negated form of another operator
    pub fn is_negated(&self) -> bool {
        matches!(
            self,
            Operator::NotEqual
                | Operator::NotBeginsWith
                | Operator::NotEndsWith
                | Operator::NotContains
                | Operator::NotBetween
                | Operator::IsNotEmpty
        )
    }

    /// Operators defined for a field type, excluding nullable-class operators
    pub fn for_type(field_type: FilterType) -> &'static [Operator] {
        match field_type {
            FilterType::Text => TEXT,
            FilterType::Blob => MEMBERSHIP,
            FilterType::Date | FilterType::Number => ORDERED,
            FilterType::Boolean => BOOLEAN,
            FilterType::Array => MEMBERSHIP,
            FilterType::Enum | FilterType::Contact => EQUALITY,
        }
    }

    /// Whether this operator may be applied to a field of the given type
    pub fn allowed_for(&self, field_type: FilterType) -> bool {
        Self::for_type(field_type).contains(self)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
