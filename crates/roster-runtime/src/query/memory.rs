//! In-memory query translation
//!
//! Compiles rules into closures over [`Record`]s. Semantics follow the SQL
//! adapter: string matching is case-insensitive, date arguments cover the
//! range implied by their unit, and a missing or null field only satisfies
//! `is_empty`.

use super::{DateComparison, QueryAdapter};
use crate::error::{Result, RuntimeError};
use chrono::{DateTime, SecondsFormat, Utc};
use roster_core::{parse_date, Condition, FilterType, Operator, RuleValue, ValidatedRule};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Value of a record field
///
/// Dates are stored as ISO-8601 text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Date field value
    pub fn date(date: DateTime<Utc>) -> Self {
        FieldValue::Text(date.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Null, empty text or empty list
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Bool(_) | FieldValue::Number(_) => false,
        }
    }

    fn compare(&self, value: &RuleValue) -> Option<Ordering> {
        match (self, value) {
            (FieldValue::Text(a), RuleValue::String(b)) => Some(a.as_str().cmp(b.as_str())),
            (FieldValue::Number(a), RuleValue::Number(b)) => a.partial_cmp(b),
            (FieldValue::Bool(a), RuleValue::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// A flat entity record keyed by filter field name
pub type Record = HashMap<String, FieldValue>;

/// Compiled rule tree
pub type RecordPredicate = Box<dyn Fn(&Record) -> bool + Send + Sync>;

type ValueMatcher = Box<dyn Fn(&FieldValue) -> bool + Send + Sync>;

/// In-memory adapter
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    now: DateTime<Utc>,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAdapter {
    /// Create an adapter resolving relative dates against the current time
    pub fn new() -> Self {
        Self { now: Utc::now() }
    }

    /// Resolve relative dates against a fixed instant
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    fn date_matcher(&self, comparison: DateComparison) -> ValueMatcher {
        let now = self.now;
        Box::new(move |value| match value {
            FieldValue::Text(text) => parse_date(text, now)
                .map(|(date, _)| comparison.matches(date))
                .unwrap_or(false),
            _ => false,
        })
    }

    fn pattern_matcher(operator: Operator, needle: &str) -> Option<ValueMatcher> {
        let needle = needle.to_lowercase();
        let test: fn(&str, &str) -> bool = match operator {
            Operator::BeginsWith | Operator::NotBeginsWith => |h: &str, n: &str| h.starts_with(n),
            Operator::EndsWith | Operator::NotEndsWith => |h: &str, n: &str| h.ends_with(n),
            Operator::Contains | Operator::NotContains => |h: &str, n: &str| h.contains(n),
            _ => return None,
        };
        let negated = operator.is_negated();
        Some(Box::new(move |value| match value {
            FieldValue::Text(text) => test(&text.to_lowercase(), &needle) != negated,
            _ => false,
        }))
    }

    fn ordering_matcher(operator: Operator, values: &[RuleValue]) -> Option<ValueMatcher> {
        let first = values.first()?.clone();
        let matcher: ValueMatcher = match operator {
            Operator::Equal => Box::new(move |v| v.compare(&first) == Some(Ordering::Equal)),
            Operator::NotEqual => {
                Box::new(move |v| matches!(v.compare(&first), Some(o) if o != Ordering::Equal))
            }
            Operator::Less => Box::new(move |v| v.compare(&first) == Some(Ordering::Less)),
            Operator::LessOrEqual => Box::new(move |v| {
                matches!(v.compare(&first), Some(Ordering::Less | Ordering::Equal))
            }),
            Operator::Greater => Box::new(move |v| v.compare(&first) == Some(Ordering::Greater)),
            Operator::GreaterOrEqual => Box::new(move |v| {
                matches!(v.compare(&first), Some(Ordering::Greater | Ordering::Equal))
            }),
            Operator::Between | Operator::NotBetween => {
                let last = values.get(1)?.clone();
                let negated = operator.is_negated();
                Box::new(move |v| match (v.compare(&first), v.compare(&last)) {
                    (Some(low), Some(high)) => {
                        (low != Ordering::Less && high != Ordering::Greater) != negated
                    }
                    _ => false,
                })
            }
            _ => return None,
        };
        Some(matcher)
    }
}

impl QueryAdapter for MemoryAdapter {
    type Predicate = RecordPredicate;

    fn translate_rule(&self, rule: &ValidatedRule) -> Result<RecordPredicate> {
        let field = rule.field().to_string();
        let operator = rule.operator();
        let field_type = rule.field_type();
        let unsupported = || RuntimeError::UnsupportedOperator {
            operator,
            field_type,
        };

        if operator.is_nullable() {
            let negated = operator.is_negated();
            return Ok(Box::new(move |record| {
                record.get(&field).map_or(true, FieldValue::is_empty) != negated
            }));
        }

        let matcher: ValueMatcher = match field_type {
            FilterType::Date => {
                let comparison = DateComparison::resolve(operator, rule.value(), self.now)?
                    .ok_or_else(unsupported)?;
                self.date_matcher(comparison)
            }
            FilterType::Array => {
                let needle = rule
                    .value()
                    .first()
                    .and_then(RuleValue::as_str)
                    .unwrap_or_default()
                    .to_string();
                let negated = match operator {
                    Operator::Contains => false,
                    Operator::NotContains => true,
                    _ => return Err(unsupported()),
                };
                Box::new(move |value| match value {
                    FieldValue::List(items) => items.contains(&needle) != negated,
                    _ => false,
                })
            }
            FilterType::Text | FilterType::Blob
                if !matches!(operator, Operator::Equal | Operator::NotEqual) =>
            {
                let needle = rule.value().first().and_then(RuleValue::as_str).unwrap_or_default();
                Self::pattern_matcher(operator, needle).ok_or_else(unsupported)?
            }
            _ => Self::ordering_matcher(operator, rule.value()).ok_or_else(unsupported)?,
        };

        Ok(Box::new(move |record| match record.get(&field) {
            None | Some(FieldValue::Null) => false,
            Some(value) => matcher(value),
        }))
    }

    fn combine(&self, condition: Condition, predicates: Vec<RecordPredicate>) -> RecordPredicate {
        match condition {
            Condition::And => Box::new(move |record| predicates.iter().all(|p| p(record))),
            Condition::Or => Box::new(move |record| predicates.iter().any(|p| p(record))),
        }
    }
}
