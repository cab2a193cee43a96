//! Query translation
//!
//! A [`QueryAdapter`] turns a validated rule tree into a backend-specific
//! predicate. Only validated rules are accepted, so adapters can rely on
//! operator arity, argument types and field existence.
//!
//! Empty groups follow the identity of their connective: an empty `AND`
//! matches everything, an empty `OR` matches nothing.

mod memory;
mod sql;

pub use memory::{FieldValue, MemoryAdapter, Record, RecordPredicate};
pub use sql::{ColumnMap, SqlAdapter, SqlFragment, SqlParam, SqlPredicate};

use crate::error::Result;
use chrono::{DateTime, Utc};
use roster_core::date::{end_of, parse_date, start_of};
use roster_core::{Condition, Operator, RuleValue, ValidatedRule, ValidatedRuleGroup, ValidatedRuleNode};

/// Translates validated rules into a backend predicate
pub trait QueryAdapter {
    /// Backend predicate (SQL fragment, in-memory closure, ...)
    type Predicate;

    /// Translate a single leaf rule
    fn translate_rule(&self, rule: &ValidatedRule) -> Result<Self::Predicate>;

    /// Join predicates with a connective
    fn combine(&self, condition: Condition, predicates: Vec<Self::Predicate>) -> Self::Predicate;

    /// Translate a whole rule tree, preserving its nesting
    fn translate(&self, group: &ValidatedRuleGroup) -> Result<Self::Predicate> {
        let predicates = group
            .rules()
            .iter()
            .map(|node| match node {
                ValidatedRuleNode::Rule(rule) => self.translate_rule(rule),
                ValidatedRuleNode::Group(nested) => self.translate(nested),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(self.combine(group.condition(), predicates))
    }
}

/// Date rule resolved against a clock
///
/// Every date argument implies a range through its unit: `2022-03` covers the
/// whole of March. Comparisons are made against the edges of that range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DateComparison {
    Within(DateTime<Utc>, DateTime<Utc>),
    Outside(DateTime<Utc>, DateTime<Utc>),
    Before(DateTime<Utc>),
    AtOrBefore(DateTime<Utc>),
    After(DateTime<Utc>),
    AtOrAfter(DateTime<Utc>),
}

impl DateComparison {
    /// Resolve a date rule's operator and arguments; None for non-comparisons
    pub(crate) fn resolve(
        operator: Operator,
        values: &[RuleValue],
        now: DateTime<Utc>,
    ) -> Result<Option<Self>> {
        let bound = |index: usize| -> Result<(DateTime<Utc>, DateTime<Utc>)> {
            let input = values.get(index).and_then(RuleValue::as_str).unwrap_or_default();
            let (date, unit) = parse_date(input, now)?;
            Ok((start_of(date, unit), end_of(date, unit)))
        };

        let comparison = match operator {
            Operator::Equal => {
                let (start, end) = bound(0)?;
                DateComparison::Within(start, end)
            }
            Operator::NotEqual => {
                let (start, end) = bound(0)?;
                DateComparison::Outside(start, end)
            }
            Operator::Less => DateComparison::Before(bound(0)?.0),
            Operator::LessOrEqual => DateComparison::AtOrBefore(bound(0)?.1),
            Operator::Greater => DateComparison::After(bound(0)?.1),
            Operator::GreaterOrEqual => DateComparison::AtOrAfter(bound(0)?.0),
            Operator::Between => DateComparison::Within(bound(0)?.0, bound(1)?.1),
            Operator::NotBetween => DateComparison::Outside(bound(0)?.0, bound(1)?.1),
            _ => return Ok(None),
        };

        Ok(Some(comparison))
    }

    pub(crate) fn matches(&self, date: DateTime<Utc>) -> bool {
        match *self {
            DateComparison::Within(start, end) => date >= start && date <= end,
            DateComparison::Outside(start, end) => date < start || date > end,
            DateComparison::Before(edge) => date < edge,
            DateComparison::AtOrBefore(edge) => date <= edge,
            DateComparison::After(edge) => date > edge,
            DateComparison::AtOrAfter(edge) => date >= edge,
        }
    }
}
