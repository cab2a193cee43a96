//! PostgreSQL query translation
//!
//! Rules become a `WHERE` clause with positional `$n` parameters. Argument
//! values never appear in the SQL text; column expressions come from a
//! [`ColumnMap`] supplied by the caller.

use super::{DateComparison, QueryAdapter};
use crate::error::{Result, RuntimeError};
use chrono::{DateTime, Utc};
use roster_core::{
    Condition, FilterSchema, FilterType, Operator, RuleValue, ValidatedRule, ValidatedRuleGroup,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write;

/// Field name to column expression mapping
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    columns: HashMap<String, String>,
}

impl ColumnMap {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a field to a column expression
    pub fn with_column(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.columns.insert(field.into(), column.into());
        self
    }

    /// Map every plain field of a schema to a quoted column of the same name
    ///
    /// Dotted fields (callout answers and the like) live outside the entity
    /// table and stay unmapped.
    pub fn quoted(schema: &FilterSchema) -> Self {
        let columns = schema
            .fields()
            .filter(|(name, _)| !name.contains('.'))
            .map(|(name, _)| (name.to_string(), format!("\"{}\"", name)))
            .collect();
        Self { columns }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.columns.get(field).map(String::as_str)
    }

    /// Fail with [`RuntimeError::UnmappedField`] on the first leaf without a column
    pub fn check(&self, group: &ValidatedRuleGroup) -> Result<()> {
        match group
            .flatten()
            .into_iter()
            .find(|rule| self.get(rule.field()).is_none())
        {
            Some(rule) => Err(RuntimeError::UnmappedField(rule.field().to_string())),
            None => Ok(()),
        }
    }
}

/// A bound query parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    Text(String),
    Number(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl From<&RuleValue> for SqlParam {
    fn from(value: &RuleValue) -> Self {
        match value {
            RuleValue::String(s) => SqlParam::Text(s.clone()),
            RuleValue::Number(n) => SqlParam::Number(*n),
            RuleValue::Bool(b) => SqlParam::Bool(*b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SqlPart {
    Sql(String),
    Param(SqlParam),
}

/// Unnumbered SQL under construction
///
/// Parameters stay out of band until [`render`](SqlFragment::render) assigns
/// positions, so fragments can be nested in any order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlFragment {
    parts: Vec<SqlPart>,
}

impl SqlFragment {
    fn sql(text: impl Into<String>) -> Self {
        Self {
            parts: vec![SqlPart::Sql(text.into())],
        }
    }

    fn push_sql(mut self, text: impl Into<String>) -> Self {
        self.parts.push(SqlPart::Sql(text.into()));
        self
    }

    fn push_param(mut self, param: SqlParam) -> Self {
        self.parts.push(SqlPart::Param(param));
        self
    }

    fn append(mut self, other: SqlFragment) -> Self {
        self.parts.extend(other.parts);
        self
    }

    /// Number parameters in order of appearance
    pub fn render(&self) -> SqlPredicate {
        let mut sql = String::new();
        let mut params = Vec::new();
        for part in &self.parts {
            match part {
                SqlPart::Sql(text) => sql.push_str(text),
                SqlPart::Param(param) => {
                    params.push(param.clone());
                    let _ = write!(sql, "${}", params.len());
                }
            }
        }
        SqlPredicate { sql, params }
    }
}

/// Rendered `WHERE` clause and its parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlPredicate {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// PostgreSQL adapter
#[derive(Debug, Clone)]
pub struct SqlAdapter {
    columns: ColumnMap,
    now: DateTime<Utc>,
}

impl SqlAdapter {
    /// Create an adapter resolving relative dates against the current time
    pub fn new(columns: ColumnMap) -> Self {
        Self {
            columns,
            now: Utc::now(),
        }
    }

    /// Resolve relative dates against a fixed instant
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Translate and render a rule tree in one step
    pub fn where_clause(&self, group: &ValidatedRuleGroup) -> Result<SqlPredicate> {
        Ok(self.translate(group)?.render())
    }

    fn emptiness(column: &str, field_type: FilterType, negated: bool) -> SqlFragment {
        let sql = match (field_type, negated) {
            (FilterType::Text, false) => format!("({0} IS NULL OR {0} = '')", column),
            (FilterType::Text, true) => format!("({0} IS NOT NULL AND {0} <> '')", column),
            (FilterType::Array, false) => format!("({0} IS NULL OR {0} = '{{}}')", column),
            (FilterType::Array, true) => format!("({0} IS NOT NULL AND {0} <> '{{}}')", column),
            (_, false) => format!("{} IS NULL", column),
            (_, true) => format!("{} IS NOT NULL", column),
        };
        SqlFragment::sql(sql)
    }

    fn date_comparison(column: &str, comparison: DateComparison) -> SqlFragment {
        let compare = |op: &str, edge: DateTime<Utc>| {
            SqlFragment::sql(format!("{} {} ", column, op)).push_param(SqlParam::Timestamp(edge))
        };
        let range = |keyword: &str, start: DateTime<Utc>, end: DateTime<Utc>| {
            SqlFragment::sql(format!("{} {} ", column, keyword))
                .push_param(SqlParam::Timestamp(start))
                .push_sql(" AND ")
                .push_param(SqlParam::Timestamp(end))
        };

        match comparison {
            DateComparison::Within(start, end) => range("BETWEEN", start, end),
            DateComparison::Outside(start, end) => range("NOT BETWEEN", start, end),
            DateComparison::Before(edge) => compare("<", edge),
            DateComparison::AtOrBefore(edge) => compare("<=", edge),
            DateComparison::After(edge) => compare(">", edge),
            DateComparison::AtOrAfter(edge) => compare(">=", edge),
        }
    }

    fn pattern(operator: Operator, value: &str) -> Option<(bool, String)> {
        let escaped = escape_like(value);
        let (negated, pattern) = match operator {
            Operator::BeginsWith => (false, format!("{}%", escaped)),
            Operator::NotBeginsWith => (true, format!("{}%", escaped)),
            Operator::EndsWith => (false, format!("%{}", escaped)),
            Operator::NotEndsWith => (true, format!("%{}", escaped)),
            Operator::Contains => (false, format!("%{}%", escaped)),
            Operator::NotContains => (true, format!("%{}%", escaped)),
            _ => return None,
        };
        Some((negated, pattern))
    }
}

fn is_pattern(operator: Operator) -> bool {
    matches!(
        operator,
        Operator::BeginsWith
            | Operator::NotBeginsWith
            | Operator::EndsWith
            | Operator::NotEndsWith
            | Operator::Contains
            | Operator::NotContains
    )
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl QueryAdapter for SqlAdapter {
    type Predicate = SqlFragment;

    fn translate_rule(&self, rule: &ValidatedRule) -> Result<SqlFragment> {
        let column = self
            .columns
            .get(rule.field())
            .ok_or_else(|| RuntimeError::UnmappedField(rule.field().to_string()))?;
        let operator = rule.operator();
        let field_type = rule.field_type();
        let param = |index: usize| {
            rule.value()
                .get(index)
                .map(SqlParam::from)
                .unwrap_or(SqlParam::Text(String::new()))
        };
        let unsupported = || RuntimeError::UnsupportedOperator {
            operator,
            field_type,
        };

        if operator.is_nullable() {
            return Ok(Self::emptiness(column, field_type, operator.is_negated()));
        }

        let fragment = match field_type {
            FilterType::Date => {
                let comparison = DateComparison::resolve(operator, rule.value(), self.now)?
                    .ok_or_else(unsupported)?;
                Self::date_comparison(column, comparison)
            }
            FilterType::Array => match operator {
                Operator::Contains => SqlFragment::default()
                    .push_param(param(0))
                    .push_sql(format!(" = ANY({})", column)),
                Operator::NotContains => SqlFragment::sql("NOT (")
                    .push_param(param(0))
                    .push_sql(format!(" = ANY({}))", column)),
                _ => return Err(unsupported()),
            },
            FilterType::Text | FilterType::Blob if is_pattern(operator) => {
                let value = rule.value().first().and_then(RuleValue::as_str).unwrap_or_default();
                let (negated, pattern) = Self::pattern(operator, value).ok_or_else(unsupported)?;
                let target = if field_type == FilterType::Blob {
                    format!("{}::text", column)
                } else {
                    column.to_string()
                };
                let keyword = if negated { "NOT ILIKE" } else { "ILIKE" };
                SqlFragment::sql(format!("{} {} ", target, keyword))
                    .push_param(SqlParam::Text(pattern))
            }
            _ => {
                let compare =
                    |op: &str| SqlFragment::sql(format!("{} {} ", column, op)).push_param(param(0));
                match operator {
                    Operator::Equal => compare("="),
                    Operator::NotEqual => compare("<>"),
                    Operator::Less => compare("<"),
                    Operator::LessOrEqual => compare("<="),
                    Operator::Greater => compare(">"),
                    Operator::GreaterOrEqual => compare(">="),
                    Operator::Between | Operator::NotBetween => {
                        let keyword = if operator.is_negated() { "NOT BETWEEN" } else { "BETWEEN" };
                        SqlFragment::sql(format!("{} {} ", column, keyword))
                            .push_param(param(0))
                            .push_sql(" AND ")
                            .push_param(param(1))
                    }
                    _ => return Err(unsupported()),
                }
            }
        };

        Ok(fragment)
    }

    fn combine(&self, condition: Condition, predicates: Vec<SqlFragment>) -> SqlFragment {
        let (identity, joiner) = match condition {
            Condition::And => ("TRUE", " AND "),
            Condition::Or => ("FALSE", " OR "),
        };

        let mut predicates = predicates.into_iter();
        match (predicates.next(), predicates.len()) {
            (None, _) => SqlFragment::sql(identity),
            (Some(only), 0) => only,
            (Some(first), _) => {
                let combined = predicates.fold(SqlFragment::sql("(").append(first), |acc, next| {
                    acc.push_sql(joiner).append(next)
                });
                combined.push_sql(")")
            }
        }
    }
}
