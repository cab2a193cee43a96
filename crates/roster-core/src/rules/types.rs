//! Rule and rule group types

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single argument of a rule
///
/// Dates, enum options, contact ids and free text are all carried as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Bool(bool),
    Number(f64),
    String(String),
}

/// Primitive type of a rule argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Number,
    Boolean,
}

impl RuleValue {
    /// Primitive type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            RuleValue::Bool(_) => ValueType::Boolean,
            RuleValue::Number(_) => ValueType::Number,
            RuleValue::String(_) => ValueType::String,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RuleValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RuleValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RuleValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValue::Bool(b) => write!(f, "{}", b),
            RuleValue::Number(n) => write!(f, "{}", n),
            RuleValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

impl From<&str> for RuleValue {
    fn from(value: &str) -> Self {
        RuleValue::String(value.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(value: String) -> Self {
        RuleValue::String(value)
    }
}

impl From<f64> for RuleValue {
    fn from(value: f64) -> Self {
        RuleValue::Number(value)
    }
}

impl From<i64> for RuleValue {
    fn from(value: i64) -> Self {
        RuleValue::Number(value as f64)
    }
}

impl From<bool> for RuleValue {
    fn from(value: bool) -> Self {
        RuleValue::Bool(value)
    }
}

/// Boolean connective of a rule group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Condition {
    And,
    Or,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::And => f.write_str("AND"),
            Condition::Or => f.write_str("OR"),
        }
    }
}

/// A leaf condition: `field operator value...`
///
/// The operator is kept as submitted; it only becomes a typed
/// [`Operator`](super::Operator) once the rule has been validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Field name (e.g. "joined" or "callouts.<id>.responses.answers.slide.q1")
    pub field: String,
    /// Operator name (e.g. "equal", "between", "is_empty")
    pub operator: String,
    /// Operator arguments
    #[serde(default)]
    pub value: Vec<RuleValue>,
}

impl Rule {
    /// Create a new rule
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: Vec<RuleValue>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value,
        }
    }
}

/// A node of a rule tree
///
/// Serialized untagged: leaves carry `field`, groups carry `condition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleNode {
    Rule(Rule),
    Group(RuleGroup),
}

impl From<Rule> for RuleNode {
    fn from(rule: Rule) -> Self {
        RuleNode::Rule(rule)
    }
}

impl From<RuleGroup> for RuleNode {
    fn from(group: RuleGroup) -> Self {
        RuleNode::Group(group)
    }
}

/// A boolean tree of rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub condition: Condition,
    #[serde(default)]
    pub rules: Vec<RuleNode>,
}

impl RuleGroup {
    /// Create an empty group
    pub fn new(condition: Condition) -> Self {
        Self {
            condition,
            rules: Vec::new(),
        }
    }

    /// Create an AND group
    pub fn and(rules: Vec<RuleNode>) -> Self {
        Self {
            condition: Condition::And,
            rules,
        }
    }

    /// Create an OR group
    pub fn or(rules: Vec<RuleNode>) -> Self {
        Self {
            condition: Condition::Or,
            rules,
        }
    }

    /// Append a rule
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(RuleNode::Rule(rule));
        self
    }

    /// Append a nested group
    pub fn with_group(mut self, group: RuleGroup) -> Self {
        self.rules.push(RuleNode::Group(group));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All leaf rules in depth-first pre-order
    pub fn flatten(&self) -> Vec<&Rule> {
        let mut result = Vec::new();
        self.collect_rules(&mut result);
        result
    }

    fn collect_rules<'a>(&'a self, result: &mut Vec<&'a Rule>) {
        for node in &self.rules {
            match node {
                RuleNode::Rule(rule) => result.push(rule),
                RuleNode::Group(group) => group.collect_rules(result),
            }
        }
    }
}
