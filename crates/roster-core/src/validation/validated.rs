//! Validated rule types

use crate::rules::{Condition, Operator, RuleValue};
use crate::schema::FilterType;
use serde::Serialize;

/// A rule that passed validation, annotated with its field definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRule {
    field: String,
    operator: Operator,
    value: Vec<RuleValue>,
    #[serde(rename = "type")]
    field_type: FilterType,
    nullable: bool,
}

impl ValidatedRule {
    pub(crate) fn new(
        field: String,
        operator: Operator,
        value: Vec<RuleValue>,
        field_type: FilterType,
        nullable: bool,
    ) -> Self {
        Self {
            field,
            operator,
            value,
            field_type,
            nullable,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &[RuleValue] {
        &self.value
    }

    pub fn field_type(&self) -> FilterType {
        self.field_type
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }
}

/// A node of a validated rule tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ValidatedRuleNode {
    Rule(ValidatedRule),
    Group(ValidatedRuleGroup),
}

/// A rule group whose every leaf passed validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRuleGroup {
    condition: Condition,
    rules: Vec<ValidatedRuleNode>,
}

impl ValidatedRuleGroup {
    pub(crate) fn new(condition: Condition, rules: Vec<ValidatedRuleNode>) -> Self {
        Self { condition, rules }
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn rules(&self) -> &[ValidatedRuleNode] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All leaf rules in depth-first pre-order
    pub fn flatten(&self) -> Vec<&ValidatedRule> {
        let mut result = Vec::new();
        self.collect_rules(&mut result);
        result
    }

    fn collect_rules<'a>(&'a self, result: &mut Vec<&'a ValidatedRule>) {
        for node in &self.rules {
            match node {
                ValidatedRuleNode::Rule(rule) => result.push(rule),
                ValidatedRuleNode::Group(group) => group.collect_rules(result),
            }
        }
    }
}
