//! Rule validation against filter schemas

use super::validated::{ValidatedRule, ValidatedRuleGroup, ValidatedRuleNode};
use crate::date::is_valid_date;
use crate::error::{FilterError, InvalidRuleReason, Result};
use crate::rules::{Operator, Rule, RuleGroup, RuleNode, RuleValue};
use crate::schema::{FilterSchema, FilterType};

/// Validator for rules against a filter schema
#[derive(Debug, Clone, Default)]
pub struct RuleValidator {
    /// Maximum group nesting accepted (None = unbounded)
    max_depth: Option<usize>,
}

impl RuleValidator {
    /// Create a new validator with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject groups nested deeper than `max_depth` levels
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Validate a single rule
    pub fn validate_rule(&self, schema: &FilterSchema, rule: &Rule) -> Result<ValidatedRule> {
        let invalid = |reason: InvalidRuleReason| FilterError::InvalidRule {
            rule: rule.clone(),
            reason,
        };

        let filter = schema.get(&rule.field).ok_or_else(|| {
            invalid(InvalidRuleReason::UnknownField {
                field: rule.field.clone(),
            })
        })?;

        let operator = match Operator::parse(&rule.operator) {
            Some(op) if op.is_nullable() => {
                if !filter.nullable && !filter.field_type.tolerates_empty() {
                    return Err(invalid(InvalidRuleReason::NotNullable {
                        field: rule.field.clone(),
                        operator: rule.operator.clone(),
                    }));
                }
                op
            }
            Some(op) if op.allowed_for(filter.field_type) => op,
            _ => {
                return Err(invalid(InvalidRuleReason::OperatorNotAllowed {
                    field: rule.field.clone(),
                    operator: rule.operator.clone(),
                    field_type: filter.field_type,
                }))
            }
        };

        if rule.value.len() != operator.arity() {
            return Err(invalid(InvalidRuleReason::ArgumentCount {
                operator: rule.operator.clone(),
                expected: operator.arity(),
                actual: rule.value.len(),
            }));
        }

        let expected = filter.field_type.value_type();
        if let Some(mismatch) = rule.value.iter().find(|v| v.value_type() != expected) {
            return Err(invalid(InvalidRuleReason::ArgumentType {
                field: rule.field.clone(),
                expected,
                actual: mismatch.value_type(),
            }));
        }

        if filter.field_type == FilterType::Date {
            if let Some(bad) = string_values(&rule.value).find(|v| !is_valid_date(v)) {
                return Err(invalid(InvalidRuleReason::InvalidDate {
                    field: rule.field.clone(),
                    value: bad.to_string(),
                }));
            }
        }

        if matches!(filter.field_type, FilterType::Enum | FilterType::Array) {
            if let Some(options) = &filter.options {
                if let Some(bad) = string_values(&rule.value).find(|v| !options.iter().any(|o| o == v)) {
                    return Err(invalid(InvalidRuleReason::InvalidOption {
                        field: rule.field.clone(),
                        value: bad.to_string(),
                        options: options.clone(),
                    }));
                }
            }
        }

        Ok(ValidatedRule::new(
            rule.field.clone(),
            operator,
            rule.value.clone(),
            filter.field_type,
            filter.nullable,
        ))
    }

    /// Validate a rule group recursively, failing on the first invalid rule
    pub fn validate_rule_group(
        &self,
        schema: &FilterSchema,
        group: &RuleGroup,
    ) -> Result<ValidatedRuleGroup> {
        self.validate_group_at(schema, group, 1)
    }

    fn validate_group_at(
        &self,
        schema: &FilterSchema,
        group: &RuleGroup,
        depth: usize,
    ) -> Result<ValidatedRuleGroup> {
        if let Some(max_depth) = self.max_depth {
            if depth > max_depth {
                return Err(FilterError::TooDeep { max_depth });
            }
        }

        let rules = group
            .rules
            .iter()
            .map(|node| match node {
                RuleNode::Rule(rule) => self.validate_rule(schema, rule).map(ValidatedRuleNode::Rule),
                RuleNode::Group(nested) => self
                    .validate_group_at(schema, nested, depth + 1)
                    .map(ValidatedRuleNode::Group),
            })
            .collect::<Result<Vec<_>>>()?;

        log::trace!(
            "Validated {} group with {} rule(s) at depth {}",
            group.condition,
            rules.len(),
            depth
        );

        Ok(ValidatedRuleGroup::new(group.condition, rules))
    }
}

fn string_values(values: &[RuleValue]) -> impl Iterator<Item = &str> {
    values.iter().filter_map(RuleValue::as_str)
}

/// Validate a single rule with default settings
pub fn validate_rule(schema: &FilterSchema, rule: &Rule) -> Result<ValidatedRule> {
    RuleValidator::new().validate_rule(schema, rule)
}

/// Validate a rule group with default settings
pub fn validate_rule_group(schema: &FilterSchema, group: &RuleGroup) -> Result<ValidatedRuleGroup> {
    RuleValidator::new().validate_rule_group(schema, group)
}

/// Validate a rule group, rejecting nesting deeper than `max_depth`
pub fn validate_rule_group_with_depth(
    schema: &FilterSchema,
    group: &RuleGroup,
    max_depth: usize,
) -> Result<ValidatedRuleGroup> {
    RuleValidator::new()
        .with_max_depth(max_depth)
        .validate_rule_group(schema, group)
}
