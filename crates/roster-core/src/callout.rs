//! Callout form driven filter schemas
//!
//! Contact rules may reference a callout by id, e.g.
//! `callouts.<uuid>.hasAnswered` or
//! `callouts.<uuid>.responses.answers.<slideId>.<key>`. These fields do not
//! exist in the static contact schema; they are derived from the callout's
//! form and merged into a per-request schema that is thrown away after use.

use crate::rules::RuleGroup;
use crate::schema::{FilterEntity, FilterField, FilterSchema};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use uuid::Uuid;

/// A callout's question form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalloutForm {
    #[serde(default)]
    pub slides: Vec<FormSlide>,
}

/// One page of a callout form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSlide {
    pub id: String,
    #[serde(default)]
    pub components: Vec<FormComponent>,
}

/// A form component, either a question or a layout container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormComponent {
    #[serde(default)]
    pub key: String,
    #[serde(rename = "type")]
    pub component_type: String,
    /// Whether the component collects an answer
    #[serde(default)]
    pub input: bool,
    /// Options of radio and selectboxes components
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<FormValue>,
    /// Options of select components
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<FormData>,
    /// Children of layout components
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<FormComponent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormValue {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormData {
    #[serde(default)]
    pub values: Vec<FormValue>,
}

impl FormComponent {
    /// Input component of the given type
    pub fn input(key: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            component_type: component_type.into(),
            input: true,
            values: Vec::new(),
            data: None,
            components: Vec::new(),
        }
    }

    /// Non-input container holding other components
    pub fn layout(component_type: impl Into<String>, components: Vec<FormComponent>) -> Self {
        Self {
            key: String::new(),
            component_type: component_type.into(),
            input: false,
            values: Vec::new(),
            data: None,
            components,
        }
    }

    /// Attach radio/selectboxes options
    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = form_values(values);
        self
    }

    /// Attach select options
    pub fn with_data_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data = Some(FormData {
            values: form_values(values),
        });
        self
    }

    /// Option values offered by this component
    fn options(&self) -> Vec<String> {
        let values = match (&self.data, self.component_type.as_str()) {
            (Some(data), "select") => &data.values,
            _ => &self.values,
        };
        values.iter().map(|v| v.value.clone()).collect()
    }

    /// Filter field answering this component
    fn filter_field(&self) -> FilterField {
        let field = match self.component_type.as_str() {
            "checkbox" => FilterField::boolean(),
            "number" | "currency" => FilterField::number(),
            "select" | "radio" => FilterField::enumeration(self.options()),
            "selectboxes" => FilterField::array().with_options(self.options()),
            "textarea" | "address" | "file" => FilterField::blob(),
            _ => FilterField::text(),
        };
        field.nullable()
    }
}

fn form_values<I, S>(values: I) -> Vec<FormValue>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values
        .into_iter()
        .map(|value| {
            let value = value.into();
            FormValue {
                label: value.clone(),
                value,
            }
        })
        .collect()
}

fn collect_inputs<'a>(components: &'a [FormComponent], result: &mut Vec<&'a FormComponent>) {
    for component in components {
        if component.input {
            result.push(component);
        } else {
            collect_inputs(&component.components, result);
        }
    }
}

/// Filters over a callout's answers, keyed `answers.<slideId>.<key>`
pub fn answer_filters(form: &CalloutForm) -> FilterSchema {
    let mut schema = FilterSchema::new();
    for slide in &form.slides {
        let mut inputs = Vec::new();
        collect_inputs(&slide.components, &mut inputs);
        for component in inputs {
            schema = schema.with_field(
                format!("answers.{}.{}", slide.id, component.key),
                component.filter_field(),
            );
        }
    }
    schema
}

/// Callout response filters extended with the answer filters of one form
pub fn callout_response_schema(form: &CalloutForm) -> FilterSchema {
    FilterEntity::CalloutResponse
        .schema()
        .extend(&answer_filters(form))
}

/// Contact filters contributed by a single callout
pub fn callout_schema_extension(id: Uuid, form: &CalloutForm) -> FilterSchema {
    let prefix = format!("callouts.{}.", id);
    FilterSchema::new()
        .with_field(format!("{}hasAnswered", prefix), FilterField::boolean())
        .with_field(format!("{}firstAnswered", prefix), FilterField::date().nullable())
        .with_field(format!("{}lastAnswered", prefix), FilterField::date().nullable())
        .extend(&callout_response_schema(form).with_prefix(&format!("{}responses.", prefix)))
}

/// Merge extensions into a copy of `base`
pub fn compose_schema<'a, I>(base: &FilterSchema, extensions: I) -> FilterSchema
where
    I: IntoIterator<Item = &'a FilterSchema>,
{
    extensions
        .into_iter()
        .fold(base.clone(), |schema, extension| schema.extend(extension))
}

/// Matches the canonical (lower-case, hyphenated) form only, the form
/// [`callout_schema_extension`] keys its fields by
fn callout_field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^callouts\.([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})\.",
        )
        .expect("callout field pattern is valid")
    })
}

/// Distinct callout ids referenced anywhere in a rule tree
pub fn callout_ids_in(group: &RuleGroup) -> BTreeSet<Uuid> {
    group
        .flatten()
        .into_iter()
        .filter_map(|rule| callout_field_pattern().captures(&rule.field))
        .filter_map(|caps| Uuid::parse_str(&caps[1]).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;
    use crate::schema::FilterType;
    use crate::validation::validate_rule_group;

    fn form() -> CalloutForm {
        CalloutForm {
            slides: vec![
                FormSlide {
                    id: "slide1".to_string(),
                    components: vec![
                        FormComponent::input("agree", "checkbox"),
                        FormComponent::input("age", "number"),
                        FormComponent::input("colour", "radio").with_values(["red", "blue"]),
                        FormComponent::layout(
                            "panel",
                            vec![
                                FormComponent::input("city", "select")
                                    .with_data_values(["Bristol", "Leeds"]),
                                FormComponent::layout(
                                    "columns",
                                    vec![FormComponent::input("story", "textarea")],
                                ),
                            ],
                        ),
                        FormComponent::layout("content", vec![]),
                    ],
                },
                FormSlide {
                    id: "slide2".to_string(),
                    components: vec![
                        FormComponent::input("topics", "selectboxes").with_values(["a", "b"]),
                        FormComponent::input("name", "textfield"),
                        FormComponent::input("upload", "file"),
                    ],
                },
            ],
        }
    }

    #[test]
    fn test_answer_filters() {
        let schema = answer_filters(&form());

        let expected = [
            ("answers.slide1.agree", FilterType::Boolean),
            ("answers.slide1.age", FilterType::Number),
            ("answers.slide1.colour", FilterType::Enum),
            ("answers.slide1.city", FilterType::Enum),
            ("answers.slide1.story", FilterType::Blob),
            ("answers.slide2.topics", FilterType::Array),
            ("answers.slide2.name", FilterType::Text),
            ("answers.slide2.upload", FilterType::Blob),
        ];
        assert_eq!(schema.len(), expected.len());
        for (name, field_type) in expected {
            let field = schema.get(name).unwrap();
            assert_eq!(field.field_type, field_type, "{}", name);
            assert!(field.nullable, "{}", name);
        }

        assert_eq!(
            schema.get("answers.slide1.city").unwrap().options,
            Some(vec!["Bristol".to_string(), "Leeds".to_string()])
        );
        assert_eq!(
            schema.get("answers.slide2.topics").unwrap().options,
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_form_deserialize() {
        let form: CalloutForm = serde_json::from_str(
            r#"{
                "slides": [{
                    "id": "s",
                    "components": [
                        { "type": "content", "input": false },
                        { "type": "fieldset", "input": false, "components": [
                            { "key": "size", "type": "select", "input": true,
                              "data": { "values": [{ "label": "Small", "value": "s" }] } }
                        ]}
                    ]
                }]
            }"#,
        )
        .unwrap();

        let schema = answer_filters(&form);
        assert_eq!(schema.len(), 1);
        assert_eq!(
            schema.get("answers.s.size").unwrap().options,
            Some(vec!["s".to_string()])
        );
    }

    #[test]
    fn test_callout_ids_in() {
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let group = RuleGroup::and(vec![
            Rule::new(format!("callouts.{}.hasAnswered", id), "equal", vec![true.into()]).into(),
            RuleGroup::or(vec![
                Rule::new(
                    format!("callouts.{}.responses.answers.slide1.agree", id),
                    "equal",
                    vec![true.into()],
                )
                .into(),
                Rule::new(format!("callouts.{}.lastAnswered", other), "is_empty", vec![]).into(),
                Rule::new("callouts.not-a-uuid.hasAnswered", "equal", vec![true.into()]).into(),
                Rule::new("firstname", "equal", vec!["Ada".into()]).into(),
            ])
            .into(),
        ]);

        let ids = callout_ids_in(&group);
        assert_eq!(ids, BTreeSet::from([id, other]));
    }

    #[test]
    fn test_upper_case_callout_ids_are_not_discovered() {
        let id = Uuid::parse_str("1b4e28ba-2fa1-11d2-883f-0016d3cca427").unwrap();
        let upper = "callouts.1B4E28BA-2FA1-11D2-883F-0016D3CCA427.hasAnswered";
        let lower = format!("callouts.{}.hasAnswered", id);

        let group = RuleGroup::and(vec![Rule::new(upper, "equal", vec![true.into()]).into()]);
        assert!(callout_ids_in(&group).is_empty());

        // Every discovered id yields schema keys matching the rule's field
        let group = RuleGroup::and(vec![Rule::new(&lower, "equal", vec![true.into()]).into()]);
        let ids = callout_ids_in(&group);
        assert_eq!(ids, BTreeSet::from([id]));

        let extensions: Vec<FilterSchema> = ids
            .iter()
            .map(|id| callout_schema_extension(*id, &form()))
            .collect();
        let composed = compose_schema(FilterEntity::Contact.schema(), &extensions);
        assert!(validate_rule_group(&composed, &group).is_ok());

        let upper_group =
            RuleGroup::and(vec![Rule::new(upper, "equal", vec![true.into()]).into()]);
        assert!(validate_rule_group(&composed, &upper_group).is_err());
    }

    #[test]
    fn test_extension_and_composition() {
        let id = Uuid::new_v4();
        let extension = callout_schema_extension(id, &form());
        let prefix = format!("callouts.{}.", id);

        assert_eq!(
            extension.get(&format!("{}hasAnswered", prefix)).unwrap().field_type,
            FilterType::Boolean
        );
        assert!(extension.get(&format!("{}firstAnswered", prefix)).unwrap().nullable);
        assert!(extension.contains(&format!("{}responses.bucket", prefix)));
        assert!(extension.contains(&format!("{}responses.answers.slide1.agree", prefix)));

        let base = FilterEntity::Contact.schema();
        let composed = compose_schema(base, [&extension]);
        assert_eq!(composed.len(), base.len() + extension.len());
        assert!(!base.contains(&format!("{}hasAnswered", prefix)));

        let group = RuleGroup::and(vec![
            Rule::new(
                format!("{}responses.answers.slide1.colour", prefix),
                "equal",
                vec!["red".into()],
            )
            .into(),
            Rule::new(format!("{}hasAnswered", prefix), "equal", vec![true.into()]).into(),
        ]);
        assert!(validate_rule_group(&composed, &group).is_ok());
        assert!(validate_rule_group(base, &group).is_err());
    }

    #[test]
    fn test_callout_response_schema() {
        let schema = callout_response_schema(&form());
        assert!(schema.contains("createdAt"));
        assert!(schema.contains("answers.slide2.name"));
        assert!(!FilterEntity::CalloutResponse.schema().contains("answers.slide2.name"));
    }
}
