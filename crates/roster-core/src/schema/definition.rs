//! Schema definitions for rule validation

use crate::rules::ValueType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Semantic type of a filterable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Text,
    Number,
    Boolean,
    Date,
    Enum,
    Array,
    Contact,
    Blob,
}

impl FilterType {
    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            FilterType::Text => "text",
            FilterType::Number => "number",
            FilterType::Boolean => "boolean",
            FilterType::Date => "date",
            FilterType::Enum => "enum",
            FilterType::Array => "array",
            FilterType::Contact => "contact",
            FilterType::Blob => "blob",
        }
    }

    /// Primitive type rule arguments must have for this field type
    pub fn value_type(&self) -> ValueType {
        match self {
            FilterType::Boolean => ValueType::Boolean,
            FilterType::Number => ValueType::Number,
            _ => ValueType::String,
        }
    }

    /// Whether the type can hold an empty value without being nullable
    pub fn tolerates_empty(&self) -> bool {
        matches!(self, FilterType::Text | FilterType::Array)
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A field in a filter schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterField {
    /// Field type
    #[serde(rename = "type")]
    pub field_type: FilterType,

    /// Whether the field may be absent
    #[serde(default)]
    pub nullable: bool,

    /// Closed list of allowed values (enum, array)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl FilterField {
    /// Create a new non-nullable field
    pub fn new(field_type: FilterType) -> Self {
        Self {
            field_type,
            nullable: false,
            options: None,
        }
    }

    pub fn text() -> Self {
        Self::new(FilterType::Text)
    }

    pub fn number() -> Self {
        Self::new(FilterType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FilterType::Boolean)
    }

    pub fn date() -> Self {
        Self::new(FilterType::Date)
    }

    pub fn contact() -> Self {
        Self::new(FilterType::Contact)
    }

    pub fn blob() -> Self {
        Self::new(FilterType::Blob)
    }

    /// Array of free-form string tags
    pub fn array() -> Self {
        Self::new(FilterType::Array)
    }

    /// Enum restricted to the given options
    pub fn enumeration<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(FilterType::Enum).with_options(options)
    }

    /// Mark field as nullable
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Restrict values to a closed list
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }
}

/// Mapping of field name to field definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSchema {
    fields: BTreeMap<String, FilterField>,
}

impl FilterSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field
    pub fn with_field(mut self, name: impl Into<String>, field: FilterField) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Get a field by name
    pub fn get(&self, name: &str) -> Option<&FilterField> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterate over fields in name order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FilterField)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// New schema holding this schema's fields plus `other`'s
    ///
    /// Fields of `other` win on name clashes.
    pub fn extend(&self, other: &FilterSchema) -> FilterSchema {
        let mut fields = self.fields.clone();
        fields.extend(
            other
                .fields
                .iter()
                .map(|(name, field)| (name.clone(), field.clone())),
        );
        FilterSchema { fields }
    }

    /// New schema with every field name prefixed
    pub fn with_prefix(&self, prefix: &str) -> FilterSchema {
        FilterSchema {
            fields: self
                .fields
                .iter()
                .map(|(name, field)| (format!("{}{}", prefix, name), field.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership_schema() -> FilterSchema {
        FilterSchema::new()
            .with_field("name", FilterField::text())
            .with_field("count", FilterField::number())
            .with_field("starts", FilterField::date().nullable())
            .with_field(
                "period",
                FilterField::enumeration(["monthly", "annually"]),
            )
    }

    #[test]
    fn test_schema_creation() {
        let schema = membership_schema();

        assert_eq!(schema.len(), 4);
        assert!(schema.contains("name"));
        assert!(!schema.contains("missing"));
        assert!(schema.get("starts").unwrap().nullable);
        assert!(!schema.get("count").unwrap().nullable);
        assert_eq!(
            schema.get("period").unwrap().options,
            Some(vec!["monthly".to_string(), "annually".to_string()])
        );
    }

    #[test]
    fn test_extend_does_not_mutate_base() {
        let base = membership_schema();
        let extra = FilterSchema::new().with_field("count", FilterField::text());

        let extended = base.extend(&extra);
        assert_eq!(extended.get("count").unwrap().field_type, FilterType::Text);
        assert_eq!(base.get("count").unwrap().field_type, FilterType::Number);
        assert_eq!(extended.len(), base.len());
    }

    #[test]
    fn test_with_prefix() {
        let prefixed = membership_schema().with_prefix("callouts.x.");
        assert!(prefixed.contains("callouts.x.name"));
        assert!(!prefixed.contains("name"));
        assert_eq!(prefixed.len(), 4);
    }

    #[test]
    fn test_value_types() {
        assert_eq!(FilterType::Boolean.value_type(), ValueType::Boolean);
        assert_eq!(FilterType::Number.value_type(), ValueType::Number);
        for ty in [
            FilterType::Text,
            FilterType::Date,
            FilterType::Enum,
            FilterType::Array,
            FilterType::Contact,
            FilterType::Blob,
        ] {
            assert_eq!(ty.value_type(), ValueType::String);
        }
    }

    #[test]
    fn test_schema_serde() {
        let schema = membership_schema();
        let json = serde_json::to_value(&schema).unwrap();

        assert_eq!(json["starts"]["type"], "date");
        assert_eq!(json["starts"]["nullable"], true);
        assert!(json["name"].get("options").is_none());

        let deserialized: FilterSchema = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized, schema);
    }
}
