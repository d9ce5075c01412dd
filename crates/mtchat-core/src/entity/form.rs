//! Dynamic creation-form fields derived from a category schema.
//!
//! Field types come only from explicit declarations: the category's
//! `field_types` table first, then a `{"type": ...}` descriptor inside
//! `base_schema`. Keys without a declaration are plain text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use strum::{Display, EnumString};

use super::model::Category;
use crate::error::{MtchatError, Result};

/// Input widget type for a dynamic attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Integer,
    Email,
    Url,
    Textarea,
    Select,
    Boolean,
}

/// One dynamic form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicField {
    pub key: String,
    pub field_type: FieldType,
    pub label: String,
    pub required: bool,
    pub placeholder: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// `price_per_night` -> `Price per night`.
pub fn label_for(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn declared_type(category: &Category, key: &str, descriptor: &Value) -> FieldType {
    let from_table = category.field_types.get(key).map(String::as_str);
    let from_schema = descriptor.get("type").and_then(Value::as_str);
    from_table
        .or(from_schema)
        .and_then(|name| name.parse().ok())
        .unwrap_or_default()
}

impl DynamicField {
    /// Builds the field list for `category`, in schema key order.
    pub fn for_category(category: &Category) -> Vec<DynamicField> {
        category
            .base_schema
            .iter()
            .map(|(key, descriptor)| {
                let required = descriptor
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let options = descriptor
                    .get("options")
                    .and_then(Value::as_array)
                    .map(|opts| {
                        opts.iter()
                            .filter_map(|o| o.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                DynamicField {
                    key: key.clone(),
                    field_type: declared_type(category, key, descriptor),
                    label: label_for(key),
                    required,
                    placeholder: format!("Enter {}", key.replace('_', " ").to_lowercase()),
                    options,
                }
            })
            .collect()
    }

    /// Converts raw input to the JSON value sent upstream.
    fn convert(&self, raw: &str) -> Result<Value> {
        match self.field_type {
            FieldType::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| MtchatError::validation(format!("{} must be a number", self.label))),
            FieldType::Integer => raw
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| MtchatError::validation(format!("{} must be a whole number", self.label))),
            FieldType::Boolean => Ok(Value::Bool(matches!(
                raw.to_ascii_lowercase().as_str(),
                "true" | "yes" | "on" | "1"
            ))),
            _ => Ok(Value::String(raw.to_string())),
        }
    }
}

/// Validates required fields and converts raw inputs to typed attributes.
///
/// Empty inputs are omitted from the result.
pub fn process_attributes(
    fields: &[DynamicField],
    inputs: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, Value>> {
    let mut processed = BTreeMap::new();
    for field in fields {
        let raw = inputs.get(&field.key).map(|v| v.trim()).unwrap_or("");
        if raw.is_empty() {
            if field.required {
                return Err(MtchatError::validation(format!(
                    "Please fill in the required field: {}",
                    field.label
                )));
            }
            continue;
        }
        processed.insert(field.key.clone(), field.convert(raw)?);
    }
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn category() -> Category {
        let mut category = Category {
            id: "c1".into(),
            name: "housing".into(),
            ..Default::default()
        };
        category.base_schema.insert("price".into(), json!({"type": "number", "required": true}));
        category.base_schema.insert("contact_email".into(), json!(""));
        category.base_schema.insert("bedrooms".into(), json!(null));
        category.field_types.insert("bedrooms".into(), "integer".into());
        category
    }

    #[test]
    fn test_types_from_explicit_mapping_only() {
        let fields = DynamicField::for_category(&category());
        let by_key: BTreeMap<_, _> = fields.iter().map(|f| (f.key.as_str(), f)).collect();
        assert_eq!(by_key["price"].field_type, FieldType::Number);
        assert!(by_key["price"].required);
        assert_eq!(by_key["bedrooms"].field_type, FieldType::Integer);
        // No declaration: key name alone does not imply email.
        assert_eq!(by_key["contact_email"].field_type, FieldType::Text);
        assert_eq!(by_key["contact_email"].label, "Contact email");
    }

    #[test]
    fn test_process_attributes_converts_and_omits_empty() {
        let fields = DynamicField::for_category(&category());
        let mut inputs = BTreeMap::new();
        inputs.insert("price".to_string(), "1200.5".to_string());
        inputs.insert("bedrooms".to_string(), "3".to_string());
        inputs.insert("contact_email".to_string(), "  ".to_string());
        let attrs = process_attributes(&fields, &inputs).unwrap();
        assert_eq!(attrs["price"], json!(1200.5));
        assert_eq!(attrs["bedrooms"], json!(3));
        assert!(!attrs.contains_key("contact_email"));
    }

    #[test]
    fn test_required_field_missing() {
        let fields = DynamicField::for_category(&category());
        let err = process_attributes(&fields, &BTreeMap::new()).unwrap_err();
        assert_eq!(
            err,
            MtchatError::validation("Please fill in the required field: Price")
        );
    }

    #[test]
    fn test_number_parse_failure() {
        let fields = DynamicField::for_category(&category());
        let mut inputs = BTreeMap::new();
        inputs.insert("price".to_string(), "cheap".to_string());
        assert!(process_attributes(&fields, &inputs).unwrap_err().is_validation());
    }
}
