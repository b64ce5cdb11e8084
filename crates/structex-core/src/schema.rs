//! Runtime output schemas built from user-supplied field names.
//!
//! A request names its fields as a comma-separated string such as
//! `"Invoice Number, Customer Name, Total Amount"`. Each name becomes one
//! optional string attribute keyed by its normalized form (`invoice_number`).
//! The schema renders itself as JSON Schema for the model's structured-output
//! call and coerces the model's reply back into an [`ExtractionRecord`].

use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Name given to every dynamic schema, visible to the model as the tool name.
pub const SCHEMA_NAME: &str = "DocumentDataSchema";

/// Description attached to every dynamic schema.
pub const SCHEMA_DESCRIPTION: &str = "Schema for extracting structured data from a document.";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("at least one field name is required")]
    NoFields,
    #[error("model output is not a JSON object")]
    NotAnObject,
    #[error("model returned a non-string value for field '{key}'")]
    InvalidValue { key: String },
}

/// Lowercase a field name and replace spaces and hyphens with underscores.
pub fn normalize_field_key(name: &str) -> String {
    name.to_lowercase().replace([' ', '-'], "_")
}

/// One requested field: its normalized key and the name the caller used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: String,
    pub label: String,
}

impl FieldSpec {
    pub fn new(label: &str) -> Self {
        Self {
            key: normalize_field_key(label),
            label: label.to_string(),
        }
    }

    /// Prompt text telling the model what to put in this attribute.
    pub fn description(&self) -> String {
        format!(
            "The extracted value for '{}'. Set to null if the information is not present in the document.",
            self.label
        )
    }

    fn json_schema(&self) -> Value {
        json!({
            "anyOf": [{ "type": "string" }, { "type": "null" }],
            "default": null,
            "description": self.description(),
            "title": title_case(&self.key),
        })
    }
}

/// An ordered set of optional string fields built for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<FieldSpec>,
}

impl FieldSchema {
    /// Build a schema from a comma-separated list of field names.
    ///
    /// Names are trimmed and empty entries skipped. When two names normalize
    /// to the same key the later name wins, keeping the key's first position.
    pub fn from_field_string(field_string: &str) -> Result<Self, SchemaError> {
        Self::from_names(field_string.split(','))
    }

    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, SchemaError> {
        let mut fields: Vec<FieldSpec> = Vec::new();

        for name in names.into_iter().map(str::trim).filter(|n| !n.is_empty()) {
            let spec = FieldSpec::new(name);
            match fields.iter().position(|f| f.key == spec.key) {
                Some(i) => {
                    tracing::warn!(
                        key = %spec.key,
                        previous = %fields[i].label,
                        replacement = %spec.label,
                        "duplicate field key, keeping the later name"
                    );
                    fields[i] = spec;
                }
                None => fields.push(spec),
            }
        }

        if fields.is_empty() {
            return Err(SchemaError::NoFields);
        }
        Ok(Self { fields })
    }

    pub fn name(&self) -> &str {
        SCHEMA_NAME
    }

    pub fn description(&self) -> &str {
        SCHEMA_DESCRIPTION
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render the schema as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.key.clone(), f.json_schema()))
            .collect();

        json!({
            "title": SCHEMA_NAME,
            "description": SCHEMA_DESCRIPTION,
            "type": "object",
            "properties": properties,
        })
    }

    /// Coerce a model reply into a record holding exactly this schema's keys.
    ///
    /// Missing keys and explicit nulls become null. Any other non-string value
    /// is rejected. Keys the schema does not name are dropped.
    pub fn coerce(&self, output: &Value) -> Result<ExtractionRecord, SchemaError> {
        let object = output.as_object().ok_or(SchemaError::NotAnObject)?;

        let mut values = Map::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = match object.get(&field.key) {
                None | Some(Value::Null) => Value::Null,
                Some(Value::String(s)) => Value::String(s.clone()),
                Some(_) => {
                    return Err(SchemaError::InvalidValue {
                        key: field.key.clone(),
                    });
                }
            };
            values.insert(field.key.clone(), value);
        }

        let dropped = object.keys().filter(|k| !values.contains_key(*k)).count();
        if dropped > 0 {
            tracing::debug!(dropped, "ignoring keys outside the requested schema");
        }

        Ok(ExtractionRecord(values))
    }
}

/// Extracted values keyed by normalized field key; serializes as a flat JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExtractionRecord(Map<String, Value>);

impl ExtractionRecord {
    /// `None` if the key is not part of the record, `Some(None)` if it is null.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.0.get(key).map(Value::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
