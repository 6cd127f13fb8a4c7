//! Field descriptors and value coercion

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};

/// Resolved type of a source field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    /// RFC 3339 timestamp
    Timestamp,
    /// Calendar date (YYYY-MM-DD)
    Date,
    /// Nested structure, passed through untouched
    Json,
}

impl FieldType {
    /// Coerce a raw value into this type.
    ///
    /// Sources that return everything as strings (report APIs, CSV-ish
    /// payloads) get real numbers and booleans out; values that cannot be
    /// coerced are passed through unchanged rather than dropped.
    pub fn coerce(self, value: JsonValue) -> JsonValue {
        if value.is_null() {
            return value;
        }
        match self {
            FieldType::Integer => match &value {
                JsonValue::String(s) => s
                    .parse::<i64>()
                    .map(JsonValue::from)
                    .unwrap_or(value),
                _ => value,
            },
            FieldType::Float => match &value {
                JsonValue::String(s) => s
                    .parse::<f64>()
                    .map(JsonValue::from)
                    .unwrap_or(value),
                _ => value,
            },
            FieldType::Boolean => match &value {
                JsonValue::String(s) => match s.as_str() {
                    "true" | "True" => JsonValue::Bool(true),
                    "false" | "False" => JsonValue::Bool(false),
                    _ => value,
                },
                _ => value,
            },
            FieldType::String => match value {
                JsonValue::Number(n) => JsonValue::String(n.to_string()),
                JsonValue::Bool(b) => JsonValue::String(b.to_string()),
                other => other,
            },
            FieldType::Timestamp | FieldType::Date | FieldType::Json => value,
        }
    }
}

/// One typed field of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name
    pub name: String,
    /// Resolved type
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    /// Whether the field may be null
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl FieldDescriptor {
    /// Create a nullable descriptor
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }

    /// Mark the field as non-nullable
    #[must_use]
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Typed field metadata for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name
    pub table: String,
    /// Field descriptors as the source declared them
    pub fields: Vec<FieldDescriptor>,
}

impl TableSchema {
    /// Create a schema
    pub fn new(table: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            table: table.into(),
            fields,
        }
    }

    /// Look up a field descriptor by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate that every requested field exists in the remote schema.
    ///
    /// Fails fast before any data request is issued.
    pub fn validate<'a, I>(&self, requested: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in requested {
            if self.field(name).is_none() {
                return Err(Error::schema(
                    &self.table,
                    format!("field '{name}' is absent in the remote schema"),
                ));
            }
        }
        Ok(())
    }

    /// Type a raw record's values according to the descriptors.
    ///
    /// Fields the schema does not know about are passed through untouched.
    pub fn coerce(&self, record: JsonValue) -> JsonValue {
        let JsonValue::Object(map) = record else {
            return record;
        };

        let mut typed = JsonObject::with_capacity(map.len());
        for (key, value) in map {
            let value = match self.field(&key) {
                Some(descriptor) => descriptor.field_type.coerce(value),
                None => value,
            };
            typed.insert(key, value);
        }
        JsonValue::Object(typed)
    }
}
