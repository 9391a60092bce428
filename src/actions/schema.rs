//! Argument schemas for actions
//!
//! A schema is advisory to the model (sent as a JSON schema with the tool
//! definition) and authoritative to the executor, which validates every
//! request against it before running the action.

use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Number,
}

impl PropertyType {
    fn as_str(self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Number => "number",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            PropertyType::String => value.is_string(),
            PropertyType::Number => value.is_number(),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    pub kind: PropertyType,
    pub description: String,
    /// Closed set of accepted values, strings only
    pub allowed: Option<Vec<String>>,
}

impl PropertySpec {
    pub fn string(description: impl Into<String>) -> Self {
        Self {
            kind: PropertyType::String,
            description: description.into(),
            allowed: None,
        }
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self {
            kind: PropertyType::Number,
            description: description.into(),
            allowed: None,
        }
    }

    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut schema = json!({
            "type": self.kind.as_str(),
            "description": self.description,
        });
        if let Some(allowed) = &self.allowed {
            schema["enum"] = json!(allowed);
        }
        schema
    }
}

/// A request's arguments did not match the declared schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("missing required argument '{field}'")]
    MissingField { field: String },
    #[error("argument '{field}' must be a {expected}")]
    WrongType {
        field: String,
        expected: PropertyType,
    },
    #[error("argument '{field}' must be one of {} (got '{value}')", .allowed.join(", "))]
    NotAllowed {
        field: String,
        value: String,
        allowed: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema {
    pub required: BTreeSet<String>,
    pub properties: BTreeMap<String, PropertySpec>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str, spec: PropertySpec) -> Self {
        self.required.insert(name.to_string());
        self.properties.insert(name.to_string(), spec);
        self
    }

    pub fn optional(mut self, name: &str, spec: PropertySpec) -> Self {
        self.properties.insert(name.to_string(), spec);
        self
    }

    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, spec)| (name.clone(), spec.to_json_schema()))
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }

    /// Check arguments against the schema. Unknown keys are ignored.
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<(), SchemaViolation> {
        for field in &self.required {
            if arguments.get(field).map_or(true, Value::is_null) {
                return Err(SchemaViolation::MissingField {
                    field: field.clone(),
                });
            }
        }

        for (field, spec) in &self.properties {
            let Some(value) = arguments.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            if !spec.kind.matches(value) {
                return Err(SchemaViolation::WrongType {
                    field: field.clone(),
                    expected: spec.kind,
                });
            }
            if let (Some(allowed), Some(s)) = (&spec.allowed, value.as_str()) {
                if !allowed.iter().any(|a| a == s) {
                    return Err(SchemaViolation::NotAllowed {
                        field: field.clone(),
                        value: s.to_string(),
                        allowed: allowed.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// A callable application action as advertised to the model
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ActionDescriptor {
    pub fn to_tool_definition(&self) -> crate::llm::ToolDefinition {
        crate::llm::ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.parameters.to_json_schema(),
        }
    }
}
