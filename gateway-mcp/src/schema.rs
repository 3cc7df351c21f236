//! Tool input schemas
//!
//! Parameters are declared as plain data on each [`ToolDefinition`] and
//! rendered to JSON Schema for `tools/list`. The same declarations drive
//! argument validation in [`crate::validation`].
//!
//! [`ToolDefinition`]: crate::types::ToolDefinition

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// JSON kind a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// JSON string.
    String,
    /// JSON integer.
    Integer,
    /// JSON boolean.
    Boolean,
}

impl ParamKind {
    /// JSON Schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
        }
    }

    /// Whether a JSON value has this kind.
    ///
    /// Integers must fit in an `i64`.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_i64(),
            ParamKind::Boolean => value.is_boolean(),
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared tool parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: String,
    /// Accepted JSON kind.
    pub kind: ParamKind,
    /// Human-readable description.
    pub description: String,
    /// Whether the caller must supply it.
    pub required: bool,
    /// Value substituted when an optional parameter is absent.
    pub default: Option<Value>,
}

impl ParamSpec {
    fn new(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
            default: None,
        }
    }

    /// Declare a string parameter.
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    /// Declare an integer parameter.
    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Integer, description)
    }

    /// Declare a boolean parameter.
    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Boolean, description)
    }

    /// Mark the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default for an optional parameter.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    fn to_schema(&self) -> Value {
        let mut property = Map::new();
        property.insert("type".to_string(), json!(self.kind.as_str()));
        property.insert("description".to_string(), json!(self.description));
        if let Some(ref default) = self.default {
            property.insert("default".to_string(), default.clone());
        }
        Value::Object(property)
    }
}

/// Render parameters as a JSON Schema object.
pub fn input_schema(params: &[ParamSpec]) -> Value {
    let properties: Map<String, Value> = params
        .iter()
        .map(|param| (param.name.clone(), param.to_schema()))
        .collect();
    let required: Vec<&str> = params
        .iter()
        .filter(|param| param.required)
        .map(|param| param.name.as_str())
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

#[allow(clippy::ptr_arg)]
pub(crate) fn serialize_input_schema<S>(params: &Vec<ParamSpec>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    input_schema(params).serialize(serializer)
}
