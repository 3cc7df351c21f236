//! Argument validation
//!
//! A shallow check of raw call arguments against a tool's declared
//! parameters, run by the dispatcher before any handler is invoked.

use crate::schema::{ParamKind, ParamSpec};
use serde_json::{Map, Value};
use thiserror::Error;

/// Argument validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required parameter was not supplied.
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    /// A parameter had the wrong JSON kind.
    #[error("Invalid argument '{name}': expected {expected}, got {found}")]
    WrongType {
        /// Parameter name.
        name: String,
        /// Declared kind.
        expected: ParamKind,
        /// Kind of the supplied value.
        found: &'static str,
    },

    /// The arguments were not a JSON object.
    #[error("Arguments must be an object, got {0}")]
    Malformed(&'static str),
}

/// Arguments that passed validation, with defaults filled in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedArgs {
    values: Map<String, Value>,
}

impl ValidatedArgs {
    /// Look up a raw value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// A string argument that must be present.
    pub fn str(&self, name: &str) -> Result<&str, ValidationError> {
        self.opt_raw_str(name)?
            .ok_or_else(|| ValidationError::MissingArgument(name.to_string()))
    }

    /// An optional string argument. Empty strings count as absent.
    pub fn opt_str(&self, name: &str) -> Result<Option<&str>, ValidationError> {
        Ok(self.opt_raw_str(name)?.filter(|value| !value.is_empty()))
    }

    /// An integer argument that must be present (or defaulted).
    pub fn int(&self, name: &str) -> Result<i64, ValidationError> {
        match self.values.get(name) {
            None => Err(ValidationError::MissingArgument(name.to_string())),
            Some(value) => value.as_i64().ok_or_else(|| ValidationError::WrongType {
                name: name.to_string(),
                expected: ParamKind::Integer,
                found: kind_name(value),
            }),
        }
    }

    /// A boolean argument that must be present (or defaulted).
    pub fn bool(&self, name: &str) -> Result<bool, ValidationError> {
        match self.values.get(name) {
            None => Err(ValidationError::MissingArgument(name.to_string())),
            Some(value) => value.as_bool().ok_or_else(|| ValidationError::WrongType {
                name: name.to_string(),
                expected: ParamKind::Boolean,
                found: kind_name(value),
            }),
        }
    }

    fn opt_raw_str(&self, name: &str) -> Result<Option<&str>, ValidationError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.as_str())),
            Some(other) => Err(ValidationError::WrongType {
                name: name.to_string(),
                expected: ParamKind::String,
                found: kind_name(other),
            }),
        }
    }
}

/// Validate raw arguments against declared parameters.
///
/// - absent (or `null`) and required: `MissingArgument`
/// - absent and optional: the declared default, if any
/// - present: kept as-is once its JSON kind matches the declaration
///
/// Undeclared arguments pass through untouched.
pub fn validate(params: &[ParamSpec], raw: Value) -> Result<ValidatedArgs, ValidationError> {
    let mut values = match raw {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        other => return Err(ValidationError::Malformed(kind_name(&other))),
    };

    values.retain(|_, value| !value.is_null());

    for param in params {
        match values.get(&param.name) {
            Some(value) if !param.kind.accepts(value) => {
                return Err(ValidationError::WrongType {
                    name: param.name.clone(),
                    expected: param.kind,
                    found: kind_name(value),
                });
            }
            Some(_) => {}
            None if param.required => {
                return Err(ValidationError::MissingArgument(param.name.clone()));
            }
            None => {
                if let Some(ref default) = param.default {
                    values.insert(param.name.clone(), default.clone());
                }
            }
        }
    }

    Ok(ValidatedArgs { values })
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() => "integer",
        Value::Number(n) if n.is_u64() => "out-of-range integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
