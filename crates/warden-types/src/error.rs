//! Error types for document access and resource validation

use thiserror::Error;

/// Errors raised while reading or decoding unstructured documents
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObjectError {
    /// The payload was not valid JSON
    #[error("invalid document: {0}")]
    Decode(String),

    /// The payload decoded, but not to a JSON object
    #[error("document is not an object")]
    NotAnObject,

    /// A field exists but holds the wrong type
    #[error("field {path} is {found}, expected {expected}")]
    FieldType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors raised when a resource fails structural validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required identifying field is empty
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// A field has an unacceptable value
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// Reading the document failed
    #[error(transparent)]
    Object(#[from] ObjectError),
}

/// Human-readable JSON type name, used in field errors.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
