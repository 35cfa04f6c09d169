//! Unstructured resource documents

use crate::error::{json_type_name, ObjectError};
use crate::gvk::GroupVersionKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Minimal object metadata carried by warden's own resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ObjectMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }
}

/// A resource held as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unstructured {
    object: Map<String, Value>,
}

impl Unstructured {
    pub fn new(object: Map<String, Value>) -> Self {
        Self { object }
    }

    /// Decode a serialized payload. The top level must be an object.
    pub fn from_slice(raw: &[u8]) -> Result<Self, ObjectError> {
        let value: Value =
            serde_json::from_slice(raw).map_err(|e| ObjectError::Decode(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ObjectError> {
        match value {
            Value::Object(object) => Ok(Self { object }),
            _ => Err(ObjectError::NotAnObject),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.object
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.object)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.object.clone())
    }

    pub fn kind(&self) -> &str {
        self.object.get("kind").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn api_version(&self) -> &str {
        self.object
            .get("apiVersion")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::from_api_version(self.api_version(), self.kind())
    }

    pub fn set_gvk(&mut self, gvk: &GroupVersionKind) {
        self.object
            .insert("apiVersion".into(), Value::String(gvk.api_version()));
        self.object.insert("kind".into(), Value::String(gvk.kind.clone()));
    }

    pub fn name(&self) -> &str {
        self.nested_str(&["metadata", "name"]).unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.nested_str(&["metadata", "namespace"]).unwrap_or_default()
    }

    /// Set `metadata.namespace`; an empty namespace removes the field.
    pub fn set_namespace(&mut self, namespace: &str) {
        let metadata = self
            .object
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if !metadata.is_object() {
            *metadata = Value::Object(Map::new());
        }
        if let Value::Object(metadata) = metadata {
            if namespace.is_empty() {
                metadata.remove("namespace");
            } else {
                metadata.insert("namespace".into(), Value::String(namespace.to_string()));
            }
        }
    }

    /// Look up a nested field by path. Returns `None` when any segment is
    /// missing or an intermediate value is not an object.
    pub fn nested_field(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.object.get(*first)?;
        for segment in rest {
            current = current.as_object()?.get(*segment)?;
        }
        Some(current)
    }

    fn nested_str(&self, path: &[&str]) -> Option<&str> {
        self.nested_field(path).and_then(Value::as_str)
    }

    /// Look up a nested string. A present, non-string value is an error.
    pub fn nested_string(&self, path: &[&str]) -> Result<Option<&str>, ObjectError> {
        match self.nested_field(path) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ObjectError::FieldType {
                path: path.join("."),
                expected: "string",
                found: json_type_name(other),
            }),
        }
    }

    /// Look up a nested object and return a copy of it. A present,
    /// non-object value is an error.
    pub fn nested_map(&self, path: &[&str]) -> Result<Option<Map<String, Value>>, ObjectError> {
        match self.nested_field(path) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(other) => Err(ObjectError::FieldType {
                path: path.join("."),
                expected: "object",
                found: json_type_name(other),
            }),
        }
    }
}

impl From<Map<String, Value>> for Unstructured {
    fn from(object: Map<String, Value>) -> Self {
        Self::new(object)
    }
}

impl TryFrom<Value> for Unstructured {
    type Error = ObjectError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}
