//! Namespace objects resolved for review context

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// A namespace as seen by policy evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    #[serde(default = "namespace_api_version", rename = "apiVersion")]
    pub api_version: String,
    #[serde(default = "namespace_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: NamespaceMeta,
}

fn namespace_api_version() -> String {
    "v1".to_string()
}

fn namespace_kind() -> String {
    "Namespace".to_string()
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            api_version: namespace_api_version(),
            kind: namespace_kind(),
            metadata: NamespaceMeta {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}
