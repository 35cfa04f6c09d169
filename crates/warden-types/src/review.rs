//! Review objects handed to policy drivers

use crate::admission::Operation;
use crate::gvk::GroupVersionKind;
use crate::namespace::Namespace;
use crate::object::Unstructured;
use serde::{Deserialize, Serialize};

/// Provenance of the object under review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SourceType {
    /// As submitted in the admission request
    #[default]
    Original,
    /// Derived by generator expansion
    Generated,
}

/// An object plus the context needed to evaluate it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewObject {
    pub object: Unstructured,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_object: Option<Unstructured>,
    /// Identity as declared by the request (or the template, when derived)
    pub kind: GroupVersionKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_object: Option<Namespace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub source: SourceType,
}

impl ReviewObject {
    /// Review a derived object in the namespace context of its generator.
    /// A namespace set on the derived object itself takes precedence, and
    /// `namespace_object` is kept only when it names the namespace the
    /// derived object ends up in.
    pub fn generated(
        object: Unstructured,
        namespace: &str,
        namespace_object: Option<Namespace>,
        username: impl Into<String>,
    ) -> Self {
        let kind = object.gvk();
        let name = object.name().to_string();
        let namespace = match object.namespace() {
            "" => namespace.to_string(),
            own => own.to_string(),
        };
        let namespace_object = namespace_object.filter(|ns| ns.name() == namespace);
        Self {
            object,
            old_object: None,
            kind,
            name,
            namespace,
            namespace_object,
            operation: None,
            username: username.into(),
            source: SourceType::Generated,
        }
    }

    /// Namespace used for constraint matching. A core `Namespace` object is
    /// matched by its own name.
    pub fn match_namespace(&self) -> &str {
        if self.kind.group.is_empty() && self.kind.kind == "Namespace" {
            self.object.name()
        } else {
            &self.namespace
        }
    }
}
