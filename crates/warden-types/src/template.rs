//! Policy (constraint) templates

use crate::error::ValidationError;
use crate::object::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Target name for admission review. Targets with any other name are ignored.
pub const TARGET_NAME: &str = "admission.k8s.warden.dev";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Names {
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrdSpec {
    #[serde(default)]
    pub names: Names,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crd {
    #[serde(default)]
    pub spec: CrdSpec,
}

/// Policy source for one engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub engine: String,
    #[serde(default)]
    pub source: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateTarget {
    pub target: String,
    #[serde(default)]
    pub code: Vec<CodeBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyTemplateSpec {
    #[serde(default)]
    pub crd: Crd,
    #[serde(default)]
    pub targets: Vec<TemplateTarget>,
}

/// Defines a constraint kind and the policy logic behind it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyTemplate {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PolicyTemplateSpec,
}

impl PolicyTemplate {
    /// Build a template with a single admission target carrying one code block.
    pub fn with_code(kind: impl Into<String>, engine: impl Into<String>, source: Value) -> Self {
        let kind = kind.into();
        Self {
            metadata: ObjectMeta::named(kind.to_lowercase()),
            spec: PolicyTemplateSpec {
                crd: Crd {
                    spec: CrdSpec {
                        names: Names { kind },
                    },
                },
                targets: vec![TemplateTarget {
                    target: TARGET_NAME.to_string(),
                    code: vec![CodeBlock {
                        engine: engine.into(),
                        source,
                    }],
                }],
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Constraint kind this template defines.
    pub fn kind(&self) -> &str {
        &self.spec.crd.spec.names.kind
    }

    /// Source for `engine` in the admission target, if any.
    pub fn code_for(&self, engine: &str) -> Option<&Value> {
        self.spec
            .targets
            .iter()
            .filter(|t| t.target == TARGET_NAME)
            .flat_map(|t| t.code.iter())
            .find(|c| c.engine == engine)
            .map(|c| &c.source)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name().is_empty() {
            return Err(ValidationError::Empty("metadata.name"));
        }
        if self.kind().is_empty() {
            return Err(ValidationError::Empty("spec.crd.spec.names.kind"));
        }
        if self.name() != self.kind().to_lowercase() {
            return Err(ValidationError::Invalid {
                field: "metadata.name",
                reason: format!(
                    "template name {:?} must equal the lowercase of its kind {:?}",
                    self.name(),
                    self.kind()
                ),
            });
        }
        if self.spec.targets.len() > 1 {
            return Err(ValidationError::Invalid {
                field: "spec.targets",
                reason: "at most one target is supported".to_string(),
            });
        }
        Ok(())
    }
}
