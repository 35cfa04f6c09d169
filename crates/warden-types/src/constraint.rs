//! Constraints

use crate::enforcement::EnforcementAction;
use crate::error::{ObjectError, ValidationError};
use crate::gvk::GroupVersionKind;
use crate::matching::{namespace_matches, set_accepts};
use crate::object::Unstructured;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Selects resources by API group and kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindSelector {
    #[serde(default)]
    pub api_groups: Vec<String>,
    #[serde(default)]
    pub kinds: Vec<String>,
}

impl KindSelector {
    pub fn matches(&self, gvk: &GroupVersionKind) -> bool {
        set_accepts(&self.api_groups, &gvk.group) && set_accepts(&self.kinds, &gvk.kind)
    }
}

/// The `spec.match` block of a constraint.
///
/// Namespace filters apply to namespaced resources only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintMatch {
    #[serde(default)]
    pub kinds: Vec<KindSelector>,
    #[serde(default)]
    pub namespaces: Vec<String>,
    #[serde(default)]
    pub excluded_namespaces: Vec<String>,
}

impl ConstraintMatch {
    pub fn matches(&self, gvk: &GroupVersionKind, namespace: &str) -> bool {
        if !self.kinds.is_empty() && !self.kinds.iter().any(|k| k.matches(gvk)) {
            return false;
        }
        if namespace.is_empty() {
            return true;
        }
        if !self.namespaces.is_empty()
            && !self.namespaces.iter().any(|p| namespace_matches(p, namespace))
        {
            return false;
        }
        !self
            .excluded_namespaces
            .iter()
            .any(|p| namespace_matches(p, namespace))
    }
}

/// A constraint instance: an unstructured document whose kind names the
/// policy template it binds to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Constraint {
    object: Unstructured,
}

impl Constraint {
    pub fn new(object: Unstructured) -> Self {
        Self { object }
    }

    pub fn from_value(value: Value) -> Result<Self, ObjectError> {
        Ok(Self::new(Unstructured::from_value(value)?))
    }

    pub fn object(&self) -> &Unstructured {
        &self.object
    }

    pub fn kind(&self) -> &str {
        self.object.kind()
    }

    /// Lower-cased kind, the key drivers register rule sets under.
    pub fn kind_key(&self) -> String {
        self.kind().to_lowercase()
    }

    pub fn name(&self) -> &str {
        self.object.name()
    }

    /// The raw `spec.enforcementAction`, if set.
    pub fn raw_enforcement_action(&self) -> Result<Option<&str>, ObjectError> {
        self.object.nested_string(&["spec", "enforcementAction"])
    }

    /// The enforcement action to stamp on results, defaulting to `deny`.
    pub fn enforcement_action(&self) -> Result<String, ObjectError> {
        Ok(match self.raw_enforcement_action()? {
            Some(action) if !action.is_empty() => action.to_string(),
            _ => EnforcementAction::Deny.as_str().to_string(),
        })
    }

    /// `spec.parameters`, or `null` when absent.
    pub fn parameters(&self) -> Value {
        self.object
            .nested_field(&["spec", "parameters"])
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn match_criteria(&self) -> Result<ConstraintMatch, ValidationError> {
        match self.object.nested_field(&["spec", "match"]) {
            None | Some(Value::Null) => Ok(ConstraintMatch::default()),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|e| ValidationError::Invalid {
                    field: "spec.match",
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Structural validation shared by every driver.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.kind().is_empty() {
            return Err(ValidationError::Empty("kind"));
        }
        if self.name().is_empty() {
            return Err(ValidationError::Empty("metadata.name"));
        }
        self.raw_enforcement_action()?;
        self.match_criteria()?;
        Ok(())
    }
}
