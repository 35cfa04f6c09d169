//! Violation records

use crate::constraint::Constraint;
use crate::gvk::GroupVersionKind;
use serde::{Deserialize, Serialize};

/// Which object a violation was raised against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResultSource {
    /// The object as submitted
    #[default]
    Original,
    /// An object derived by an expansion template
    Generated {
        template: String,
        gvk: GroupVersionKind,
    },
}

/// Identifies the constraint that produced a violation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintRef {
    pub kind: String,
    pub name: String,
}

impl From<&Constraint> for ConstraintRef {
    fn from(constraint: &Constraint) -> Self {
        Self {
            kind: constraint.kind().to_string(),
            name: constraint.name().to_string(),
        }
    }
}

/// One evaluation outcome.
///
/// `enforcement_action` is kept as the raw string from the constraint so that
/// unrecognized actions can be filtered out at aggregation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationResult {
    pub constraint: ConstraintRef,
    pub msg: String,
    pub enforcement_action: String,
    #[serde(default)]
    pub source: ResultSource,
}

impl ViolationResult {
    pub fn new(
        constraint: ConstraintRef,
        msg: impl Into<String>,
        enforcement_action: impl Into<String>,
    ) -> Self {
        Self {
            constraint,
            msg: msg.into(),
            enforcement_action: enforcement_action.into(),
            source: ResultSource::Original,
        }
    }

    /// Re-tag the record as raised against a derived object.
    pub fn implied_by(mut self, template: impl Into<String>, gvk: GroupVersionKind) -> Self {
        self.source = ResultSource::Generated {
            template: template.into(),
            gvk,
        };
        self
    }

    /// Message as shown to users: `[constraint] msg`, with the template
    /// named for derived objects.
    pub fn display_message(&self) -> String {
        match &self.source {
            ResultSource::Original => format!("[{}] {}", self.constraint.name, self.msg),
            ResultSource::Generated { template, .. } => format!(
                "[{}] [Implied by {}] {}",
                self.constraint.name, template, self.msg
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> ViolationResult {
        ViolationResult::new(
            ConstraintRef {
                kind: "RequiredLabels".into(),
                name: "must-have-owner".into(),
            },
            "missing label owner",
            "deny",
        )
    }

    #[test]
    fn original_message_is_prefixed_with_constraint() {
        assert_eq!(
            result().display_message(),
            "[must-have-owner] missing label owner"
        );
    }

    #[test]
    fn generated_message_names_template() {
        let r = result().implied_by("expand-deployments", GroupVersionKind::new("", "v1", "Pod"));
        assert_eq!(
            r.display_message(),
            "[must-have-owner] [Implied by expand-deployments] missing label owner"
        );
    }
}
