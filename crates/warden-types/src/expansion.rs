//! Expansion templates

use crate::gvk::GroupVersionKind;
use crate::matching::ApplyTo;
use crate::object::ObjectMeta;
use serde::{Deserialize, Serialize};

/// Identity stamped onto every resource derived by a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedGvk {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
}

impl GeneratedGvk {
    pub fn to_gvk(&self) -> GroupVersionKind {
        GroupVersionKind::new(&self.group, &self.version, &self.kind)
    }
}

impl From<GroupVersionKind> for GeneratedGvk {
    fn from(gvk: GroupVersionKind) -> Self {
        Self {
            group: gvk.group,
            version: gvk.version,
            kind: gvk.kind,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionTemplateSpec {
    /// Identities of generator resources this template applies to
    #[serde(default)]
    pub apply_to: Vec<ApplyTo>,

    /// Dotted path to the sub-document that becomes the derived resource
    #[serde(default)]
    pub template_source: String,

    /// Identity assigned to the derived resource
    #[serde(default, rename = "generatedGVK")]
    pub generated_gvk: GeneratedGvk,
}

/// Rule deriving new resources from a sub-document of a generator resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionTemplate {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ExpansionTemplateSpec,
}

impl ExpansionTemplate {
    pub fn new(name: impl Into<String>, spec: ExpansionTemplateSpec) -> Self {
        Self {
            metadata: ObjectMeta::named(name),
            spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// True if any apply-to rule accepts the identity.
    pub fn applies_to(&self, gvk: &GroupVersionKind) -> bool {
        self.spec.apply_to.iter().any(|rule| rule.matches(gvk))
    }

    /// Split the source path into field names.
    pub fn source_path(&self) -> Vec<&str> {
        self.spec.template_source.split('.').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_wire_format() {
        let template: ExpansionTemplate = serde_json::from_value(json!({
            "apiVersion": "expansion.warden.dev/v1alpha1",
            "kind": "ExpansionTemplate",
            "metadata": {"name": "expand-deployments"},
            "spec": {
                "applyTo": [{"groups": ["apps"], "kinds": ["Deployment"], "versions": ["v1"]}],
                "templateSource": "spec.template",
                "generatedGVK": {"group": "", "version": "v1", "kind": "Pod"}
            }
        }))
        .unwrap();

        assert_eq!(template.name(), "expand-deployments");
        assert_eq!(template.source_path(), vec!["spec", "template"]);
        assert_eq!(template.spec.generated_gvk.to_gvk().api_version(), "v1");
        assert!(template.applies_to(&GroupVersionKind::new("apps", "v1", "Deployment")));
    }

    #[test]
    fn any_rule_is_enough() {
        let template = ExpansionTemplate::new(
            "t",
            ExpansionTemplateSpec {
                apply_to: vec![
                    ApplyTo::new(["apps"], ["Deployment"], ["v1"]),
                    ApplyTo::new(["batch"], ["CronJob"], ["v1"]),
                ],
                ..Default::default()
            },
        );
        assert!(template.applies_to(&GroupVersionKind::new("batch", "v1", "CronJob")));
        assert!(!template.applies_to(&GroupVersionKind::new("batch", "v1", "Job")));
    }
}
