//! Expansion template store and generator expander

use crate::error::{ExpansionError, PartialExpansion};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};
use warden_types::{ExpansionTemplate, GroupVersionKind, Unstructured};

/// A resource derived from a generator, tagged with the template that
/// produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resultant {
    pub object: Unstructured,
    pub template_name: String,
}

/// Thread-safe store of expansion templates keyed by name.
///
/// Readers (template lookup, expansion) may run concurrently with each
/// other; upserts and removals take the write lock.
pub struct ExpansionSystem {
    templates: RwLock<HashMap<String, Arc<ExpansionTemplate>>>,
}

impl ExpansionSystem {
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace a template. The store keeps its own copy.
    pub fn upsert_template(&self, template: &ExpansionTemplate) -> Result<(), ExpansionError> {
        if template.name().is_empty() {
            return Err(ExpansionError::InvalidKey { operation: "upsert" });
        }
        self.templates
            .write()
            .insert(template.name().to_string(), Arc::new(template.clone()));
        debug!(template = %template.name(), "Upserted expansion template");
        Ok(())
    }

    /// Remove a template by its name. Removing an unknown name is a no-op.
    pub fn remove_template(&self, template: &ExpansionTemplate) -> Result<(), ExpansionError> {
        self.remove_template_by_name(template.name())
    }

    pub fn remove_template_by_name(&self, name: &str) -> Result<(), ExpansionError> {
        if name.is_empty() {
            return Err(ExpansionError::InvalidKey { operation: "remove" });
        }
        if self.templates.write().remove(name).is_some() {
            debug!(template = %name, "Removed expansion template");
        }
        Ok(())
    }

    pub fn template(&self, name: &str) -> Option<Arc<ExpansionTemplate>> {
        self.templates.read().get(name).cloned()
    }

    /// All stored templates, ordered by name.
    pub fn templates(&self) -> Vec<Arc<ExpansionTemplate>> {
        let mut all: Vec<_> = self.templates.read().values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    pub fn len(&self) -> usize {
        self.templates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.read().is_empty()
    }

    /// Templates with at least one apply-to rule accepting `gvk`. Each
    /// template appears once; order is unspecified.
    pub fn templates_for_gvk(&self, gvk: &GroupVersionKind) -> Vec<Arc<ExpansionTemplate>> {
        self.templates
            .read()
            .values()
            .filter(|t| t.applies_to(gvk))
            .cloned()
            .collect()
    }

    /// Expand `generator` with every template applying to its identity,
    /// in template-name order.
    pub fn expand(&self, generator: &Unstructured) -> Result<Vec<Resultant>, PartialExpansion> {
        let mut templates = self.templates_for_gvk(&generator.gvk());
        templates.sort_by(|a, b| a.name().cmp(b.name()));
        self.expand_generator(generator, &templates)
    }

    /// Derive one resource per template, in the order given.
    ///
    /// Stops at the first failing template; the error carries the
    /// resultants produced before it.
    pub fn expand_generator(
        &self,
        generator: &Unstructured,
        templates: &[Arc<ExpansionTemplate>],
    ) -> Result<Vec<Resultant>, PartialExpansion> {
        let mut resultants = Vec::with_capacity(templates.len());
        for template in templates {
            match expand_one(generator, template) {
                Ok(object) => {
                    trace!(
                        template = %template.name(),
                        kind = %object.kind(),
                        "Derived resource from generator"
                    );
                    resultants.push(Resultant {
                        object,
                        template_name: template.name().to_string(),
                    });
                }
                Err(error) => return Err(PartialExpansion { resultants, error }),
            }
        }
        Ok(resultants)
    }
}

impl Default for ExpansionSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that a template can be used for expansion.
pub fn validate_template(template: &ExpansionTemplate) -> Result<(), ExpansionError> {
    let unusable = |reason: &str| ExpansionError::UnusableTemplate {
        template: template.name().to_string(),
        reason: reason.to_string(),
    };
    if template.spec.template_source.is_empty() {
        return Err(unusable("empty source"));
    }
    if template.spec.generated_gvk.to_gvk().is_empty() {
        return Err(unusable("empty generated identity"));
    }
    Ok(())
}

fn expand_one(
    generator: &Unstructured,
    template: &ExpansionTemplate,
) -> Result<Unstructured, ExpansionError> {
    validate_template(template)?;

    let path = template.source_path();
    let source = generator
        .nested_map(&path)
        .map_err(|e| ExpansionError::Extraction {
            template: template.name().to_string(),
            path: template.spec.template_source.clone(),
            reason: e.to_string(),
        })?
        .ok_or_else(|| ExpansionError::MissingSource {
            template: template.name().to_string(),
            path: template.spec.template_source.clone(),
        })?;

    let mut resource = Unstructured::new(source);
    resource.set_gvk(&template.spec.generated_gvk.to_gvk());
    Ok(resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_types::{ApplyTo, ExpansionTemplateSpec, GeneratedGvk};

    fn template(name: &str, source: &str, generated: GroupVersionKind) -> ExpansionTemplate {
        ExpansionTemplate::new(
            name,
            ExpansionTemplateSpec {
                apply_to: vec![ApplyTo::new(
                    vec!["apps"],
                    vec!["Deployment"],
                    vec!["v1"],
                )],
                template_source: source.to_string(),
                generated_gvk: GeneratedGvk::from(generated),
            },
        )
    }

    fn pod() -> GroupVersionKind {
        GroupVersionKind::new("", "v1", "Pod")
    }

    fn deployment(spec: serde_json::Value) -> Unstructured {
        Unstructured::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web", "namespace": "prod"},
            "spec": spec,
        }))
        .unwrap()
    }

    #[test]
    fn upsert_rejects_empty_name() {
        let system = ExpansionSystem::new();
        let err = system
            .upsert_template(&template("", "spec.template", pod()))
            .unwrap_err();
        assert_eq!(err, ExpansionError::InvalidKey { operation: "upsert" });
        assert!(system.is_empty());
    }

    #[test]
    fn remove_rejects_empty_name() {
        let system = ExpansionSystem::new();
        assert!(matches!(
            system.remove_template(&ExpansionTemplate::default()),
            Err(ExpansionError::InvalidKey { operation: "remove" })
        ));
    }

    #[test]
    fn remove_unknown_is_noop() {
        let system = ExpansionSystem::new();
        system
            .upsert_template(&template("keep", "spec.template", pod()))
            .unwrap();
        system.remove_template_by_name("missing").unwrap();
        assert_eq!(system.len(), 1);
    }

    #[test]
    fn upsert_replaces_by_name() {
        let system = ExpansionSystem::new();
        system
            .upsert_template(&template("t", "spec.template", pod()))
            .unwrap();
        system
            .upsert_template(&template("t", "spec.jobTemplate", pod()))
            .unwrap();
        assert_eq!(system.len(), 1);
        assert_eq!(
            system.template("t").unwrap().spec.template_source,
            "spec.jobTemplate"
        );
    }

    #[test]
    fn stored_copy_is_independent_of_caller() {
        let system = ExpansionSystem::new();
        let mut t = template("t", "spec.template", pod());
        system.upsert_template(&t).unwrap();
        t.spec.template_source = "changed".into();
        assert_eq!(system.template("t").unwrap().spec.template_source, "spec.template");
    }

    #[test]
    fn templates_for_gvk_filters_by_apply_to() {
        let system = ExpansionSystem::new();
        system
            .upsert_template(&template("deployments", "spec.template", pod()))
            .unwrap();
        let mut other = template("jobs", "spec.template", pod());
        other.spec.apply_to = vec![ApplyTo::new(vec!["batch"], vec!["Job"], vec!["v1"])];
        system.upsert_template(&other).unwrap();

        let found = system.templates_for_gvk(&GroupVersionKind::new("apps", "v1", "Deployment"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "deployments");

        assert!(system
            .templates_for_gvk(&GroupVersionKind::new("apps", "v1", "StatefulSet"))
            .is_empty());
    }

    #[test]
    fn template_with_several_matching_rules_is_listed_once() {
        let system = ExpansionSystem::new();
        let mut t = template("t", "spec.template", pod());
        t.spec.apply_to.push(ApplyTo::new(vec!["*"], vec!["*"], vec!["*"]));
        system.upsert_template(&t).unwrap();
        let found = system.templates_for_gvk(&GroupVersionKind::new("apps", "v1", "Deployment"));
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn expands_embedded_template() {
        let system = ExpansionSystem::new();
        let t = Arc::new(template("t", "spec.template", pod()));
        let generator = deployment(json!({"template": {"foo": "bar"}}));

        let resultants = system.expand_generator(&generator, &[t]).unwrap();
        assert_eq!(resultants.len(), 1);
        let expected = Unstructured::from_value(json!({
            "foo": "bar",
            "apiVersion": "v1",
            "kind": "Pod",
        }))
        .unwrap();
        assert_eq!(resultants[0].object, expected);
        assert_eq!(resultants[0].template_name, "t");
    }

    #[test]
    fn expansion_does_not_mutate_generator() {
        let system = ExpansionSystem::new();
        let t = Arc::new(template("t", "spec.template", pod()));
        let generator = deployment(json!({"template": {"foo": "bar"}}));
        let before = generator.clone();
        system.expand_generator(&generator, &[t]).unwrap();
        assert_eq!(generator, before);
    }

    #[test]
    fn missing_source_fails() {
        let system = ExpansionSystem::new();
        let t = Arc::new(template("t", "spec.template", pod()));
        let generator = deployment(json!({"replicas": 3}));
        let err = system.expand_generator(&generator, &[t]).unwrap_err();
        assert!(err.resultants.is_empty());
        assert!(matches!(err.error, ExpansionError::MissingSource { .. }));
    }

    #[test]
    fn non_object_source_fails() {
        let system = ExpansionSystem::new();
        let t = Arc::new(template("t", "spec.template", pod()));
        let generator = deployment(json!({"template": "not-a-map"}));
        let err = system.expand_generator(&generator, &[t]).unwrap_err();
        assert!(matches!(err.error, ExpansionError::Extraction { .. }));
    }

    #[test]
    fn empty_source_or_identity_is_unusable() {
        assert!(matches!(
            validate_template(&template("t", "", pod())),
            Err(ExpansionError::UnusableTemplate { .. })
        ));
        assert!(matches!(
            validate_template(&template("t", "spec.template", GroupVersionKind::default())),
            Err(ExpansionError::UnusableTemplate { .. })
        ));
        validate_template(&template("t", "spec.template", pod())).unwrap();
    }

    #[test]
    fn failure_keeps_earlier_resultants() {
        let system = ExpansionSystem::new();
        let good = Arc::new(template("a-good", "spec.template", pod()));
        let bad = Arc::new(template("b-bad", "spec.missing", pod()));
        let generator = deployment(json!({"template": {"foo": "bar"}}));

        let err = system.expand_generator(&generator, &[good, bad]).unwrap_err();
        assert_eq!(err.resultants.len(), 1);
        assert_eq!(err.resultants[0].template_name, "a-good");
        match err.error {
            ExpansionError::MissingSource { template, path } => {
                assert_eq!(template, "b-bad");
                assert_eq!(path, "spec.missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn expand_orders_by_template_name() {
        let system = ExpansionSystem::new();
        system
            .upsert_template(&template("zeta", "spec.template", pod()))
            .unwrap();
        system
            .upsert_template(&template("alpha", "spec.template", pod()))
            .unwrap();
        let generator = deployment(json!({"template": {"foo": "bar"}}));
        let names: Vec<_> = system
            .expand(&generator)
            .unwrap()
            .into_iter()
            .map(|r| r.template_name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
