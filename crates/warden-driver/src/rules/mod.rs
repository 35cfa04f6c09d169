//! Native `rules` backend
//!
//! Compiles declarative field checks at template registration and evaluates
//! them in-process at query time.

pub mod check;

pub use check::{Check, CheckSpec, Operator, RuleSet};

use crate::error::{DriverError, Result};
use crate::traits::Driver;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use warden_types::{
    Constraint, ConstraintRef, PolicyTemplate, ReviewObject, ViolationResult, TARGET_NAME,
};

/// Engine name for code blocks handled by [`RulesDriver`].
pub const ENGINE: &str = "rules";

/// Driver evaluating compiled [`RuleSet`]s.
pub struct RulesDriver {
    templates: RwLock<HashMap<String, Arc<RuleSet>>>,
    constraints: RwLock<HashMap<String, BTreeMap<String, Constraint>>>,
}

impl RulesDriver {
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
            constraints: RwLock::new(HashMap::new()),
        }
    }

    fn compile(template: &PolicyTemplate) -> Result<Option<RuleSet>> {
        if template.kind().is_empty() {
            return Err(DriverError::invalid_template(template.name(), "missing kind"));
        }
        template
            .code_for(ENGINE)
            .map(|source| RuleSet::compile(template, source))
            .transpose()
    }
}

impl Default for RulesDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for RulesDriver {
    fn engine(&self) -> &'static str {
        ENGINE
    }

    async fn add_template(&self, template: &PolicyTemplate) -> Result<()> {
        let key = template.kind().to_lowercase();
        let compiled = Self::compile(template)?;
        let mut templates = self.templates.write().await;
        match compiled {
            Some(rules) => {
                debug!(kind = %key, checks = rules.len(), "Registered rule set");
                templates.insert(key, Arc::new(rules));
            }
            // Re-registration without rules code drops the old rule set.
            None => {
                templates.remove(&key);
            }
        }
        Ok(())
    }

    async fn remove_template(&self, template: &PolicyTemplate) -> Result<()> {
        let key = template.kind().to_lowercase();
        self.templates.write().await.remove(&key);
        self.constraints.write().await.remove(&key);
        Ok(())
    }

    async fn add_constraint(&self, constraint: &Constraint) -> Result<()> {
        let key = constraint.kind_key();
        if !self.templates.read().await.contains_key(&key) {
            return Err(DriverError::UnknownTemplate { kind: key });
        }
        self.constraints
            .write()
            .await
            .entry(key)
            .or_default()
            .insert(constraint.name().to_string(), constraint.clone());
        Ok(())
    }

    async fn remove_constraint(&self, constraint: &Constraint) -> Result<()> {
        let key = constraint.kind_key();
        let mut constraints = self.constraints.write().await;
        if let Some(by_name) = constraints.get_mut(&key) {
            by_name.remove(constraint.name());
            if by_name.is_empty() {
                constraints.remove(&key);
            }
        }
        Ok(())
    }

    #[instrument(skip_all, fields(kind = %review.kind, name = %review.name))]
    async fn query(
        &self,
        target: &str,
        constraints: &[Constraint],
        review: &ReviewObject,
    ) -> Result<Vec<ViolationResult>> {
        if target != TARGET_NAME {
            return Err(DriverError::UnknownTarget(target.to_string()));
        }

        let object = review.object.to_value();
        let templates = self.templates.read().await;
        let mut results = Vec::new();
        for constraint in constraints {
            let Some(rules) = templates.get(&constraint.kind_key()) else {
                continue;
            };
            let messages = rules
                .evaluate(&object, &constraint.parameters())
                .map_err(|reason| DriverError::BackendFault {
                    engine: ENGINE,
                    constraint: constraint.name().to_string(),
                    reason,
                })?;
            if messages.is_empty() {
                continue;
            }
            let action = constraint.enforcement_action()?;
            results.extend(messages.into_iter().map(|msg| {
                ViolationResult::new(ConstraintRef::from(constraint), msg, action.clone())
            }));
        }
        Ok(results)
    }

    async fn validate_template(&self, template: &PolicyTemplate) -> Result<()> {
        Self::compile(template).map(|_| ())
    }

    async fn dump(&self) -> Result<Value> {
        let templates: BTreeMap<String, usize> = self
            .templates
            .read()
            .await
            .iter()
            .map(|(kind, rules)| (kind.clone(), rules.len()))
            .collect();
        let constraints: BTreeMap<String, Vec<String>> = self
            .constraints
            .read()
            .await
            .iter()
            .map(|(kind, by_name)| (kind.clone(), by_name.keys().cloned().collect()))
            .collect();
        Ok(json!({
            "engine": ENGINE,
            "templates": templates,
            "constraints": constraints,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::{GroupVersionKind, Unstructured};

    fn template() -> PolicyTemplate {
        PolicyTemplate::with_code(
            "RequiredLabels",
            ENGINE,
            json!([{
                "path": "metadata.labels.owner",
                "op": "required",
                "message": "missing label owner"
            }]),
        )
    }

    fn constraint(name: &str, action: Option<&str>) -> Constraint {
        let mut spec = json!({});
        if let Some(action) = action {
            spec["enforcementAction"] = json!(action);
        }
        Constraint::from_value(json!({
            "apiVersion": "constraints.warden.dev/v1beta1",
            "kind": "RequiredLabels",
            "metadata": {"name": name},
            "spec": spec,
        }))
        .unwrap()
    }

    fn review(labels: Value) -> ReviewObject {
        let object = Unstructured::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "web", "labels": labels},
        }))
        .unwrap();
        ReviewObject {
            kind: GroupVersionKind::new("", "v1", "Pod"),
            name: "web".into(),
            object,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn add_constraint_requires_template() {
        let driver = RulesDriver::new();
        let err = driver
            .add_constraint(&constraint("c", None))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::UnknownTemplate { kind } if kind == "requiredlabels"));
    }

    #[tokio::test]
    async fn template_without_rules_code_is_ignored() {
        let driver = RulesDriver::new();
        let other = PolicyTemplate::with_code("RequiredLabels", "script", json!("print()"));
        driver.add_template(&other).await.unwrap();
        assert!(driver.add_constraint(&constraint("c", None)).await.is_err());
    }

    #[tokio::test]
    async fn query_tags_results_with_enforcement_action() {
        let driver = RulesDriver::new();
        driver.add_template(&template()).await.unwrap();
        let constraints = vec![constraint("deny-me", None), constraint("warn-me", Some("warn"))];
        for c in &constraints {
            driver.add_constraint(c).await.unwrap();
        }

        let results = driver
            .query(TARGET_NAME, &constraints, &review(json!({})))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].constraint.name, "deny-me");
        assert_eq!(results[0].enforcement_action, "deny");
        assert_eq!(results[0].msg, "missing label owner");
        assert_eq!(results[1].enforcement_action, "warn");

        let clean = driver
            .query(TARGET_NAME, &constraints, &review(json!({"owner": "team-a"})))
            .await
            .unwrap();
        assert!(clean.is_empty());
    }

    #[tokio::test]
    async fn query_without_constraints_is_empty() {
        let driver = RulesDriver::new();
        driver.add_template(&template()).await.unwrap();
        let results = driver
            .query(TARGET_NAME, &[], &review(json!({})))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn query_skips_kinds_without_rule_set() {
        let driver = RulesDriver::new();
        let results = driver
            .query(TARGET_NAME, &[constraint("c", None)], &review(json!({})))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn query_rejects_unknown_target() {
        let driver = RulesDriver::new();
        assert!(matches!(
            driver.query("audit", &[], &review(json!({}))).await,
            Err(DriverError::UnknownTarget(_))
        ));
    }

    #[tokio::test]
    async fn evaluation_fault_aborts_query() {
        let driver = RulesDriver::new();
        let template = PolicyTemplate::with_code(
            "RequiredLabels",
            ENGINE,
            json!([{"path": "metadata.name", "op": "equals", "param": "name"}]),
        );
        driver.add_template(&template).await.unwrap();
        let err = driver
            .query(TARGET_NAME, &[constraint("c", None)], &review(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::BackendFault { engine: "rules", .. }));
    }

    #[tokio::test]
    async fn remove_template_drops_constraints() {
        let driver = RulesDriver::new();
        driver.add_template(&template()).await.unwrap();
        driver.add_constraint(&constraint("c", None)).await.unwrap();
        driver.remove_template(&template()).await.unwrap();

        let dump = driver.dump().await.unwrap();
        assert_eq!(dump["templates"], json!({}));
        assert_eq!(dump["constraints"], json!({}));
    }

    #[tokio::test]
    async fn replacing_template_recompiles() {
        let driver = RulesDriver::new();
        driver.add_template(&template()).await.unwrap();
        let relaxed = PolicyTemplate::with_code("RequiredLabels", ENGINE, json!([]));
        driver.add_template(&relaxed).await.unwrap();
        driver.add_constraint(&constraint("c", None)).await.unwrap();

        let results = driver
            .query(TARGET_NAME, &[constraint("c", None)], &review(json!({})))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn validate_template_does_not_register() {
        let driver = RulesDriver::new();
        driver.validate_template(&template()).await.unwrap();
        assert!(driver.add_constraint(&constraint("c", None)).await.is_err());

        let broken = PolicyTemplate::with_code("RequiredLabels", ENGINE, json!({"not": "a list"}));
        assert!(matches!(
            driver.validate_template(&broken).await,
            Err(DriverError::InvalidTemplate { .. })
        ));
    }
}
