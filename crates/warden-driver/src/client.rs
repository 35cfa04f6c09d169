//! Policy client: owns constraint matching and fans queries out to drivers

use crate::error::{DriverError, Result};
use crate::traits::Driver;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use warden_types::{Constraint, PolicyTemplate, ReviewObject, ViolationResult, TARGET_NAME};

/// Front door to every mounted [`Driver`].
///
/// The client keeps its own copy of each registered template and constraint
/// so that it can select the constraints matching a review before any driver
/// is consulted. Results are concatenated in driver mount order.
pub struct PolicyClient {
    drivers: Vec<Arc<dyn Driver>>,
    templates: RwLock<BTreeMap<String, PolicyTemplate>>,
    constraints: RwLock<BTreeMap<String, BTreeMap<String, Constraint>>>,
}

impl PolicyClient {
    pub fn new(drivers: Vec<Arc<dyn Driver>>) -> Self {
        info!(
            drivers = ?drivers.iter().map(|d| d.engine()).collect::<Vec<_>>(),
            "Policy client created"
        );
        Self {
            drivers,
            templates: RwLock::new(BTreeMap::new()),
            constraints: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn drivers(&self) -> &[Arc<dyn Driver>] {
        &self.drivers
    }

    /// Validate and register a template with every driver.
    ///
    /// Every driver compiles the template before any of them registers it,
    /// so a template one driver rejects leaves all drivers on the prior
    /// version.
    pub async fn add_template(&self, template: &PolicyTemplate) -> Result<()> {
        validate(template)?;
        for driver in &self.drivers {
            driver.validate_template(template).await?;
        }
        for driver in &self.drivers {
            driver.add_template(template).await?;
        }
        self.templates
            .write()
            .await
            .insert(template.kind().to_lowercase(), template.clone());
        debug!(template = %template.name(), "Added policy template");
        Ok(())
    }

    /// Unregister a template and every constraint of its kind.
    pub async fn remove_template(&self, template: &PolicyTemplate) -> Result<()> {
        let key = template.kind().to_lowercase();
        let orphaned = self.constraints.write().await.remove(&key);
        for constraint in orphaned.into_iter().flat_map(BTreeMap::into_values) {
            for driver in &self.drivers {
                driver.remove_constraint(&constraint).await?;
            }
        }
        for driver in &self.drivers {
            driver.remove_template(template).await?;
        }
        self.templates.write().await.remove(&key);
        debug!(template = %template.name(), "Removed policy template");
        Ok(())
    }

    /// Template registered for a constraint kind.
    pub async fn template(&self, kind: &str) -> Option<PolicyTemplate> {
        self.templates.read().await.get(&kind.to_lowercase()).cloned()
    }

    /// Validate a constraint, bind it in every driver that serves its kind,
    /// and keep a copy for matching.
    pub async fn add_constraint(&self, constraint: &Constraint) -> Result<()> {
        self.validate_constraint(constraint).await?;

        let mut accepted = false;
        for driver in &self.drivers {
            match driver.add_constraint(constraint).await {
                Ok(()) => accepted = true,
                Err(DriverError::UnknownTemplate { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        if !accepted {
            return Err(DriverError::UnknownTemplate {
                kind: constraint.kind_key(),
            });
        }

        self.constraints
            .write()
            .await
            .entry(constraint.kind_key())
            .or_default()
            .insert(constraint.name().to_string(), constraint.clone());
        debug!(
            kind = %constraint.kind(),
            constraint = %constraint.name(),
            "Added constraint"
        );
        Ok(())
    }

    pub async fn remove_constraint(&self, constraint: &Constraint) -> Result<()> {
        for driver in &self.drivers {
            driver.remove_constraint(constraint).await?;
        }
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

    /// Structural checks plus a known template for the constraint's kind.
    pub async fn validate_constraint(&self, constraint: &Constraint) -> Result<()> {
        constraint.validate()?;
        if !self
            .templates
            .read()
            .await
            .contains_key(&constraint.kind_key())
        {
            return Err(DriverError::UnknownTemplate {
                kind: constraint.kind_key(),
            });
        }
        Ok(())
    }

    /// Compile a template in every driver without registering it.
    pub async fn validate_template(&self, template: &PolicyTemplate) -> Result<()> {
        validate(template)?;
        for driver in &self.drivers {
            driver.validate_template(template).await?;
        }
        Ok(())
    }

    /// Evaluate a review against every matching constraint in every driver.
    pub async fn review(&self, review: &ReviewObject) -> Result<Vec<ViolationResult>> {
        let matched = self.matching_constraints(review).await?;
        if matched.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for driver in &self.drivers {
            results.extend(driver.query(TARGET_NAME, &matched, review).await?);
        }
        Ok(results)
    }

    /// Constraints whose match block accepts the review, ordered by kind then
    /// name.
    pub async fn matching_constraints(&self, review: &ReviewObject) -> Result<Vec<Constraint>> {
        let namespace = review.match_namespace();
        let constraints = self.constraints.read().await;
        let mut matched = Vec::new();
        for constraint in constraints.values().flat_map(BTreeMap::values) {
            if constraint.match_criteria()?.matches(&review.kind, namespace) {
                matched.push(constraint.clone());
            }
        }
        Ok(matched)
    }

    /// Every driver's registry plus the client's own view, as JSON.
    pub async fn dump(&self) -> Result<Value> {
        let templates: Vec<String> = self
            .templates
            .read()
            .await
            .values()
            .map(|t| t.name().to_string())
            .collect();
        let constraints: BTreeMap<String, Vec<String>> = self
            .constraints
            .read()
            .await
            .iter()
            .map(|(kind, by_name)| (kind.clone(), by_name.keys().cloned().collect()))
            .collect();
        let mut drivers = Vec::with_capacity(self.drivers.len());
        for driver in &self.drivers {
            drivers.push(driver.dump().await?);
        }
        Ok(json!({
            "templates": templates,
            "constraints": constraints,
            "drivers": drivers,
        }))
    }
}

fn validate(template: &PolicyTemplate) -> Result<()> {
    template
        .validate()
        .map_err(|e| DriverError::invalid_template(template.name(), e.to_string()))
}
