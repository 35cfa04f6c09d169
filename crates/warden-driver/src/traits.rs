//! The driver contract shared by every policy backend

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use warden_types::{Constraint, PolicyTemplate, ReviewObject, ViolationResult};

/// A policy evaluation backend.
///
/// Registries are keyed by lower-cased constraint kind. Implementations
/// synchronize internally; every method may be called concurrently.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Engine name matched against a template's code blocks.
    fn engine(&self) -> &'static str;

    /// Compile and register the template's code for this engine, replacing
    /// any prior registration. A template without code for this engine is
    /// not an error.
    async fn add_template(&self, template: &PolicyTemplate) -> Result<()>;

    /// Unregister by kind. Unknown templates are ignored.
    async fn remove_template(&self, template: &PolicyTemplate) -> Result<()>;

    /// Bind a constraint. Fails with `UnknownTemplate` when this driver
    /// holds no compiled template for the constraint's kind.
    async fn add_constraint(&self, constraint: &Constraint) -> Result<()>;

    async fn remove_constraint(&self, constraint: &Constraint) -> Result<()>;

    /// Evaluate `review` against every constraint this driver has a compiled
    /// template for. Constraints of other kinds are skipped. A fault in any
    /// one evaluation fails the whole query.
    async fn query(
        &self,
        target: &str,
        constraints: &[Constraint],
        review: &ReviewObject,
    ) -> Result<Vec<ViolationResult>>;

    /// Compile the template without registering it.
    async fn validate_template(&self, template: &PolicyTemplate) -> Result<()>;

    /// Registry contents, for debugging.
    async fn dump(&self) -> Result<Value>;
}
