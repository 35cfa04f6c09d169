//! External-interpreter `script` backend
//!
//! Each template carries a code string. At query time the configured
//! interpreter runs it as a child process with the reviewed object and the
//! constraint parameters as JSON arguments:
//!
//! ```text
//! <interpreter> <args...> <code> <object-json> <params-json>
//! ```
//!
//! Stdout holding a JSON array of strings yields one violation per string.
//! Any other non-blank stdout is a single violation; blank stdout means the
//! object passed.

use crate::error::{DriverError, Result};
use crate::traits::Driver;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use warden_types::{
    Constraint, ConstraintRef, PolicyTemplate, ReviewObject, ViolationResult, TARGET_NAME,
};

/// Engine name for code blocks handled by [`ScriptDriver`].
pub const ENGINE: &str = "script";

/// Longest stderr excerpt logged for a failed script.
const MAX_STDERR_CHARS: usize = 512;

/// How scripts are executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Interpreter program
    pub interpreter: String,

    /// Arguments placed before the code string
    pub args: Vec<String>,

    /// Per-execution timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            args: vec!["-c".to_string()],
            timeout_ms: 3_000,
        }
    }
}

impl ScriptConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Driver running template code through an external interpreter.
pub struct ScriptDriver {
    config: ScriptConfig,
    modules: RwLock<HashMap<String, Arc<str>>>,
    constraints: RwLock<HashMap<String, BTreeMap<String, Constraint>>>,
}

impl ScriptDriver {
    pub fn new(config: ScriptConfig) -> Self {
        Self {
            config,
            modules: RwLock::new(HashMap::new()),
            constraints: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    fn code(template: &PolicyTemplate) -> Result<Option<&str>> {
        if template.kind().is_empty() {
            return Err(DriverError::invalid_template(template.name(), "missing kind"));
        }
        match template.code_for(ENGINE) {
            None => Ok(None),
            Some(Value::String(code)) if !code.trim().is_empty() => Ok(Some(code)),
            Some(Value::String(_)) => Err(DriverError::invalid_template(
                template.name(),
                "script source is empty",
            )),
            Some(_) => Err(DriverError::invalid_template(
                template.name(),
                "script source must be a string",
            )),
        }
    }

    async fn run(&self, code: &str, object: &str, params: &str) -> std::result::Result<String, String> {
        let mut cmd = Command::new(&self.config.interpreter);
        cmd.args(&self.config.args)
            .arg(code)
            .arg(object)
            .arg(params)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.config.timeout(), cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(format!(
                    "failed to start {}: {e}",
                    self.config.interpreter
                ))
            }
            Err(_elapsed) => {
                warn!(
                    interpreter = %self.config.interpreter,
                    timeout_ms = self.config.timeout_ms,
                    "Script timed out"
                );
                return Err(format!("timed out after {}ms", self.config.timeout_ms));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
            // Stderr may echo the reviewed object; it stays in the log.
            warn!(
                interpreter = %self.config.interpreter,
                status = %output.status,
                stderr = %excerpt,
                "Script failed"
            );
            return Err(format!("exited with {}", output.status));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for ScriptDriver {
    fn default() -> Self {
        Self::new(ScriptConfig::default())
    }
}

/// Interpret script stdout as violation messages.
pub fn parse_output(stdout: &str) -> Vec<String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<String>>(trimmed) {
        Ok(messages) => messages,
        Err(_) => vec![trimmed.to_string()],
    }
}

#[async_trait]
impl Driver for ScriptDriver {
    fn engine(&self) -> &'static str {
        ENGINE
    }

    async fn add_template(&self, template: &PolicyTemplate) -> Result<()> {
        let key = template.kind().to_lowercase();
        let code = Self::code(template)?.map(Arc::<str>::from);
        let mut modules = self.modules.write().await;
        match code {
            Some(code) => {
                debug!(kind = %key, "Registered script module");
                modules.insert(key, code);
            }
            None => {
                modules.remove(&key);
            }
        }
        Ok(())
    }

    async fn remove_template(&self, template: &PolicyTemplate) -> Result<()> {
        let key = template.kind().to_lowercase();
        self.modules.write().await.remove(&key);
        self.constraints.write().await.remove(&key);
        Ok(())
    }

    async fn add_constraint(&self, constraint: &Constraint) -> Result<()> {
        let key = constraint.kind_key();
        if !self.modules.read().await.contains_key(&key) {
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

    async fn query(
        &self,
        target: &str,
        constraints: &[Constraint],
        review: &ReviewObject,
    ) -> Result<Vec<ViolationResult>> {
        if target != TARGET_NAME {
            return Err(DriverError::UnknownTarget(target.to_string()));
        }

        // Snapshot the modules so the lock is not held across child processes.
        let selected: Vec<(&Constraint, Arc<str>)> = {
            let modules = self.modules.read().await;
            constraints
                .iter()
                .filter_map(|c| modules.get(&c.kind_key()).map(|code| (c, Arc::clone(code))))
                .collect()
        };
        if selected.is_empty() {
            return Ok(Vec::new());
        }

        let object = serde_json::to_string(&review.object)?;
        let mut results = Vec::new();
        for (constraint, code) in selected {
            let params = serde_json::to_string(&constraint.parameters())?;
            let stdout = self
                .run(&code, &object, &params)
                .await
                .map_err(|reason| DriverError::BackendFault {
                    engine: ENGINE,
                    constraint: constraint.name().to_string(),
                    reason,
                })?;
            let messages = parse_output(&stdout);
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
        Self::code(template).map(|_| ())
    }

    async fn dump(&self) -> Result<Value> {
        let modules: Vec<String> = {
            let mut kinds: Vec<_> = self.modules.read().await.keys().cloned().collect();
            kinds.sort();
            kinds
        };
        let constraints: BTreeMap<String, Vec<String>> = self
            .constraints
            .read()
            .await
            .iter()
            .map(|(kind, by_name)| (kind.clone(), by_name.keys().cloned().collect()))
            .collect();
        Ok(json!({
            "engine": ENGINE,
            "interpreter": self.config.interpreter,
            "templates": modules,
            "constraints": constraints,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_output_is_no_violation() {
        assert!(parse_output("").is_empty());
        assert!(parse_output("  \n").is_empty());
    }

    #[test]
    fn json_array_output_is_one_violation_per_entry() {
        assert_eq!(parse_output(r#"["a", "b"]"#), vec!["a", "b"]);
        assert!(parse_output("[]").is_empty());
    }

    #[test]
    fn other_output_is_a_single_violation() {
        assert_eq!(parse_output("image is not allowed\n"), vec!["image is not allowed"]);
        assert_eq!(parse_output("[1, 2]"), vec!["[1, 2]"]);
    }

    #[tokio::test]
    async fn non_string_source_is_invalid() {
        let driver = ScriptDriver::default();
        let template = PolicyTemplate::with_code("K", ENGINE, json!({"code": 1}));
        assert!(matches!(
            driver.add_template(&template).await,
            Err(DriverError::InvalidTemplate { .. })
        ));
    }

    #[tokio::test]
    async fn template_without_script_code_is_ignored() {
        let driver = ScriptDriver::default();
        let template = PolicyTemplate::with_code("K", "rules", json!([]));
        driver.add_template(&template).await.unwrap();
        let dump = driver.dump().await.unwrap();
        assert_eq!(dump["templates"], json!([]));
    }
}
