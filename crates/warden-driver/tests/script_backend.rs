//! Script backend tests, run through `sh` so no Python is required.
//!
//! With `sh -c <code> <object> <params>` the object lands in `$0` and the
//! parameters in `$1`.

#![cfg(unix)]

use serde_json::json;
use warden_driver::script::ENGINE;
use warden_driver::{Driver, DriverError, ScriptConfig, ScriptDriver};
use warden_types::{Constraint, GroupVersionKind, PolicyTemplate, ReviewObject, Unstructured, TARGET_NAME};

fn driver(timeout_ms: u64) -> ScriptDriver {
    ScriptDriver::new(ScriptConfig {
        interpreter: "sh".to_string(),
        args: vec!["-c".to_string()],
        timeout_ms,
    })
}

fn constraint(params: serde_json::Value) -> Constraint {
    Constraint::from_value(json!({
        "apiVersion": "constraints.warden.dev/v1beta1",
        "kind": "ShellCheck",
        "metadata": {"name": "shell-check"},
        "spec": {"enforcementAction": "warn", "parameters": params},
    }))
    .unwrap()
}

fn review() -> ReviewObject {
    let object = Unstructured::from_value(json!({
        "apiVersion": "v1", "kind": "Pod", "metadata": {"name": "web"}
    }))
    .unwrap();
    ReviewObject {
        kind: GroupVersionKind::new("", "v1", "Pod"),
        name: "web".into(),
        object,
        ..Default::default()
    }
}

async fn run(code: &str, timeout_ms: u64) -> Result<Vec<warden_types::ViolationResult>, DriverError> {
    let driver = driver(timeout_ms);
    driver
        .add_template(&PolicyTemplate::with_code("ShellCheck", ENGINE, json!(code)))
        .await?;
    let c = constraint(json!({"max": 2}));
    driver.add_constraint(&c).await?;
    driver.query(TARGET_NAME, &[c], &review()).await
}

#[tokio::test]
async fn silent_script_passes() {
    assert!(run("true", 5_000).await.unwrap().is_empty());
}

#[tokio::test]
async fn plain_output_is_one_violation() {
    let results = run("echo 'not allowed'", 5_000).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].msg, "not allowed");
    assert_eq!(results[0].enforcement_action, "warn");
    assert_eq!(results[0].constraint.name, "shell-check");
}

#[tokio::test]
async fn json_list_output_is_many_violations() {
    let results = run(r#"echo '["first", "second"]'"#, 5_000).await.unwrap();
    let messages: Vec<_> = results.iter().map(|r| r.msg.as_str()).collect();
    assert_eq!(messages, vec!["first", "second"]);
}

#[tokio::test]
async fn script_receives_object_and_parameters() {
    let results = run(r#"printf '%s|%s' "$0" "$1""#, 5_000).await.unwrap();
    assert_eq!(results.len(), 1);
    let (object, params) = results[0].msg.split_once('|').unwrap();
    let object: serde_json::Value = serde_json::from_str(object).unwrap();
    assert_eq!(object["metadata"]["name"], "web");
    assert_eq!(params, r#"{"max":2}"#);
}

#[tokio::test]
async fn non_zero_exit_is_a_fault_without_stderr() {
    let err = run("echo secret-object-data >&2; exit 3", 5_000).await.unwrap_err();
    match err {
        DriverError::BackendFault { engine, reason, .. } => {
            assert_eq!(engine, "script");
            assert!(reason.starts_with("exited with"));
            assert!(reason.contains('3'));
            assert!(!reason.contains("secret-object-data"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn slow_script_times_out() {
    let err = run("sleep 5", 100).await.unwrap_err();
    assert!(matches!(err, DriverError::BackendFault { ref reason, .. } if reason.contains("timed out")));
}

#[tokio::test]
async fn missing_interpreter_is_a_fault() {
    let driver = ScriptDriver::new(ScriptConfig {
        interpreter: "/nonexistent/interpreter".to_string(),
        ..ScriptConfig::default()
    });
    driver
        .add_template(&PolicyTemplate::with_code("ShellCheck", ENGINE, json!("x")))
        .await
        .unwrap();
    let err = driver
        .query(TARGET_NAME, &[constraint(json!(null))], &review())
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::BackendFault { .. }));
}
