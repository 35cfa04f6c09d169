//! Policy client with more than one mounted driver.

use serde_json::json;
use std::sync::Arc;
use warden_driver::{rules, script, Driver, PolicyClient, RulesDriver, ScriptConfig, ScriptDriver};
use warden_types::{CodeBlock, Constraint, GroupVersionKind, PolicyTemplate, ReviewObject, Unstructured};

fn client() -> PolicyClient {
    let drivers: Vec<Arc<dyn Driver>> = vec![
        Arc::new(RulesDriver::new()),
        Arc::new(ScriptDriver::new(ScriptConfig {
            interpreter: "sh".to_string(),
            args: vec!["-c".to_string()],
            timeout_ms: 5_000,
        })),
    ];
    PolicyClient::new(drivers)
}

fn constraint(kind: &str, name: &str) -> Constraint {
    Constraint::from_value(json!({
        "apiVersion": "constraints.warden.dev/v1beta1",
        "kind": kind,
        "metadata": {"name": name},
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
        namespace: "prod".into(),
        object,
        ..Default::default()
    }
}

#[tokio::test]
async fn unknown_kinds_and_empty_registries_yield_no_results() {
    let client = client();
    assert!(client.review(&review()).await.unwrap().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn results_follow_driver_mount_order() {
    let client = client();

    // One template carrying code for both engines.
    let mut template = PolicyTemplate::with_code(
        "Owned",
        rules::ENGINE,
        json!([{"path": "metadata.labels.owner", "op": "required", "message": "from rules"}]),
    );
    template.spec.targets[0].code.push(CodeBlock {
        engine: script::ENGINE.to_string(),
        source: json!("echo 'from script'"),
    });

    client.add_template(&template).await.unwrap();
    client.add_constraint(&constraint("Owned", "owned")).await.unwrap();

    let messages: Vec<_> = client
        .review(&review())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.msg)
        .collect();
    assert_eq!(messages, vec!["from rules", "from script"]);
}

#[cfg(unix)]
#[tokio::test]
async fn each_driver_serves_its_own_kinds() {
    let client = client();
    client
        .add_template(&PolicyTemplate::with_code(
            "Scripted",
            script::ENGINE,
            json!("echo scripted"),
        ))
        .await
        .unwrap();
    client
        .add_template(&PolicyTemplate::with_code(
            "Ruled",
            rules::ENGINE,
            json!([{"path": "spec", "op": "required", "message": "ruled"}]),
        ))
        .await
        .unwrap();
    client.add_constraint(&constraint("Scripted", "s")).await.unwrap();
    client.add_constraint(&constraint("Ruled", "r")).await.unwrap();

    let mut messages: Vec<_> = client
        .review(&review())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.msg)
        .collect();
    messages.sort();
    assert_eq!(messages, vec!["ruled", "scripted"]);

    let dump = client.dump().await.unwrap();
    assert_eq!(dump["drivers"][0]["constraints"]["ruled"], json!(["r"]));
    assert_eq!(dump["drivers"][1]["constraints"]["scripted"], json!(["s"]));
}

#[tokio::test]
async fn concurrent_registration_and_review() {
    let client = Arc::new(client());
    client
        .add_template(&PolicyTemplate::with_code(
            "Ruled",
            rules::ENGINE,
            json!([{"path": "metadata.name", "op": "required"}]),
        ))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            let c = constraint("Ruled", &format!("c{i}"));
            client.add_constraint(&c).await.unwrap();
            client.review(&review()).await.unwrap();
            if i % 2 == 0 {
                client.remove_constraint(&c).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let matched = client.matching_constraints(&review()).await.unwrap();
    assert_eq!(matched.len(), 8);
}

#[tokio::test]
async fn rejected_update_keeps_prior_version_in_every_driver() {
    let client = client();
    let strict = PolicyTemplate::with_code(
        "RequiredLabels",
        rules::ENGINE,
        json!([{"path": "metadata.labels.owner", "op": "required", "message": "missing owner"}]),
    );
    client.add_template(&strict).await.unwrap();
    client
        .add_constraint(&constraint("RequiredLabels", "must-have-owner"))
        .await
        .unwrap();

    // Relaxed rules paired with a script block the script driver rejects.
    let mut relaxed = PolicyTemplate::with_code("RequiredLabels", rules::ENGINE, json!([]));
    relaxed.spec.targets[0].code.push(CodeBlock {
        engine: script::ENGINE.to_string(),
        source: json!(1),
    });
    let err = client.add_template(&relaxed).await.unwrap_err();
    assert!(err.is_user_error());

    assert_eq!(client.template("RequiredLabels").await, Some(strict));
    let results = client.review(&review()).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].msg, "missing owner");
}
