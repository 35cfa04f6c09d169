//! The validation handler: one admission request in, one decision out

use crate::aggregator::{self, Classified, DerivedResults};
use crate::config::WebhookConfig;
use crate::error::WebhookError;
use crate::gate::{Cancellation, ConcurrencyGate};
use crate::namespace::NamespaceLookup;
use crate::reporter::{RequestResponse, StatsReporter};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};
use warden_driver::PolicyClient;
use warden_expansion::{validate_template, ExpansionSystem};
use warden_types::{
    AdmissionRequest, AdmissionResponse, Constraint, EnforcementAction, ExpansionTemplate,
    Operation, PolicyTemplate, ReviewObject, SourceType, Unstructured, ViolationResult,
    CONFIG_GROUP, CONSTRAINTS_GROUP, EXPANSION_GROUP, TEMPLATES_GROUP,
};

/// Name the singleton configuration resource must carry.
const CONFIG_RESOURCE_NAME: &str = "config";

/// Review orchestrator for validating admission requests.
pub struct ValidationHandler {
    config: WebhookConfig,
    client: Arc<PolicyClient>,
    expansion: Arc<ExpansionSystem>,
    namespaces: NamespaceLookup,
    reporter: Arc<dyn StatsReporter>,
    gate: ConcurrencyGate,
}

impl ValidationHandler {
    pub fn new(
        config: WebhookConfig,
        client: Arc<PolicyClient>,
        expansion: Arc<ExpansionSystem>,
        namespaces: NamespaceLookup,
        reporter: Arc<dyn StatsReporter>,
    ) -> Self {
        let gate = ConcurrencyGate::new(config.serving_threads());
        info!(
            serving_threads = gate.limit(),
            exempt_namespaces = ?config.exempt_namespaces,
            "Validation handler created"
        );
        Self {
            config,
            client,
            expansion,
            namespaces,
            reporter,
            gate,
        }
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Decide one admission request.
    ///
    /// Never fails: processing errors become errored responses. The
    /// configured request timeout is added to `cancel`.
    #[instrument(
        skip_all,
        fields(uid = %request.uid, kind = %request.kind, operation = ?request.operation)
    )]
    pub async fn handle(
        &self,
        mut request: AdmissionRequest,
        cancel: &Cancellation,
    ) -> AdmissionResponse {
        let started = Instant::now();

        if request.user_info.username == self.config.system_username {
            return AdmissionResponse::allowed("warden does not self-manage");
        }

        if request.operation == Operation::Delete {
            // The prior state is what a deletion is judged on.
            match &request.old_object {
                Some(old) => request.object = Some(old.clone()),
                None => {
                    return AdmissionResponse::errored(
                        500,
                        WebhookError::MissingOldObject.to_string(),
                    )
                }
            }
        }

        if let Err(e) = self.validate_own_resource(&request).await {
            let code = if e.is_user_error() { 422 } else { 500 };
            debug!(error = %e, code, "Rejected invalid warden resource");
            return AdmissionResponse::errored(code, e.to_string());
        }

        let cancel = match self.config.request_timeout() {
            Some(timeout) => cancel.clone().with_timeout(timeout),
            None => cancel.clone(),
        };
        let (response, outcome) = self.decide(&request, &cancel).await;

        if let Err(e) = self
            .reporter
            .report_validation_request(outcome, started.elapsed())
        {
            error!(error = %e, "Failed to report request");
        }
        response
    }

    async fn decide(
        &self,
        request: &AdmissionRequest,
        cancel: &Cancellation,
    ) -> (AdmissionResponse, RequestResponse) {
        if self.config.is_exempt(exemption_namespace(request)) {
            return (
                AdmissionResponse::allowed("Namespace is set to be ignored by warden config"),
                RequestResponse::Allow,
            );
        }

        let results = match self.review_request(request, cancel).await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "Error executing query");
                return (
                    AdmissionResponse::errored(500, e.to_string()),
                    RequestResponse::Error,
                );
            }
        };

        if self.config.log_denies {
            log_denies(&results, request);
        }

        let classified = Classified::classify(&results);
        let outcome = if classified.is_denied() {
            RequestResponse::Deny
        } else if !classified.warn.is_empty() {
            RequestResponse::Warn
        } else {
            RequestResponse::Allow
        };
        (classified.into_response(), outcome)
    }

    /// Expand and review one request, holding a serving slot throughout.
    ///
    /// Returns the original object's results followed by each derived
    /// object's results.
    pub async fn review_request(
        &self,
        request: &AdmissionRequest,
        cancel: &Cancellation,
    ) -> Result<Vec<ViolationResult>, WebhookError> {
        let _permit = self.gate.acquire(cancel).await?;

        let review = self.review_for_request(request).await?;

        let mut generator = review.object.clone();
        generator.set_namespace(&review.namespace);
        generator.set_gvk(&request.kind);
        // Partial resultants are discarded with the error.
        let resultants = self.expansion.expand(&generator)?;

        let original = self.client.review(&review).await?;

        let mut derived = Vec::with_capacity(resultants.len());
        for resultant in resultants {
            let gvk = resultant.object.gvk();
            let mut derived_review = ReviewObject::generated(
                resultant.object,
                &review.namespace,
                review.namespace_object.clone(),
                review.username.clone(),
            );
            // A derived object that names its own namespace is reviewed
            // against that namespace's object.
            if derived_review.namespace_object.is_none() && !derived_review.namespace.is_empty() {
                derived_review.namespace_object =
                    Some(self.namespaces.resolve(&derived_review.namespace).await?);
            }
            let results = self.client.review(&derived_review).await?;
            derived.push(DerivedResults {
                template: resultant.template_name,
                gvk,
                results,
            });
        }

        Ok(aggregator::merge(original, derived))
    }

    async fn review_for_request(
        &self,
        request: &AdmissionRequest,
    ) -> Result<ReviewObject, WebhookError> {
        let object = decode_object(request)?;
        let old_object = request
            .old_object
            .clone()
            .map(Unstructured::from_value)
            .transpose()
            .map_err(|e| WebhookError::decode("old object", e))?;

        // Namespaces are cluster-scoped regardless of what the request says.
        let namespace = if is_namespace_kind(request) {
            String::new()
        } else {
            request.namespace.clone()
        };
        let namespace_object = if namespace.is_empty() {
            None
        } else {
            Some(self.namespaces.resolve(&namespace).await?)
        };

        Ok(ReviewObject {
            object,
            old_object,
            kind: request.kind.clone(),
            name: request.name.clone(),
            namespace,
            namespace_object,
            operation: Some(request.operation),
            username: request.user_info.username.clone(),
            source: SourceType::Original,
        })
    }

    /// Validate requests for warden's own resource kinds.
    pub async fn validate_own_resource(
        &self,
        request: &AdmissionRequest,
    ) -> Result<(), WebhookError> {
        let gvk = &request.kind;
        match (gvk.group.as_str(), gvk.kind.as_str()) {
            (TEMPLATES_GROUP, "ConstraintTemplate") => self.validate_policy_template(request).await,
            (CONSTRAINTS_GROUP, _) => self.validate_constraint(request).await,
            (CONFIG_GROUP, "Config") => {
                if request.name != CONFIG_RESOURCE_NAME {
                    return Err(WebhookError::InvalidResource(format!(
                        "config resource must have name {CONFIG_RESOURCE_NAME:?}"
                    )));
                }
                Ok(())
            }
            (EXPANSION_GROUP, "ExpansionTemplate") => validate_expansion_template(request),
            _ => Ok(()),
        }
    }

    async fn validate_policy_template(&self, request: &AdmissionRequest) -> Result<(), WebhookError> {
        let raw = request.object.clone().ok_or(WebhookError::MissingObject)?;
        let template: PolicyTemplate =
            serde_json::from_value(raw).map_err(|e| WebhookError::decode("policy template", e))?;
        self.client.validate_template(&template).await?;
        Ok(())
    }

    async fn validate_constraint(&self, request: &AdmissionRequest) -> Result<(), WebhookError> {
        let constraint = Constraint::new(decode_object(request)?);
        self.client.validate_constraint(&constraint).await?;

        let action = constraint
            .raw_enforcement_action()
            .map_err(|e| WebhookError::InvalidResource(e.to_string()))?;
        match action {
            Some(action) if !action.is_empty() && !self.config.disable_enforcement_action_validation => {
                EnforcementAction::validate(action)
                    .map_err(|e| WebhookError::InvalidResource(e.to_string()))?;
            }
            _ => {}
        }
        Ok(())
    }
}

fn validate_expansion_template(request: &AdmissionRequest) -> Result<(), WebhookError> {
    let raw = request.object.clone().ok_or(WebhookError::MissingObject)?;
    let template: ExpansionTemplate =
        serde_json::from_value(raw).map_err(|e| WebhookError::decode("expansion template", e))?;
    if template.name().is_empty() {
        return Err(WebhookError::InvalidResource(
            "expansion template name must not be empty".to_string(),
        ));
    }
    validate_template(&template).map_err(|e| WebhookError::InvalidResource(e.to_string()))
}

fn decode_object(request: &AdmissionRequest) -> Result<Unstructured, WebhookError> {
    let raw = request.object.clone().ok_or(WebhookError::MissingObject)?;
    Unstructured::from_value(raw).map_err(|e| WebhookError::decode("object", e))
}

fn is_namespace_kind(request: &AdmissionRequest) -> bool {
    request.kind.group.is_empty() && request.kind.kind == "Namespace"
}

/// Namespace checked against the exemption list. A `Namespace` request is
/// exempt by its own name.
fn exemption_namespace(request: &AdmissionRequest) -> &str {
    if is_namespace_kind(request) {
        if !request.name.is_empty() {
            return &request.name;
        }
        return request
            .object
            .as_ref()
            .and_then(|o| o.pointer("/metadata/name"))
            .and_then(|n| n.as_str())
            .unwrap_or_default();
    }
    &request.namespace
}

fn log_denies(results: &[ViolationResult], request: &AdmissionRequest) {
    let mut resource_name = request.name.clone();
    if resource_name.is_empty() {
        // Names may be generated server-side on create.
        if let Some(name) = request
            .object
            .as_ref()
            .and_then(|o| o.pointer("/metadata/name"))
            .and_then(|n| n.as_str())
        {
            resource_name = name.to_string();
        }
    }
    for (result, action) in aggregator::counted(results) {
        info!(
            process = "admission",
            event_type = "violation",
            constraint_name = %result.constraint.name,
            constraint_group = CONSTRAINTS_GROUP,
            constraint_kind = %result.constraint.kind,
            constraint_action = %action,
            resource_group = %request.kind.group,
            resource_api_version = %request.kind.version,
            resource_kind = %request.kind.kind,
            resource_namespace = %request.namespace,
            resource_name = %resource_name,
            request_username = %request.user_info.username,
            "denied admission"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_types::GroupVersionKind;

    fn request(kind: GroupVersionKind, name: &str, namespace: &str) -> AdmissionRequest {
        let mut request = AdmissionRequest::new(kind, Operation::Create);
        request.name = name.into();
        request.namespace = namespace.into();
        request
    }

    #[test]
    fn namespace_requests_are_exempted_by_name() {
        let mut req = request(GroupVersionKind::new("", "v1", "Namespace"), "", "");
        req.object = Some(json!({"metadata": {"name": "kube-system"}}));
        assert_eq!(exemption_namespace(&req), "kube-system");
        req.name = "named".into();
        assert_eq!(exemption_namespace(&req), "named");
    }

    #[test]
    fn other_requests_are_exempted_by_namespace() {
        let req = request(GroupVersionKind::new("apps", "v1", "Deployment"), "web", "prod");
        assert_eq!(exemption_namespace(&req), "prod");
    }

    #[test]
    fn only_core_namespace_kind_is_coerced() {
        assert!(is_namespace_kind(&request(
            GroupVersionKind::new("", "v1", "Namespace"),
            "a",
            ""
        )));
        assert!(!is_namespace_kind(&request(
            GroupVersionKind::new("example.com", "v1", "Namespace"),
            "a",
            ""
        )));
    }

    #[test]
    fn expansion_template_resources_are_checked() {
        let mut req = request(
            GroupVersionKind::new(EXPANSION_GROUP, "v1alpha1", "ExpansionTemplate"),
            "expand-deployments",
            "",
        );
        req.object = Some(json!({
            "metadata": {"name": "expand-deployments"},
            "spec": {"templateSource": "spec.template"}
        }));
        let err = validate_expansion_template(&req).unwrap_err();
        assert!(err.is_user_error());

        req.object = Some(json!({
            "metadata": {"name": "expand-deployments"},
            "spec": {
                "templateSource": "spec.template",
                "generatedGVK": {"version": "v1", "kind": "Pod"}
            }
        }));
        validate_expansion_template(&req).unwrap();

        req.object = Some(json!({"metadata": {"name": 3}}));
        assert!(!validate_expansion_template(&req).unwrap_err().is_user_error());
    }
}
