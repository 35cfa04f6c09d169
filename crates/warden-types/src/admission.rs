//! Admission review wire format

use crate::gvk::GroupVersionKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status code for an allowed response that carries warnings.
pub const HTTP_STATUS_WARNING: u16 = 299;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Connect,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

/// A proposed create/update/delete submitted for a policy decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    #[serde(default)]
    pub uid: String,
    pub kind: GroupVersionKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    pub operation: Operation,
    #[serde(default)]
    pub user_info: UserInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_object: Option<Value>,
}

impl AdmissionRequest {
    pub fn new(kind: GroupVersionKind, operation: Operation) -> Self {
        Self {
            uid: String::new(),
            kind,
            name: String::new(),
            namespace: String::new(),
            operation,
            user_info: UserInfo::default(),
            object: None,
            old_object: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The decision returned for an admission request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionResponse {
    #[serde(default)]
    pub uid: String,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl AdmissionResponse {
    /// Allow with a 200 status and an explanatory message.
    pub fn allowed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            allowed: true,
            status: Some(Status {
                code: 200,
                reason: None,
                message: (!message.is_empty()).then_some(message),
            }),
            ..Default::default()
        }
    }

    /// Allow, attaching warnings. Uses 299 when any are present.
    pub fn allowed_with_warnings(warnings: Vec<String>) -> Self {
        let code = if warnings.is_empty() {
            200
        } else {
            HTTP_STATUS_WARNING
        };
        Self {
            allowed: true,
            status: Some(Status {
                code,
                reason: None,
                message: None,
            }),
            warnings,
            ..Default::default()
        }
    }

    /// Deny with 403 Forbidden.
    pub fn denied(message: impl Into<String>, warnings: Vec<String>) -> Self {
        Self {
            allowed: false,
            status: Some(Status {
                code: 403,
                reason: Some("Forbidden".to_string()),
                message: Some(message.into()),
            }),
            warnings,
            ..Default::default()
        }
    }

    /// Reject because processing failed.
    pub fn errored(code: u16, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            status: Some(Status {
                code,
                reason: None,
                message: Some(message.into()),
            }),
            ..Default::default()
        }
    }

    pub fn code(&self) -> u16 {
        self.status.as_ref().map(|s| s.code).unwrap_or(200)
    }

    pub fn message(&self) -> &str {
        self.status
            .as_ref()
            .and_then(|s| s.message.as_deref())
            .unwrap_or_default()
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }
}

/// Envelope exchanged with the API server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

fn default_api_version() -> String {
    "admission.k8s.io/v1".to_string()
}

fn default_kind() -> String {
    "AdmissionReview".to_string()
}

impl AdmissionReview {
    pub fn for_request(request: AdmissionRequest) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            request: Some(request),
            response: None,
        }
    }

    /// Build the reply envelope, echoing the request uid.
    pub fn respond(&self, response: AdmissionResponse) -> Self {
        let uid = self
            .request
            .as_ref()
            .map(|r| r.uid.clone())
            .unwrap_or_default();
        Self {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            request: None,
            response: Some(response.with_uid(uid)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_request_envelope() {
        let review: AdmissionReview = serde_json::from_value(json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "abc",
                "kind": {"group": "apps", "version": "v1", "kind": "Deployment"},
                "namespace": "prod",
                "operation": "CREATE",
                "userInfo": {"username": "alice"},
                "object": {"metadata": {"name": "web"}}
            }
        }))
        .unwrap();
        let request = review.request.clone().unwrap();
        assert_eq!(request.operation, Operation::Create);
        assert_eq!(request.user_info.username, "alice");
        assert!(request.old_object.is_none());

        let reply = review.respond(AdmissionResponse::allowed(""));
        assert_eq!(reply.response.unwrap().uid, "abc");
        assert!(reply.request.is_none());
    }

    #[test]
    fn warning_status_only_when_warnings_present() {
        assert_eq!(AdmissionResponse::allowed_with_warnings(vec![]).code(), 200);
        assert_eq!(
            AdmissionResponse::allowed_with_warnings(vec!["w".into()]).code(),
            HTTP_STATUS_WARNING
        );
    }

    #[test]
    fn denial_is_forbidden() {
        let resp = AdmissionResponse::denied("[c] nope", vec![]);
        assert!(!resp.allowed);
        assert_eq!(resp.code(), 403);
        assert_eq!(resp.message(), "[c] nope");
    }
}
