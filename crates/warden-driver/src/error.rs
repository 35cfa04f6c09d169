use thiserror::Error;
use warden_types::{ObjectError, ValidationError};

/// Errors from policy drivers and the policy client.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("no template registered for constraint kind {kind:?}")]
    UnknownTemplate { kind: String },

    #[error("invalid template {template}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("invalid constraint: {0}")]
    InvalidConstraint(#[from] ValidationError),

    #[error("{engine} backend failed evaluating constraint {constraint}: {reason}")]
    BackendFault {
        engine: &'static str,
        constraint: String,
        reason: String,
    },

    #[error("unknown review target {0:?}")]
    UnknownTarget(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl DriverError {
    /// True when the error stems from a malformed user-supplied resource.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownTemplate { .. } | Self::InvalidTemplate { .. } | Self::InvalidConstraint(_)
        )
    }

    pub(crate) fn invalid_template(template: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ObjectError> for DriverError {
    fn from(e: ObjectError) -> Self {
        Self::InvalidConstraint(ValidationError::Object(e))
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
