use thiserror::Error;
use warden_driver::DriverError;
use warden_expansion::PartialExpansion;

/// Errors raised while handling one admission request.
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("serving context canceled, aborting request")]
    Aborted,

    #[error("request carries no object to review")]
    MissingObject,

    #[error("DELETE requests must carry the prior object")]
    MissingOldObject,

    #[error("error decoding {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("{0}")]
    InvalidResource(String),

    #[error("namespace {0:?} not found")]
    NamespaceNotFound(String),

    #[error("reading namespace {name:?} failed: {reason}")]
    NamespaceRead { name: String, reason: String },

    #[error("error expanding generator: {0}")]
    Expansion(#[from] PartialExpansion),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("stats reporting failed: {0}")]
    Reporter(String),
}

impl WebhookError {
    /// True when the request's own resource is at fault.
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::InvalidResource(_) => true,
            Self::Driver(e) => e.is_user_error(),
            _ => false,
        }
    }

    pub(crate) fn decode(what: &'static str, reason: impl ToString) -> Self {
        Self::Decode {
            what,
            reason: reason.to_string(),
        }
    }
}
