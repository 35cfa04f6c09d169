use thiserror::Error;

use crate::system::Resultant;

/// Errors from the expansion template store and expander.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpansionError {
    #[error("cannot {operation} template with empty name")]
    InvalidKey { operation: &'static str },

    #[error("could not find source field {path:?} in generator for template {template}")]
    MissingSource { template: String, path: String },

    #[error("could not extract source field {path:?} for template {template}: {reason}")]
    Extraction {
        template: String,
        path: String,
        reason: String,
    },

    #[error("template {template} is unusable: {reason}")]
    UnusableTemplate { template: String, reason: String },
}

/// Expansion stopped at the first failing template.
///
/// `resultants` holds the derived resources produced by the templates that
/// ran before the failure, in template order.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct PartialExpansion {
    pub resultants: Vec<Resultant>,
    #[source]
    pub error: ExpansionError,
}
