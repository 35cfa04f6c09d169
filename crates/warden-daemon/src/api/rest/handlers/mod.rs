//! API request handlers

mod admit;
mod constraints;
mod expansions;
mod health;
mod metrics;
mod namespaces;
mod templates;

pub use admit::*;
pub use constraints::*;
pub use expansions::*;
pub use health::*;
pub use metrics::*;
pub use namespaces::*;
pub use templates::*;

use serde::Serialize;

/// Acknowledges a lifecycle change
#[derive(Debug, Serialize)]
pub struct LifecycleResponse {
    pub name: String,
    pub applied: bool,
}

impl LifecycleResponse {
    pub(crate) fn applied(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            applied: true,
        }
    }

    pub(crate) fn removed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            applied: false,
        }
    }
}
