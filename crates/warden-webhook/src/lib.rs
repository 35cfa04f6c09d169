//! Warden Webhook - admission review orchestration
//!
//! [`ValidationHandler`] turns one admission request into one decision:
//!
//! 1. Skip requests from warden itself and from exempt namespaces
//! 2. Wait for a serving slot from the [`ConcurrencyGate`], or abort when the
//!    request is cancelled first
//! 3. Resolve the request's namespace through [`NamespaceLookup`]
//! 4. Expand the submitted object into derived objects
//! 5. Review the original and every derived object with the policy client
//! 6. Merge and classify the results into deny and warn messages
//!
//! Every decision past the self-service checks is reported to a
//! [`StatsReporter`].

#![deny(unsafe_code)]

pub mod aggregator;
pub mod config;
pub mod error;
pub mod gate;
pub mod handler;
pub mod namespace;
pub mod reporter;

pub use aggregator::{Classified, DerivedResults};
pub use config::WebhookConfig;
pub use error::WebhookError;
pub use gate::{CancelHandle, Cancellation, ConcurrencyGate};
pub use handler::ValidationHandler;
pub use namespace::{BareNamespaceReader, InMemoryNamespaceStore, NamespaceLookup, NamespaceReader};
pub use reporter::{NoopReporter, PrometheusReporter, RequestResponse, StatsReporter};
