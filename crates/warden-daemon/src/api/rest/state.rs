//! Application state for API handlers

use crate::config::DaemonConfig;
use crate::error::DaemonResult;
use prometheus::Registry;
use std::sync::Arc;
use tokio::sync::watch;
use warden_driver::{Driver, PolicyClient, RulesDriver, ScriptDriver};
use warden_expansion::ExpansionSystem;
use warden_webhook::{
    BareNamespaceReader, InMemoryNamespaceStore, NamespaceLookup, PrometheusReporter,
    ValidationHandler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Admission review orchestrator
    pub handler: Arc<ValidationHandler>,

    /// Policy client shared with the handler
    pub client: Arc<PolicyClient>,

    /// Expansion template store shared with the handler
    pub expansion: Arc<ExpansionSystem>,

    /// Namespace cache fed by the lifecycle API
    pub namespaces: Arc<InMemoryNamespaceStore>,

    /// Metrics registry
    pub registry: Arc<Registry>,

    /// Fires when the daemon begins shutting down
    pub shutdown_rx: watch::Receiver<bool>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Mount the configured drivers and wire up the validation handler.
    pub fn new(config: &DaemonConfig, shutdown_rx: watch::Receiver<bool>) -> DaemonResult<Self> {
        let mut drivers: Vec<Arc<dyn Driver>> = Vec::new();
        if config.drivers.rules {
            drivers.push(Arc::new(RulesDriver::new()));
        }
        if config.drivers.script_enabled {
            drivers.push(Arc::new(ScriptDriver::new(config.drivers.script.clone())));
        }
        let client = Arc::new(PolicyClient::new(drivers));
        let expansion = Arc::new(ExpansionSystem::new());

        let registry = Arc::new(Registry::new());
        let reporter = Arc::new(PrometheusReporter::new(&registry)?);

        let namespaces = Arc::new(InMemoryNamespaceStore::new());
        let lookup = NamespaceLookup::new(namespaces.clone(), Arc::new(BareNamespaceReader));

        let handler = Arc::new(ValidationHandler::new(
            config.webhook.clone(),
            client.clone(),
            expansion.clone(),
            lookup,
            reporter,
        ));

        Ok(Self {
            handler,
            client,
            expansion,
            namespaces,
            registry,
            shutdown_rx,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        })
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let secs = (chrono::Utc::now() - self.started_at).num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}
