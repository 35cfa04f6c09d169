//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Warden daemon server
pub struct Server {
    config: DaemonConfig,
    state: AppState,
    shutdown_tx: watch::Sender<bool>,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = AppState::new(&config, shutdown_rx)?;

        Ok(Self {
            config,
            state,
            shutdown_tx,
        })
    }

    /// Shared state, for seeding policy before the server starts
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let app = create_router(self.state.clone(), &self.config.server);

        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Warden daemon listening on {}", addr);
        tracing::info!(
            serving_threads = self.state.handler.gate().limit(),
            drivers = ?self.state.client.drivers().iter().map(|d| d.engine()).collect::<Vec<_>>(),
            "Admission review ready"
        );

        // Requests still queued for a serving slot abort once shutdown begins.
        let shutdown_tx = self.shutdown_tx;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                shutdown_tx.send_replace(true);
            })
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Warden daemon shutting down");
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
