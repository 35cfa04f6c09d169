//! Warden Daemon - admission policy gateway
//!
//! The warden daemon provides:
//! - An admission decision endpoint with generator expansion
//! - REST API for policy, expansion and namespace lifecycle
//! - Prometheus metrics for every decision

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_daemon::{DaemonConfig, DaemonError, DaemonResult, Server};

/// Warden Daemon CLI
#[derive(Parser)]
#[command(name = "wardend")]
#[command(about = "Warden Daemon - admission policy gateway", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "WARDEN_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, env = "WARDEN_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level
    #[arg(long, env = "WARDEN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "WARDEN_LOG_JSON")]
    json: bool,

    /// Concurrent reviews; below one means one per CPU
    #[arg(long)]
    max_serving_threads: Option<i64>,

    /// Namespace to exempt from review (repeatable, trailing `*` allowed)
    #[arg(long = "exempt-namespace")]
    exempt_namespaces: Vec<String>,

    /// Log every denying or warning result
    #[arg(long)]
    log_denies: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.json = true;
    }
    if let Some(threads) = cli.max_serving_threads {
        config.webhook.max_serving_threads = threads;
    }
    config.webhook.exempt_namespaces.extend(cli.exempt_namespaces);
    if cli.log_denies {
        config.webhook.log_denies = true;
    }

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        "Starting warden daemon"
    );

    // Create and run server
    let server = Server::new(config)?;
    server.run().await
}
