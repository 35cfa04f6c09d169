//! Configuration for wardend

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use warden_driver::ScriptConfig;
use warden_webhook::WebhookConfig;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Admission review settings
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Policy backends to mount
    #[serde(default)]
    pub drivers: DriversConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
            max_body_size: default_max_body_size(),
        }
    }
}

/// Mounted policy backends, queried in the order listed here
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriversConfig {
    /// Mount the native rules engine
    #[serde(default = "default_true")]
    pub rules: bool,

    /// Mount the external script engine
    #[serde(default = "default_true")]
    pub script_enabled: bool,

    /// Script engine settings
    #[serde(default)]
    pub script: ScriptConfig,
}

impl Default for DriversConfig {
    fn default() -> Self {
        Self {
            rules: true,
            script_enabled: true,
            script: ScriptConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 8443))
}

fn default_max_body_size() -> usize {
    4 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `WARDEN_`-prefixed environment variables (`__` between sections).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("WARDEN")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("webhook.exempt_namespaces")
                .with_list_parse_key("drivers.script.args")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8443);
        assert!(config.drivers.rules);
        assert!(config.drivers.script_enabled);
        assert_eq!(config.webhook.max_serving_threads, -1);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = DaemonConfig::load(None).unwrap();
        assert_eq!(config.server.max_body_size, 4 * 1024 * 1024);
        assert_eq!(config.drivers.script.interpreter, "python3");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wardend.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
listen_addr = "0.0.0.0:9443"

[webhook]
max_serving_threads = 4
exempt_namespaces = ["kube-system", "team-*"]
log_denies = true

[drivers]
script_enabled = false

[drivers.script]
interpreter = "sh"
timeout_ms = 500
"#
        )
        .unwrap();

        let config = DaemonConfig::load(path.to_str()).unwrap();
        assert_eq!(config.server.listen_addr.port(), 9443);
        assert_eq!(config.webhook.serving_threads(), 4);
        assert!(config.webhook.is_exempt("team-a"));
        assert!(config.webhook.log_denies);
        assert!(!config.drivers.script_enabled);
        assert_eq!(config.drivers.script.interpreter, "sh");
        assert_eq!(config.drivers.script.args, vec!["-c"]);
        // Untouched sections keep their defaults.
        assert!(config.server.enable_cors);
    }
}
