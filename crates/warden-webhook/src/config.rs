//! Webhook configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use warden_types::namespace_matches;

/// Settings passed to the validation handler at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Cap on requests evaluated at once. Zero or negative means the
    /// number of available CPUs.
    #[serde(default = "default_max_serving_threads")]
    pub max_serving_threads: i64,

    /// Username warden itself acts as; its requests are never reviewed
    #[serde(default = "default_system_username")]
    pub system_username: String,

    /// Namespaces whose requests are always allowed. A trailing `*` matches
    /// by prefix.
    #[serde(default)]
    pub exempt_namespaces: Vec<String>,

    /// Log every counted violation
    #[serde(default)]
    pub log_denies: bool,

    /// Accept any enforcement action string on constraints
    #[serde(default)]
    pub disable_enforcement_action_validation: bool,

    /// Per-request deadline in seconds, zero for none
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            max_serving_threads: default_max_serving_threads(),
            system_username: default_system_username(),
            exempt_namespaces: Vec::new(),
            log_denies: false,
            disable_enforcement_action_validation: false,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_max_serving_threads() -> i64 {
    -1
}

fn default_system_username() -> String {
    "system:serviceaccount:warden-system:warden-admin".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl WebhookConfig {
    /// Effective size of the concurrency gate.
    pub fn serving_threads(&self) -> usize {
        match usize::try_from(self.max_serving_threads) {
            Ok(n) if n > 0 => n,
            _ => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }

    pub fn is_exempt(&self, namespace: &str) -> bool {
        !namespace.is_empty()
            && self
                .exempt_namespaces
                .iter()
                .any(|pattern| namespace_matches(pattern, namespace))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_thread_cap_uses_parallelism() {
        let mut config = WebhookConfig::default();
        assert!(config.serving_threads() >= 1);
        config.max_serving_threads = 0;
        assert!(config.serving_threads() >= 1);
        config.max_serving_threads = 3;
        assert_eq!(config.serving_threads(), 3);
    }

    #[test]
    fn exemptions_support_prefixes() {
        let config = WebhookConfig {
            exempt_namespaces: vec!["kube-system".into(), "team-*".into()],
            ..Default::default()
        };
        assert!(config.is_exempt("kube-system"));
        assert!(config.is_exempt("team-a"));
        assert!(!config.is_exempt("kube-public"));
        assert!(!config.is_exempt(""));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: WebhookConfig = serde_json::from_str(r#"{"log_denies": true}"#).unwrap();
        assert!(config.log_denies);
        assert_eq!(config.max_serving_threads, -1);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(10)));
    }
}
