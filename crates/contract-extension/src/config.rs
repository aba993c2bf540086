//! Extension service configuration from environment variables.

use std::env;
use std::path::PathBuf;

use shared_bus::{LogBus, DEFAULT_CHANNEL_CAPACITY};

use crate::domain::{ExtensionError, ExtensionResult};

/// Default registry file name inside the data directory.
pub const DEFAULT_REGISTRY_FILE: &str = "activeExtensions.json";

/// Configuration for the contract extension service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionConfig {
    /// Node data directory holding the registry file
    pub data_dir: PathBuf,

    /// Registry file name, relative to `data_dir`
    pub registry_file: String,

    /// Upper bound on waiting for watchers to exit on stop
    pub shutdown_timeout_secs: u64,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Per-subscriber log buffer of the ledger log bus
    pub log_channel_capacity: usize,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            registry_file: DEFAULT_REGISTRY_FILE.to_string(),
            shutdown_timeout_secs: 5,
            log_level: "info".to_string(),
            json_logs: false,
            log_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ExtensionConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `EXT_DATA_DIR`: Data directory (default: .)
    /// - `EXT_REGISTRY_FILE`: Registry file name (default: activeExtensions.json)
    /// - `EXT_SHUTDOWN_TIMEOUT_SECS`: Stop timeout (default: 5)
    /// - `EXT_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `EXT_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `EXT_LOG_CHANNEL_CAPACITY`: Log bus buffer (default: 1000)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            data_dir: lookup("EXT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),

            registry_file: lookup("EXT_REGISTRY_FILE").unwrap_or(defaults.registry_file),

            shutdown_timeout_secs: lookup("EXT_SHUTDOWN_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.shutdown_timeout_secs),

            log_level: lookup("EXT_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            json_logs: lookup("EXT_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            log_channel_capacity: lookup("EXT_LOG_CHANNEL_CAPACITY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_channel_capacity),
        }
    }

    /// Full path of the registry file.
    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join(&self.registry_file)
    }

    /// Log bus sized for this configuration, for the ledger client adapter.
    pub fn log_bus(&self) -> LogBus {
        LogBus::with_capacity(self.log_channel_capacity)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> ExtensionResult<()> {
        if self.registry_file.trim().is_empty() {
            return Err(ExtensionError::Config("registry file name is empty".into()));
        }
        if self.registry_file.contains(['/', '\\']) {
            return Err(ExtensionError::Config(format!(
                "registry file must be a plain file name, got {}",
                self.registry_file
            )));
        }
        if self.shutdown_timeout_secs == 0 {
            return Err(ExtensionError::Config("shutdown timeout must be positive".into()));
        }
        if self.log_channel_capacity == 0 {
            return Err(ExtensionError::Config("log channel capacity must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ExtensionConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ExtensionConfig::default());
        assert_eq!(config.registry_path(), PathBuf::from("./activeExtensions.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = ExtensionConfig::from_lookup(lookup(&[
            ("EXT_DATA_DIR", "/var/lib/node"),
            ("EXT_SHUTDOWN_TIMEOUT_SECS", "30"),
            ("RUST_LOG", "debug"),
            ("EXT_JSON_LOGS", "1"),
        ]));

        assert_eq!(config.registry_path(), PathBuf::from("/var/lib/node/activeExtensions.json"));
        assert_eq!(config.shutdown_timeout_secs, 30);
        assert_eq!(config.log_level, "debug");
        assert!(config.json_logs);
    }

    #[test]
    fn test_log_bus_uses_configured_capacity() {
        let config = ExtensionConfig::from_lookup(lookup(&[("EXT_LOG_CHANNEL_CAPACITY", "64")]));
        assert_eq!(config.log_bus().capacity(), 64);
    }

    #[test]
    fn test_container_defaults_to_json() {
        let config = ExtensionConfig::from_lookup(lookup(&[("DOCKER_CONTAINER", "1")]));
        assert!(config.json_logs);
    }

    #[test]
    fn test_unparsable_number_falls_back() {
        let config =
            ExtensionConfig::from_lookup(lookup(&[("EXT_SHUTDOWN_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.shutdown_timeout_secs, 5);
    }

    #[test]
    fn test_validate_rejects_path_in_file_name() {
        let config = ExtensionConfig {
            registry_file: "../escape.json".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ExtensionError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ExtensionConfig {
            shutdown_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
