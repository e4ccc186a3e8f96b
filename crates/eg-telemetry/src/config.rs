//! Telemetry configuration from environment variables.

use std::env;

/// Logging settings for the gateway process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "event-gateway".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Defaults overridden by the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `EG_SERVICE_NAME`: Service name (default: event-gateway)
    /// - `EG_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `EG_JSON_LOGS`: JSON logs (default: true inside containers)
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok() {
            config.json_logs = true;
        }
        config.apply_env()
    }

    /// Apply environment overrides on top of `self`.
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|name| env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("EG_SERVICE_NAME") {
            self.service_name = name;
        }
        if let Some(level) = lookup("EG_LOG_LEVEL").or_else(|| lookup("RUST_LOG")) {
            self.log_level = level;
        }
        if let Some(json) = lookup("EG_JSON_LOGS") {
            self.json_logs = matches!(json.to_lowercase().as_str(), "true" | "1" | "yes");
        }
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}
