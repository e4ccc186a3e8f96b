//! Gateway configuration with validation.
//!
//! Load order: defaults, then a TOML file, then environment overrides.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use eg_01_routing_engine::{NodeId, RetryPolicy, RoutingConfig, ServiceInstance};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Public HTTP server
    pub http: HttpConfig,
    /// Admin server (localhost only by default)
    pub admin: AdminConfig,
    /// Routing engine settings
    pub routing: RoutingSection,
    /// Initial authorization set
    pub authorization: AuthorizationConfig,
    /// Store and catalog backend
    pub backend: BackendConfig,
    /// Log output
    pub telemetry: TelemetrySection,
}

impl GatewayConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply `EG_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// - `EG_HTTP_PORT`: public HTTP port
    /// - `EG_CONSUL_ADDR`: Consul address
    /// - `EG_AUTHORIZED_NODES`: comma-separated authorization set
    /// - `EG_BACKEND`: `memory` or `consul`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("EG_HTTP_PORT") {
            self.http.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "EG_HTTP_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(address) = lookup("EG_CONSUL_ADDR") {
            self.backend.consul.address = address;
        }
        if let Some(nodes) = lookup("EG_AUTHORIZED_NODES") {
            self.authorization.nodes = nodes
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(kind) = lookup("EG_BACKEND") {
            self.backend.kind = kind.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "EG_BACKEND",
                value: kind.clone(),
            })?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut ports = vec![self.http.port];
        if self.admin.enabled {
            ports.push(self.admin.port);
        }
        let unique_ports: HashSet<_> = ports.iter().collect();
        if unique_ports.len() != ports.len() {
            return Err(ConfigError::DuplicatePorts);
        }

        if self.routing.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "routing.request_timeout cannot be 0".into(),
            ));
        }
        if self.http.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "http.request_timeout cannot be 0".into(),
            ));
        }

        if self.routing.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidRetry(
                "max_attempts cannot be 0".into(),
            ));
        }
        if self.routing.retry.initial_backoff > self.routing.retry.max_backoff {
            return Err(ConfigError::InvalidRetry(
                "initial_backoff cannot exceed max_backoff".into(),
            ));
        }

        if self.routing.service_name.trim().is_empty() {
            return Err(ConfigError::InvalidField(
                "routing.service_name cannot be empty".into(),
            ));
        }

        self.authorized_nodes()?;
        for instance in &self.backend.memory.instances {
            NodeId::new(instance.node_id.as_str()).map_err(|e| {
                ConfigError::InvalidField(format!("backend.memory.instances: {e}"))
            })?;
        }

        Ok(())
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    pub fn admin_addr(&self) -> SocketAddr {
        SocketAddr::new(self.admin.host, self.admin.port)
    }

    /// Engine settings derived from the `routing` section.
    pub fn routing_config(&self) -> RoutingConfig {
        RoutingConfig {
            kv_prefix: self.routing.kv_prefix.clone(),
            service_name: self.routing.service_name.clone(),
            tag_prefix: self.routing.tag_prefix.clone(),
            request_timeout: self.routing.request_timeout,
            retry: RetryPolicy {
                max_attempts: self.routing.retry.max_attempts,
                initial_backoff: self.routing.retry.initial_backoff,
                max_backoff: self.routing.retry.max_backoff,
            },
        }
    }

    /// Parsed authorization set.
    pub fn authorized_nodes(&self) -> Result<Vec<NodeId>, ConfigError> {
        self.authorization
            .nodes
            .iter()
            .map(|n| {
                NodeId::new(n.as_str())
                    .map_err(|e| ConfigError::InvalidField(format!("authorization.nodes: {e}")))
            })
            .collect()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port
    pub port: u16,
    /// Upper bound on a whole request, including engine deadlines
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Maximum request body in bytes
    pub max_body_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 50051,
            request_timeout: Duration::from_secs(10),
            max_body_size: 64 * 1024,
        }
    }
}

/// Admin server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub enabled: bool,
    /// Bind address (default: localhost only)
    pub host: IpAddr,
    pub port: u16,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
        }
    }
}

/// Routing engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSection {
    /// Store key prefix for assignments
    pub kv_prefix: String,
    /// Catalog service the worker nodes register under
    pub service_name: String,
    /// Catalog tag prefix for chain lookups
    pub tag_prefix: String,
    /// Default deadline for one engine call
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub retry: RetrySection,
}

impl Default for RoutingSection {
    fn default() -> Self {
        let defaults = RoutingConfig::default();
        Self {
            kv_prefix: defaults.kv_prefix,
            service_name: defaults.service_name,
            tag_prefix: defaults.tag_prefix,
            request_timeout: defaults.request_timeout,
            retry: RetrySection::default(),
        }
    }
}

/// Conditional-write retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl Default for RetrySection {
    fn default() -> Self {
        let defaults = RetryPolicy::default();
        Self {
            max_attempts: defaults.max_attempts,
            initial_backoff: defaults.initial_backoff,
            max_backoff: defaults.max_backoff,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    pub nodes: Vec<String>,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            nodes: vec!["node1".into(), "node2".into(), "node3".into()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    #[default]
    Consul,
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "consul" => Ok(Self::Consul),
            other => Err(ConfigError::InvalidField(format!(
                "unknown backend {other:?} (expected memory or consul)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub consul: ConsulSection,
    pub memory: MemorySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsulSection {
    /// `host:port` or `http(s)://` URL
    pub address: String,
    /// ACL token
    pub token: Option<String>,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ConsulSection {
    fn default() -> Self {
        Self {
            address: "localhost:8500".to_string(),
            token: None,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Seed data for the in-memory catalog (standalone mode).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    pub instances: Vec<StaticInstance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticInstance {
    pub node_id: String,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl StaticInstance {
    pub fn to_instance(&self) -> ServiceInstance {
        self.tags.iter().fold(
            ServiceInstance::new(self.node_id.as_str(), self.address.as_str(), self.port),
            |instance, tag| instance.with_tag(tag.as_str()),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySection {
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("duplicate ports in configuration")]
    DuplicatePorts,

    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("invalid retry policy: {0}")]
    InvalidRetry(String),

    #[error("invalid value: {0}")]
    InvalidField(String),

    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Humantime-style durations: "5s", "200ms", "2m", or bare seconds.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Largest unit that represents `duration` exactly.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let nanos = duration.subsec_nanos();
        let text = if nanos == 0 {
            format!("{}s", duration.as_secs())
        } else if nanos % 1_000_000 == 0 {
            format!("{}ms", duration.as_millis())
        } else if nanos % 1_000 == 0 {
            format!("{}us", duration.as_micros())
        } else {
            format!("{}ns", duration.as_nanos())
        };
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    type Unit = fn(u64) -> Option<Duration>;

    fn secs(n: u64) -> Option<Duration> {
        Some(Duration::from_secs(n))
    }

    // Two-letter suffixes first: "ms" also ends in 's'.
    const UNITS: [(&str, Unit); 6] = [
        ("ns", |n| Some(Duration::from_nanos(n))),
        ("us", |n| Some(Duration::from_micros(n))),
        ("ms", |n| Some(Duration::from_millis(n))),
        ("s", secs),
        ("m", |n| n.checked_mul(60).map(Duration::from_secs)),
        ("h", |n| n.checked_mul(3600).map(Duration::from_secs)),
    ];

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        let (number, unit): (&str, Unit) = UNITS
            .iter()
            .find_map(|(suffix, unit)| s.strip_suffix(*suffix).map(|n| (n, *unit)))
            .unwrap_or((s, secs));
        let value = number
            .trim()
            .parse::<u64>()
            .map_err(|_| "invalid duration format")?;
        unit(value).ok_or("duration out of range")
    }
}
