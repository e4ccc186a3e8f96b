//! Gateway domain: configuration and error mapping.

pub mod config;
pub mod error;

pub use config::{
    AdminConfig, AuthorizationConfig, BackendConfig, BackendKind, ConfigError, ConsulSection,
    GatewayConfig, HttpConfig, MemorySection, RetrySection, RoutingSection, StaticInstance,
    TelemetrySection,
};
pub use error::{status_for, ApiError, GatewayError};
