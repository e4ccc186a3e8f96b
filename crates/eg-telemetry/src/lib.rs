//! # Event-Gateway Telemetry
//!
//! Structured logging (tracing-subscriber) and Prometheus metrics.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use eg_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! let metrics = init_telemetry(&config)?;
//! metrics.record_registration("registered");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `EG_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `EG_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `EG_SERVICE_NAME` | `event-gateway` | Service name |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging};
pub use metrics::{encode_metrics, global_metrics, HttpMetrics, RoutingMetrics, REGISTRY};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Install logging and register the process-wide metrics.
pub fn init_telemetry(
    config: &TelemetryConfig,
) -> Result<&'static RoutingMetrics, TelemetryError> {
    let metrics = global_metrics()?;
    init_logging(config)?;
    Ok(metrics)
}
