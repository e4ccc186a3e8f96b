//! Prometheus metrics for the routing gateway.
//!
//! All metrics follow the naming convention `eg_<metric>[_total]`.
//!
//! - `eg_registrations_total{outcome}`: RegisterNode results
//! - `eg_resolutions_total{outcome}`: ResolveNode / tag lookup results
//! - `eg_cas_conflicts_total`: conditional writes that lost a race
//! - `eg_authorized_nodes`: size of the authorization set
//! - `eg_tracked_keys`: routing keys with a selection counter
//! - `eg_http_requests_total{result}`: finished HTTP requests, `success` or `error` (5xx)
//! - `eg_http_write_requests_total`: HTTP requests other than GET/HEAD
//! - `eg_http_requests_timed_out_total`: requests cut off by the gateway timeout
//! - `eg_http_request_duration_seconds`: HTTP request latency

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge,
    Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Process-wide registry served on `/metrics`
    pub static ref REGISTRY: Registry = Registry::new();

    static ref GLOBAL: Result<RoutingMetrics, String> =
        RoutingMetrics::register(&REGISTRY).map_err(|e| e.to_string());
}

/// Metric handles for one registry.
#[derive(Clone)]
pub struct RoutingMetrics {
    registry: Registry,
    pub registrations: IntCounterVec,
    pub resolutions: IntCounterVec,
    pub cas_conflicts: IntCounter,
    pub authorized_nodes: IntGauge,
    pub tracked_keys: IntGauge,
    pub http: HttpMetrics,
    synced_conflicts: std::sync::Arc<AtomicU64>,
}

impl RoutingMetrics {
    /// Create the metric set and register it with `registry`.
    pub fn register(registry: &Registry) -> Result<Self, TelemetryError> {
        let registrations = IntCounterVec::new(
            Opts::new("eg_registrations_total", "RegisterNode requests by outcome"),
            &["outcome"],
        )
        .map_err(metrics_err)?;
        let resolutions = IntCounterVec::new(
            Opts::new("eg_resolutions_total", "Node resolutions by outcome"),
            &["outcome"],
        )
        .map_err(metrics_err)?;
        let cas_conflicts = IntCounter::new(
            "eg_cas_conflicts_total",
            "Conditional assignment writes rejected by the store",
        )
        .map_err(metrics_err)?;
        let authorized_nodes =
            IntGauge::new("eg_authorized_nodes", "Nodes in the authorization set")
                .map_err(metrics_err)?;
        let tracked_keys = IntGauge::new(
            "eg_tracked_keys",
            "Routing keys with a round-robin counter",
        )
        .map_err(metrics_err)?;
        let http = HttpMetrics::new()?;

        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(registrations.clone()),
            Box::new(resolutions.clone()),
            Box::new(cas_conflicts.clone()),
            Box::new(authorized_nodes.clone()),
            Box::new(tracked_keys.clone()),
            Box::new(http.requests.clone()),
            Box::new(http.write_requests.clone()),
            Box::new(http.timeouts.clone()),
            Box::new(http.duration.clone()),
        ];
        for collector in collectors {
            registry.register(collector).map_err(metrics_err)?;
        }

        Ok(Self {
            registry: registry.clone(),
            registrations,
            resolutions,
            cas_conflicts,
            authorized_nodes,
            tracked_keys,
            http,
            synced_conflicts: std::sync::Arc::new(AtomicU64::new(0)),
        })
    }

    /// Metric set on a fresh private registry.
    pub fn standalone() -> Result<Self, TelemetryError> {
        Self::register(&Registry::new())
    }

    pub fn record_registration(&self, outcome: &str) {
        self.registrations.with_label_values(&[outcome]).inc();
    }

    pub fn record_resolution(&self, outcome: &str) {
        self.resolutions.with_label_values(&[outcome]).inc();
    }

    /// Advance `eg_cas_conflicts_total` to a cumulative count kept
    /// elsewhere. Concurrent callers never double count.
    pub fn observe_cas_conflicts(&self, total: u64) {
        let previous = self.synced_conflicts.fetch_max(total, Ordering::AcqRel);
        if total > previous {
            self.cas_conflicts.inc_by(total - previous);
        }
    }

    /// Render this registry in the Prometheus text format.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        encode_registry(&self.registry)
    }
}

/// Request metrics for the HTTP surface.
#[derive(Clone)]
pub struct HttpMetrics {
    pub requests: IntCounterVec,
    pub write_requests: IntCounter,
    pub timeouts: IntCounter,
    pub duration: Histogram,
}

impl HttpMetrics {
    fn new() -> Result<Self, TelemetryError> {
        let requests = IntCounterVec::new(
            Opts::new("eg_http_requests_total", "Finished HTTP requests by result"),
            &["result"],
        )
        .map_err(metrics_err)?;
        let write_requests = IntCounter::new(
            "eg_http_write_requests_total",
            "HTTP requests that may mutate state",
        )
        .map_err(metrics_err)?;
        let timeouts = IntCounter::new(
            "eg_http_requests_timed_out_total",
            "HTTP requests cut off by the gateway timeout",
        )
        .map_err(metrics_err)?;
        // 0.5ms .. ~4s
        let buckets = exponential_buckets(0.0005, 2.0, 14).map_err(metrics_err)?;
        let duration = Histogram::with_opts(
            HistogramOpts::new("eg_http_request_duration_seconds", "HTTP request latency")
                .buckets(buckets),
        )
        .map_err(metrics_err)?;

        Ok(Self {
            requests,
            write_requests,
            timeouts,
            duration,
        })
    }

    /// Record a finished request. Only 5xx answers count as errors.
    pub fn record_request(&self, success: bool, is_write: bool, elapsed: Duration) {
        let result = if success { "success" } else { "error" };
        self.requests.with_label_values(&[result]).inc();
        if is_write {
            self.write_requests.inc();
        }
        self.duration.observe(elapsed.as_secs_f64());
    }

    pub fn record_timeout(&self) {
        self.timeouts.inc();
    }

    pub fn requests_with_result(&self, result: &str) -> u64 {
        self.requests.with_label_values(&[result]).get()
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_with_result("success") + self.requests_with_result("error")
    }

    pub fn average_latency_ms(&self) -> f64 {
        let count = self.duration.get_sample_count();
        if count == 0 {
            0.0
        } else {
            self.duration.get_sample_sum() * 1000.0 / count as f64
        }
    }
}

/// The process-wide metric set on [`REGISTRY`], created on first use.
pub fn global_metrics() -> Result<&'static RoutingMetrics, TelemetryError> {
    GLOBAL
        .as_ref()
        .map_err(|e| TelemetryError::MetricsInit(e.clone()))
}

/// Encode all metrics in the process-wide registry.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    encode_registry(&REGISTRY)
}

fn encode_registry(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(metrics_err)?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

fn metrics_err(e: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsInit(e.to_string())
}
