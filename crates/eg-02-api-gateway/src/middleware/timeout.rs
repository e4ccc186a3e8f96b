//! Whole-request timeout.
//!
//! Requests still running after the configured duration are dropped and
//! answered with a 504 in the gateway's error shape.

use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use eg_telemetry::HttpMetrics;
use tokio::time::timeout;
use tower::{Layer, Service};
use tracing::warn;

use crate::domain::ApiError;

/// Timeout layer
#[derive(Clone)]
pub struct TimeoutLayer {
    duration: Duration,
    metrics: Option<HttpMetrics>,
}

impl TimeoutLayer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: HttpMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            duration: self.duration,
            metrics: self.metrics.clone(),
        }
    }
}

/// Timeout service
#[derive(Clone)]
pub struct TimeoutService<S> {
    inner: S,
    duration: Duration,
    metrics: Option<HttpMetrics>,
}

impl<S> Service<Request<Body>> for TimeoutService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let duration = self.duration;
        let metrics = self.metrics.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = req.uri().path().to_string();
            match timeout(duration, inner.call(req)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout_ms = duration.as_millis() as u64, %path, "Request timed out");
                    if let Some(metrics) = &metrics {
                        metrics.record_timeout();
                    }
                    Ok(timeout_response(duration))
                }
            }
        })
    }
}

fn timeout_response(duration: Duration) -> Response {
    ApiError::timeout(format!(
        "request exceeded {}ms timeout",
        duration.as_millis()
    ))
    .into_response()
}
