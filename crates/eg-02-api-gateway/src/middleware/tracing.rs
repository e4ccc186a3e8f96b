//! Request tracing middleware.
//!
//! Every request runs inside an `api_request` span tagged with a request
//! id. The id is taken from an incoming `x-request-id` header when present,
//! otherwise generated, and echoed back on the response.

use std::task::{Context, Poll};
use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Method, Request},
    response::Response,
};
use tower::{Layer, Service};
use eg_telemetry::HttpMetrics;
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tracing layer that creates spans for each request
#[derive(Clone, Default)]
pub struct TracingLayer {
    metrics: Option<HttpMetrics>,
}

impl TracingLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also record each request in `metrics`.
    pub fn with_metrics(metrics: HttpMetrics) -> Self {
        Self {
            metrics: Some(metrics),
        }
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

/// Tracing service
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
    metrics: Option<HttpMetrics>,
}

impl<S> Service<Request<Body>> for TracingService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let metrics = self.metrics.clone();

        let request_id = request_id(&req);
        let method = req.method().clone();
        let is_write = method != Method::GET && method != Method::HEAD;

        let span = info_span!(
            "api_request",
            request.id = %request_id,
            http.method = %method,
            http.target = %req.uri().path(),
            http.status_code = tracing::field::Empty,
        );

        Box::pin(
            async move {
                let started = Instant::now();
                let result = inner.call(req).await;
                let elapsed = started.elapsed();
                let latency_ms = elapsed.as_millis() as u64;

                match result {
                    Ok(mut response) => {
                        let status = response.status();
                        Span::current().record("http.status_code", status.as_u16());
                        if let Some(metrics) = &metrics {
                            metrics.record_request(!status.is_server_error(), is_write, elapsed);
                        }
                        if let Ok(value) = HeaderValue::from_str(&request_id) {
                            response.headers_mut().insert(REQUEST_ID_HEADER, value);
                        }
                        tracing::debug!(status = status.as_u16(), latency_ms, "request finished");
                        Ok(response)
                    }
                    Err(err) => {
                        if let Some(metrics) = &metrics {
                            metrics.record_request(false, is_write, elapsed);
                        }
                        Err(err)
                    }
                }
            }
            .instrument(span),
        )
    }
}

/// Incoming request id, or a fresh one.
fn request_id<B>(req: &Request<B>) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
