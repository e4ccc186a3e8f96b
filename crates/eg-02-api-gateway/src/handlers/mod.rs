//! Request handlers.
//!
//! - `routing`: public RegisterNode / ResolveNode / chain lookup
//! - `admin`: authorization set and counters (admin router only)

pub mod admin;
pub mod routing;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use eg_01_routing_engine::{CatalogRouter, ErrorCode, RoutingEngine, RoutingError};
use eg_telemetry::RoutingMetrics;

use crate::domain::ApiError;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RoutingEngine>,
    pub catalog_router: Arc<CatalogRouter>,
    pub telemetry: RoutingMetrics,
}

impl AppState {
    pub fn new(
        engine: Arc<RoutingEngine>,
        catalog_router: Arc<CatalogRouter>,
        telemetry: RoutingMetrics,
    ) -> Self {
        Self {
            engine,
            catalog_router,
            telemetry,
        }
    }

    /// Copy engine-side counters into the Prometheus gauges.
    pub fn sync_engine_metrics(&self) {
        let snapshot = self.engine.stats().snapshot();
        self.telemetry.observe_cas_conflicts(snapshot.cas_conflicts);
        self.telemetry
            .authorized_nodes
            .set(self.engine.authorization().len() as i64);
        self.telemetry
            .tracked_keys
            .set(self.engine.selector().tracked_keys() as i64);
    }
}

/// Metric label for a failed engine call.
pub(crate) fn outcome_label(err: &RoutingError) -> &'static str {
    match err.code() {
        ErrorCode::InvalidArgument => "invalid_argument",
        ErrorCode::PermissionDenied => "permission_denied",
        ErrorCode::NotFound => "not_found",
        ErrorCode::Unavailable => "unavailable",
        ErrorCode::Internal => "error",
    }
}

/// Error for an unusable JSON body: 413 when over the size limit, otherwise
/// 400 like every other invalid argument.
pub(crate) fn rejection_error(rejection: JsonRejection) -> ApiError {
    let mut err = ApiError::invalid_argument(rejection.body_text());
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        err.status = StatusCode::PAYLOAD_TOO_LARGE;
    }
    err
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Prometheus text exposition of the gateway's registry.
pub async fn metrics(State(state): State<AppState>) -> Response {
    state.sync_engine_metrics();
    match state.telemetry.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
