//! Admin endpoints. Served only on the admin listener.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use eg_01_routing_engine::NodeId;
use eg_telemetry::HttpMetrics;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{rejection_error, AppState};
use crate::domain::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthorizationSet {
    pub nodes: Vec<String>,
}

pub async fn get_authorization(State(state): State<AppState>) -> Json<AuthorizationSet> {
    let nodes = state
        .engine
        .authorization()
        .authorized_nodes()
        .into_iter()
        .map(|n| n.to_string())
        .collect();
    Json(AuthorizationSet { nodes })
}

/// Replace the authorization set. Every id is validated before anything
/// changes.
pub async fn put_authorization(
    State(state): State<AppState>,
    payload: Result<Json<AuthorizationSet>, JsonRejection>,
) -> Result<Json<AuthorizationSet>, ApiError> {
    let Json(request) = payload.map_err(rejection_error)?;

    let nodes = request
        .nodes
        .iter()
        .map(|n| NodeId::new(n.as_str()))
        .collect::<Result<Vec<_>, _>>()?;

    let guard = state.engine.authorization();
    let count = guard.reload(nodes);
    state.telemetry.authorized_nodes.set(count as i64);
    info!(authorized_nodes = count, "authorization set reloaded");

    Ok(get_authorization(State(state)).await)
}

pub async fn stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    let engine = state.engine.stats().snapshot();
    Json(serde_json::json!({
        "engine": {
            "registrations": engine.registrations,
            "duplicate_registrations": engine.duplicate_registrations,
            "rejected_registrations": engine.rejected_registrations,
            "resolutions": engine.resolutions,
            "failed_resolutions": engine.failed_resolutions,
            "cas_conflicts": engine.cas_conflicts,
            "tracked_keys": state.engine.selector().tracked_keys(),
            "authorized_nodes": state.engine.authorization().len(),
        },
        "gateway": http_stats(&state.telemetry.http),
    }))
}

fn http_stats(http: &HttpMetrics) -> serde_json::Value {
    serde_json::json!({
        "requests": {
            "total": http.requests_total(),
            "success": http.requests_with_result("success"),
            "error": http.requests_with_result("error"),
            "writes": http.write_requests.get(),
            "timed_out": http.timeouts.get(),
        },
        "latency": {
            "average_ms": http.average_latency_ms(),
        }
    })
}
