//! Public routing endpoints.
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | POST | `/v1/register` | `{success, message, status, total_nodes}` |
//! | GET | `/v1/nodes/:data_id` | `{node_id, node_address}` |
//! | GET | `/v1/chains/:chain/node` | `{available, node_id?, node_address?}` |

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use eg_01_routing_engine::{CatalogResolution, RegisterResponse, ResolvedEndpoint, RoutingApi};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{outcome_label, rejection_error, AppState};
use crate::domain::ApiError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisterNodeRequest {
    pub node_id: String,
    pub data_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegisterNodeResponse {
    pub success: bool,
    pub message: String,
    pub status: String,
    pub total_nodes: usize,
}

impl From<RegisterResponse> for RegisterNodeResponse {
    fn from(response: RegisterResponse) -> Self {
        Self {
            success: response.success,
            message: response.message,
            status: response.status.as_str().to_string(),
            total_nodes: response.total_nodes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResolveNodeResponse {
    pub node_id: String,
    pub node_address: String,
}

impl From<ResolvedEndpoint> for ResolveNodeResponse {
    fn from(endpoint: ResolvedEndpoint) -> Self {
        Self {
            node_id: endpoint.node_id.to_string(),
            node_address: endpoint.address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChainNodeResponse {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_address: Option<String>,
}

pub async fn register_node(
    State(state): State<AppState>,
    payload: Result<Json<RegisterNodeRequest>, JsonRejection>,
) -> Result<Json<RegisterNodeResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        state.telemetry.record_registration("invalid_argument");
        rejection_error(rejection)
    })?;

    match state
        .engine
        .register_node(&request.node_id, &request.data_id)
        .await
    {
        Ok(response) => {
            state.telemetry.record_registration(response.status.as_str());
            Ok(Json(response.into()))
        }
        Err(err) => {
            state.telemetry.record_registration(outcome_label(&err));
            Err(err.into())
        }
    }
}

pub async fn resolve_node(
    State(state): State<AppState>,
    Path(data_id): Path<String>,
) -> Result<Json<ResolveNodeResponse>, ApiError> {
    match state.engine.resolve_node(&data_id).await {
        Ok(endpoint) => {
            state.telemetry.record_resolution("resolved");
            Ok(Json(endpoint.into()))
        }
        Err(err) => {
            state.telemetry.record_resolution(outcome_label(&err));
            Err(err.into())
        }
    }
}

pub async fn resolve_chain_node(
    State(state): State<AppState>,
    Path(chain): Path<String>,
) -> Result<Json<ChainNodeResponse>, ApiError> {
    match state.catalog_router.resolve_by_tag(&chain).await {
        Ok(CatalogResolution::Resolved(endpoint)) => {
            state.telemetry.record_resolution("resolved");
            Ok(Json(ChainNodeResponse {
                available: true,
                node_id: Some(endpoint.node_id.to_string()),
                node_address: Some(endpoint.address),
            }))
        }
        Ok(CatalogResolution::NoNodesAvailable) => {
            debug!(%chain, "no nodes available for chain");
            state.telemetry.record_resolution("no_nodes");
            Ok(Json(ChainNodeResponse {
                available: false,
                node_id: None,
                node_address: None,
            }))
        }
        Err(err) => {
            state.telemetry.record_resolution(outcome_label(&err));
            Err(err.into())
        }
    }
}
