//! HTTP error mapping.
//!
//! Every error response has the shape
//! `{"error": {"code": <http status>, "kind": "...", "message": "...", "reason": "..."}}`
//! where `reason` is present only for internal errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use eg_01_routing_engine::{ErrorCode, InternalReason, RoutingError};
use serde::Serialize;
use thiserror::Error;

/// Error kind used for transport-level failures with no engine counterpart.
pub mod kinds {
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const NOT_FOUND: &str = "NOT_FOUND";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
    pub reason: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: u16,
    kind: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
            reason: None,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorCode::InvalidArgument.as_str(),
            message,
        )
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, kinds::TIMEOUT, message)
    }

    pub fn route_not_found(path: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            kinds::NOT_FOUND,
            format!("no route for {path}"),
        )
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.body()).unwrap_or(serde_json::Value::Null)
    }

    fn body(&self) -> ErrorBody<'_> {
        ErrorBody {
            error: ErrorDetail {
                code: self.status.as_u16(),
                kind: self.kind,
                message: &self.message,
                reason: self.reason,
            },
        }
    }
}

/// HTTP status for an engine error.
pub fn status_for(err: &RoutingError) -> StatusCode {
    match err.code() {
        ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::Internal if err.reason() == Some(InternalReason::DeadlineExceeded) => {
            StatusCode::GATEWAY_TIMEOUT
        }
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<RoutingError> for ApiError {
    fn from(err: RoutingError) -> Self {
        Self {
            status: status_for(&err),
            kind: err.code().as_str(),
            message: err.to_string(),
            reason: err.reason().map(InternalReason::as_str),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

/// Gateway-level errors
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    /// Server socket bind error
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: std::net::SocketAddr, reason: String },

    /// Server I/O error
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
