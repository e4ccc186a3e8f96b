//! # Driving Ports (Inbound API)
//!
//! What the routing engine offers to transports.

use async_trait::async_trait;

use crate::domain::{RegisterResponse, ResolvedEndpoint, RoutingError};

/// Primary routing API.
///
/// Arguments are raw strings; validation (`InvalidArgument`) is part of
/// the contract so every transport gets identical behavior.
#[async_trait]
pub trait RoutingApi: Send + Sync {
    /// Assign `node_id` to serve `key`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: empty key/node id or an unstorable node id
    /// - `PermissionDenied`: node is not in the authorization set
    /// - `Internal`: store failure, retries exhausted or deadline passed
    async fn register_node(&self, node_id: &str, key: &str)
        -> Result<RegisterResponse, RoutingError>;

    /// Pick the next healthy, authorized node assigned to `key`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: empty key
    /// - `NotFound`: no assignment, or an empty one
    /// - `PermissionDenied`: every assigned node is unauthorized
    /// - `Unavailable`: the selected node is not currently healthy
    /// - `Internal`: store or catalog failure, or deadline passed
    async fn resolve_node(&self, key: &str) -> Result<ResolvedEndpoint, RoutingError>;
}
