//! # Routing Engine
//!
//! Wires the authorization guard, the assignment store, the round-robin
//! selector and the health catalog into the two core operations.
//!
//! ## RegisterNode
//!
//! validate -> authorize -> conditional append -> ensure selection counter
//!
//! ## ResolveNode
//!
//! validate -> read assignment -> filter authorized -> select -> confirm
//! the selected node is healthy -> endpoint
//!
//! Liveness is checked only for the selected node. An unhealthy pick is
//! reported as `Unavailable`; callers retry and the counter has already
//! moved on to the next candidate.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::assignment_store::AssignmentStore;
use super::config::RoutingConfig;
use super::deadline::within;
use super::stats::RoutingStats;
use crate::domain::{
    AuthorizationGuard, InternalReason, NodeId, RegisterResponse, ResolvedEndpoint,
    RoundRobinSelector, RoutingError, RoutingKey,
};
use crate::ports::{KeyValueStore, RoutingApi, ServiceCatalog};

pub struct RoutingEngine {
    guard: Arc<AuthorizationGuard>,
    store: AssignmentStore,
    selector: RoundRobinSelector,
    catalog: Arc<dyn ServiceCatalog>,
    config: RoutingConfig,
    stats: Arc<RoutingStats>,
}

impl RoutingEngine {
    pub fn new(
        config: RoutingConfig,
        guard: Arc<AuthorizationGuard>,
        kv: Arc<dyn KeyValueStore>,
        catalog: Arc<dyn ServiceCatalog>,
    ) -> Self {
        let stats = Arc::new(RoutingStats::default());
        let store = AssignmentStore::new(
            kv,
            config.kv_prefix.clone(),
            config.retry,
            Arc::clone(&stats),
        );
        Self {
            guard,
            store,
            selector: RoundRobinSelector::new(),
            catalog,
            config,
            stats,
        }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub fn authorization(&self) -> &Arc<AuthorizationGuard> {
        &self.guard
    }

    pub fn selector(&self) -> &RoundRobinSelector {
        &self.selector
    }

    pub fn stats(&self) -> &Arc<RoutingStats> {
        &self.stats
    }

    fn default_deadline(&self) -> Instant {
        Instant::now() + self.config.request_timeout
    }

    /// `RegisterNode` bounded by an explicit deadline.
    #[instrument(skip_all, fields(node_id = %node_id, key = %key))]
    pub async fn register_node_until(
        &self,
        node_id: &str,
        key: &str,
        deadline: Instant,
    ) -> Result<RegisterResponse, RoutingError> {
        let key = RoutingKey::new(key)?;
        let node = NodeId::new(node_id)?;

        if !self.guard.is_authorized(&node) {
            RoutingStats::bump(&self.stats.rejected_registrations);
            warn!("registration rejected: node not authorized");
            return Err(RoutingError::PermissionDenied {
                node_id: node.to_string(),
            });
        }

        let outcome = self.store.append_if_absent(&key, &node, deadline).await?;
        self.selector.ensure(&key);

        let total = outcome.nodes.len();
        if outcome.already_present {
            RoutingStats::bump(&self.stats.duplicate_registrations);
            debug!(total_nodes = total, "node already registered");
            return Ok(RegisterResponse::already_registered(&node, &key, total));
        }

        RoutingStats::bump(&self.stats.registrations);
        info!(total_nodes = total, attempts = outcome.attempts, "node registered");
        Ok(RegisterResponse::registered(&node, &key, total))
    }

    /// `ResolveNode` bounded by an explicit deadline.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn resolve_node_until(
        &self,
        key: &str,
        deadline: Instant,
    ) -> Result<ResolvedEndpoint, RoutingError> {
        let result = self.resolve_inner(key, deadline).await;
        match &result {
            Ok(endpoint) => {
                RoutingStats::bump(&self.stats.resolutions);
                debug!(node_id = %endpoint.node_id, address = %endpoint.address, "resolved");
            }
            Err(err) => {
                RoutingStats::bump(&self.stats.failed_resolutions);
                debug!(error = %err, "resolution failed");
            }
        }
        result
    }

    async fn resolve_inner(
        &self,
        key: &str,
        deadline: Instant,
    ) -> Result<ResolvedEndpoint, RoutingError> {
        let key = RoutingKey::new(key)?;

        let assignment = self
            .store
            .get(&key, deadline)
            .await?
            .filter(|a| !a.is_empty())
            .ok_or_else(|| RoutingError::NotFound {
                key: key.to_string(),
            })?;

        let candidates: Vec<&NodeId> = assignment
            .nodes
            .iter()
            .filter(|n| self.guard.is_authorized(n))
            .collect();
        if candidates.is_empty() {
            return Err(RoutingError::NoAuthorizedNodes {
                key: key.to_string(),
            });
        }

        let index = self.selector.next(&key, candidates.len())?;
        let chosen = candidates[index];

        let service = self.config.service_name.as_str();
        let instances = within(deadline, "health query", self.catalog.query_healthy(service, None))
            .await?
            .map_err(|e| RoutingError::internal(InternalReason::Catalog, e.to_string()))?;

        let instance = instances
            .iter()
            .find(|i| &i.node_id == chosen)
            .ok_or_else(|| {
                warn!(node_id = %chosen, "selected node is not healthy");
                RoutingError::Unavailable {
                    node_id: chosen.to_string(),
                }
            })?;

        Ok(ResolvedEndpoint {
            node_id: chosen.clone(),
            address: instance.endpoint(),
        })
    }
}

#[async_trait]
impl RoutingApi for RoutingEngine {
    async fn register_node(
        &self,
        node_id: &str,
        key: &str,
    ) -> Result<RegisterResponse, RoutingError> {
        self.register_node_until(node_id, key, self.default_deadline())
            .await
    }

    async fn resolve_node(&self, key: &str) -> Result<ResolvedEndpoint, RoutingError> {
        self.resolve_node_until(key, self.default_deadline()).await
    }
}
