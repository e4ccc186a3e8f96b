//! Catalog-scoped routing by chain tag.
//!
//! Instead of a stored assignment, the candidate set is whatever the health
//! catalog reports for `<tag_prefix><chain>` at call time. Candidates are
//! filtered to the authorization set and sorted by node id so the
//! round-robin order is stable between calls.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, instrument};

use super::config::RoutingConfig;
use super::deadline::within;
use crate::domain::{
    AuthorizationGuard, InternalReason, ResolvedEndpoint, RoundRobinSelector, RoutingError,
    RoutingKey, ServiceInstance,
};
use crate::ports::ServiceCatalog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogResolution {
    Resolved(ResolvedEndpoint),
    /// The catalog reports no healthy instance for the tag
    NoNodesAvailable,
}

pub struct CatalogRouter {
    guard: Arc<AuthorizationGuard>,
    catalog: Arc<dyn ServiceCatalog>,
    selector: RoundRobinSelector,
    config: RoutingConfig,
}

impl CatalogRouter {
    pub fn new(
        config: RoutingConfig,
        guard: Arc<AuthorizationGuard>,
        catalog: Arc<dyn ServiceCatalog>,
    ) -> Self {
        Self {
            guard,
            catalog,
            selector: RoundRobinSelector::new(),
            config,
        }
    }

    pub fn tag_for(&self, chain: &str) -> String {
        format!("{}{}", self.config.tag_prefix, chain)
    }

    pub async fn resolve_by_tag(&self, chain: &str) -> Result<CatalogResolution, RoutingError> {
        let deadline = Instant::now() + self.config.request_timeout;
        self.resolve_by_tag_until(chain, deadline).await
    }

    #[instrument(skip_all, fields(chain = %chain))]
    pub async fn resolve_by_tag_until(
        &self,
        chain: &str,
        deadline: Instant,
    ) -> Result<CatalogResolution, RoutingError> {
        if chain.is_empty() {
            return Err(RoutingError::InvalidArgument(
                "chain must not be empty".into(),
            ));
        }
        let tag = self.tag_for(chain);
        let query = self
            .catalog
            .query_healthy(&self.config.service_name, Some(&tag));
        let healthy = within(deadline, "health query", query)
            .await?
            .map_err(|e| RoutingError::internal(InternalReason::Catalog, e.to_string()))?;

        if healthy.is_empty() {
            debug!(tag = %tag, "no healthy nodes for tag");
            return Ok(CatalogResolution::NoNodesAvailable);
        }

        let mut candidates: Vec<ServiceInstance> = healthy
            .into_iter()
            .filter(|i| self.guard.is_authorized(&i.node_id))
            .collect();
        if candidates.is_empty() {
            return Err(RoutingError::NoAuthorizedNodes { key: tag });
        }
        candidates.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        candidates.dedup_by(|a, b| a.node_id == b.node_id);

        let key = RoutingKey::new(tag)?;
        let chosen = &candidates[self.selector.next(&key, candidates.len())?];
        debug!(node_id = %chosen.node_id, "resolved by tag");

        Ok(CatalogResolution::Resolved(ResolvedEndpoint {
            node_id: chosen.node_id.clone(),
            address: chosen.endpoint(),
        }))
    }
}
