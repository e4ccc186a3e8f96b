//! # Routing Scenarios
//!
//! Register and resolve flows through `RoutingApi` over the in-memory
//! backends:
//!
//! 1. Two nodes register for one key; lookups alternate between them.
//! 2. An unauthorized node is rejected and the stored list is untouched.
//! 3. Unknown keys, deauthorized nodes and unhealthy picks surface as
//!    `NotFound`, `PermissionDenied` and `Unavailable`.

#[cfg(test)]
mod tests {
    use eg_01_routing_engine::{
        AuthorizationGuard, CatalogResolution, CatalogRouter, ErrorCode, RegistrationStatus,
        RoutingApi, RoutingError, ServiceInstance,
    };
    use std::sync::Arc;

    use crate::integration::fixture::{Cluster, SERVICE};

    const BTC_KEY: &str = "event-catcher/nodes/btc";

    // =============================================================================
    // REGISTER -> RESOLVE
    // =============================================================================

    #[tokio::test]
    async fn test_two_nodes_alternate() {
        let cluster = Cluster::new(&["node1", "node2", "node3"]);

        let first = cluster.engine.register_node("node1", "btc").await.unwrap();
        assert_eq!(first.status, RegistrationStatus::Registered);
        assert_eq!(first.total_nodes, 1);
        let second = cluster.engine.register_node("node2", "btc").await.unwrap();
        assert_eq!(second.total_nodes, 2);

        let mut picks = Vec::new();
        for _ in 0..4 {
            let endpoint = cluster.engine.resolve_node("btc").await.unwrap();
            picks.push(endpoint.node_id.to_string());
        }
        assert_eq!(picks, ["node1", "node2", "node1", "node2"]);
    }

    #[tokio::test]
    async fn test_unauthorized_node_leaves_assignment_unchanged() {
        let cluster = Cluster::new(&["node1", "node2"]);
        cluster.engine.register_node("node1", "btc").await.unwrap();
        cluster.engine.register_node("node2", "btc").await.unwrap();
        let before = cluster.kv.raw(BTC_KEY);
        let writes = cluster.kv.write_count();

        let err = cluster
            .engine
            .register_node("node9", "btc")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);

        assert_eq!(cluster.kv.raw(BTC_KEY), before);
        assert_eq!(cluster.kv.write_count(), writes);
        assert_eq!(before.as_deref(), Some(b"node1,node2".as_slice()));
    }

    #[tokio::test]
    async fn test_unknown_key_not_found() {
        let cluster = Cluster::new(&["node1"]);
        cluster.engine.register_node("node1", "btc").await.unwrap();

        match cluster.engine.resolve_node("unknown-key").await {
            Err(RoutingError::NotFound { key }) => assert_eq!(key, "unknown-key"),
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert_eq!(cluster.engine.selector().tracked_keys(), 1);
    }

    #[tokio::test]
    async fn test_registration_is_idempotent() {
        let cluster = Cluster::new(&["node1"]);
        cluster.engine.register_node("node1", "eth").await.unwrap();
        let writes = cluster.kv.write_count();

        for _ in 0..3 {
            let again = cluster.engine.register_node("node1", "eth").await.unwrap();
            assert!(again.success);
            assert_eq!(again.status, RegistrationStatus::AlreadyRegistered);
            assert_eq!(again.total_nodes, 1);
        }
        assert_eq!(cluster.kv.write_count(), writes);
    }

    // =============================================================================
    // AUTHORIZATION AND HEALTH AT RESOLVE TIME
    // =============================================================================

    #[tokio::test]
    async fn test_deauthorized_node_skipped() {
        let cluster = Cluster::new(&["node1", "node2", "node3"]);
        for node in ["node1", "node2", "node3"] {
            cluster.engine.register_node(node, "sol").await.unwrap();
        }

        cluster
            .guard
            .reload([Cluster::node("node1"), Cluster::node("node3")]);

        for _ in 0..6 {
            let endpoint = cluster.engine.resolve_node("sol").await.unwrap();
            assert_ne!(endpoint.node_id.as_str(), "node2");
        }

        cluster.guard.reload(std::iter::empty());
        let err = cluster.engine.resolve_node("sol").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn test_unhealthy_pick_is_unavailable_then_rotates() {
        let cluster = Cluster::new(&["node1", "node2"]);
        cluster.engine.register_node("node1", "btc").await.unwrap();
        cluster.engine.register_node("node2", "btc").await.unwrap();
        cluster
            .catalog
            .set_passing(SERVICE, &Cluster::node("node1"), false);

        let err = cluster.engine.resolve_node("btc").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unavailable);

        let endpoint = cluster.engine.resolve_node("btc").await.unwrap();
        assert_eq!(endpoint.node_id.as_str(), "node2");
        assert_eq!(endpoint.address, "10.0.0.2:50052");
    }

    #[tokio::test]
    async fn test_store_outage_is_internal() {
        let cluster = Cluster::new(&["node1"]);
        cluster.kv.fail_next(1);

        let err = cluster
            .engine
            .register_node("node1", "btc")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal);
        assert!(cluster.kv.raw(BTC_KEY).is_none());

        cluster.engine.register_node("node1", "btc").await.unwrap();
    }

    // =============================================================================
    // CATALOG-TAG VARIANT
    // =============================================================================

    #[tokio::test]
    async fn test_chain_routing_alongside_assignments() {
        let cluster = Cluster::new(&["node1", "node2"]);
        cluster.catalog.register(
            SERVICE,
            ServiceInstance::new("node2", "10.0.0.2", 50052).with_tag("chain:eth"),
        );
        cluster.catalog.register(
            SERVICE,
            ServiceInstance::new("node1", "10.0.0.1", 50052).with_tag("chain:eth"),
        );
        let router = CatalogRouter::new(
            cluster.config.clone(),
            Arc::clone(&cluster.guard),
            cluster.catalog.clone(),
        );

        let mut picks = Vec::new();
        for _ in 0..4 {
            match router.resolve_by_tag("eth").await.unwrap() {
                CatalogResolution::Resolved(endpoint) => picks.push(endpoint.node_id.to_string()),
                CatalogResolution::NoNodesAvailable => panic!("expected a node"),
            }
        }
        assert_eq!(picks, ["node1", "node2", "node1", "node2"]);

        assert_eq!(
            router.resolve_by_tag("doge").await.unwrap(),
            CatalogResolution::NoNodesAvailable
        );

        let locked_out = CatalogRouter::new(
            cluster.config.clone(),
            Arc::new(AuthorizationGuard::default()),
            cluster.catalog.clone(),
        );
        let err = locked_out.resolve_by_tag("eth").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
    }
}
