//! Cross-crate integration tests.

pub mod concurrency;
pub mod http_roundtrip;
pub mod scenarios;

#[cfg(test)]
pub(crate) mod fixture {
    use std::sync::Arc;

    use eg_01_routing_engine::{
        AuthorizationGuard, InMemoryKeyValueStore, InMemoryServiceCatalog, NodeId,
        RoutingConfig, RoutingEngine, ServiceInstance,
    };

    pub const SERVICE: &str = "streaming-node";

    /// Engine over in-memory backends with every listed node authorized and
    /// healthy at `10.0.0.<n>:50052`.
    pub struct Cluster {
        pub engine: Arc<RoutingEngine>,
        pub kv: Arc<InMemoryKeyValueStore>,
        pub catalog: Arc<InMemoryServiceCatalog>,
        pub guard: Arc<AuthorizationGuard>,
        pub config: RoutingConfig,
    }

    impl Cluster {
        pub fn new(nodes: &[&str]) -> Self {
            Self::with_store(nodes, InMemoryKeyValueStore::new(), RoutingConfig::default())
        }

        pub fn with_store(
            nodes: &[&str],
            kv: InMemoryKeyValueStore,
            config: RoutingConfig,
        ) -> Self {
            let ids: Vec<NodeId> = nodes.iter().map(|n| NodeId::new(*n).unwrap()).collect();
            let guard = Arc::new(AuthorizationGuard::new(ids));
            let catalog = Arc::new(InMemoryServiceCatalog::new());
            for (i, node) in nodes.iter().enumerate() {
                catalog.register(
                    SERVICE,
                    ServiceInstance::new(*node, format!("10.0.0.{}", i + 1), 50052),
                );
            }
            let kv = Arc::new(kv);
            let engine = Arc::new(RoutingEngine::new(
                config.clone(),
                Arc::clone(&guard),
                kv.clone(),
                catalog.clone(),
            ));
            Self {
                engine,
                kv,
                catalog,
                guard,
                config,
            }
        }

        pub fn node(id: &str) -> NodeId {
            NodeId::new(id).unwrap()
        }
    }
}
