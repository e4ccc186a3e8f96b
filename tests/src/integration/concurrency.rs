//! # Concurrency
//!
//! - Racing registrations of distinct nodes for one key, with injected
//!   store conflicts: every node ends up in the stored list exactly once.
//! - Concurrent lookups from many tasks: picks stay exactly balanced.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use eg_01_routing_engine::domain::decode_node_list;
    use eg_01_routing_engine::{
        InMemoryKeyValueStore, RetryPolicy, RoutingApi, RoutingConfig, RoutingKey,
    };
    use futures::future::join_all;

    use crate::integration::fixture::Cluster;

    fn patient_config() -> RoutingConfig {
        RoutingConfig {
            retry: RetryPolicy {
                max_attempts: 64,
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(5),
            },
            ..RoutingConfig::default()
        }
    }

    fn node_names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("node{i}")).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_registrations_lose_nothing() {
        let names = node_names(12);
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let kv = InMemoryKeyValueStore::new().with_latency(Duration::from_millis(1));
        let cluster = Cluster::with_store(&refs, kv, patient_config());
        cluster.kv.inject_conflicts(5);

        let tasks = names.iter().cloned().map(|name| {
            let engine = cluster.engine.clone();
            tokio::spawn(async move { engine.register_node(&name, "btc").await })
        });
        for joined in join_all(tasks).await {
            assert!(joined.unwrap().unwrap().success);
        }

        let raw = cluster.kv.raw("event-catcher/nodes/btc").unwrap();
        let stored = decode_node_list(&raw).unwrap();
        assert_eq!(stored.len(), names.len());
        for name in &names {
            assert_eq!(stored.iter().filter(|n| n.as_str() == name).count(), 1);
        }
        assert!(cluster.engine.stats().snapshot().cas_conflicts >= 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_duplicate_racers_store_once() {
        let kv = InMemoryKeyValueStore::new().with_latency(Duration::from_millis(1));
        let cluster = Cluster::with_store(&["node1"], kv, patient_config());

        let tasks = (0..8).map(|_| {
            let engine = cluster.engine.clone();
            tokio::spawn(async move { engine.register_node("node1", "eth").await })
        });
        let results: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();

        assert!(results.iter().all(|r| r.success && r.total_nodes == 1));
        assert_eq!(
            cluster.kv.raw("event-catcher/nodes/eth").as_deref(),
            Some(b"node1".as_slice())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_resolves_stay_balanced() {
        let cluster = Cluster::new(&["node1", "node2", "node3"]);
        for node in ["node1", "node2", "node3"] {
            cluster.engine.register_node(node, "sol").await.unwrap();
        }

        const TASKS: usize = 8;
        const PER_TASK: usize = 75;
        let tasks = (0..TASKS).map(|_| {
            let engine = cluster.engine.clone();
            tokio::spawn(async move {
                let mut picks = Vec::with_capacity(PER_TASK);
                for _ in 0..PER_TASK {
                    picks.push(engine.resolve_node("sol").await.unwrap().node_id);
                }
                picks
            })
        });

        let mut counts: HashMap<String, usize> = HashMap::new();
        for joined in join_all(tasks).await {
            for node in joined.unwrap() {
                *counts.entry(node.to_string()).or_default() += 1;
            }
        }

        assert_eq!(counts.len(), 3);
        for count in counts.values() {
            assert_eq!(*count, TASKS * PER_TASK / 3);
        }
        let key = RoutingKey::new("sol").unwrap();
        assert_eq!(
            cluster.engine.selector().counter(&key),
            Some((TASKS * PER_TASK) as u64)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_keys_rotate_independently() {
        let cluster = Cluster::new(&["node1", "node2"]);
        for key in ["btc", "eth"] {
            cluster.engine.register_node("node1", key).await.unwrap();
            cluster.engine.register_node("node2", key).await.unwrap();
        }

        // three lookups on btc must not move eth's rotation
        for _ in 0..3 {
            cluster.engine.resolve_node("btc").await.unwrap();
        }
        let eth = cluster.engine.resolve_node("eth").await.unwrap();
        assert_eq!(eth.node_id.as_str(), "node1");
        let btc = cluster.engine.resolve_node("btc").await.unwrap();
        assert_eq!(btc.node_id.as_str(), "node2");
    }
}
