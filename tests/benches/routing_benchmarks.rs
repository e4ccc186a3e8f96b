//! # Event-Gateway Routing Benchmarks
//!
//! | Path | Target |
//! |------|--------|
//! | Selector `next` on a warm key | < 100ns |
//! | Node-list decode, 64 nodes | < 10µs |
//! | Full resolve over in-memory backends | < 50µs |

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use eg_01_routing_engine::domain::{decode_node_list, encode_node_list};
use eg_01_routing_engine::{
    AuthorizationGuard, InMemoryKeyValueStore, InMemoryServiceCatalog, NodeId, RoundRobinSelector,
    RoutingApi, RoutingConfig, RoutingEngine, RoutingKey, ServiceInstance,
};
use rand::Rng;

fn node_ids(n: usize) -> Vec<NodeId> {
    (0..n)
        .filter_map(|i| NodeId::new(format!("node{i}")).ok())
        .collect()
}

fn bench_selector(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector");

    let selector = RoundRobinSelector::new();
    let Ok(key) = RoutingKey::new("btc") else {
        return;
    };
    selector.ensure(&key);
    group.bench_function("next_warm_key", |b| {
        b.iter(|| black_box(selector.next(&key, 3).ok()))
    });

    let keys: Vec<RoutingKey> = (0..1024)
        .filter_map(|i| RoutingKey::new(format!("chain-{i}")).ok())
        .collect();
    group.bench_function("next_random_key_of_1024", |b| {
        let mut rng = rand::thread_rng();
        b.iter(|| {
            let key = &keys[rng.gen_range(0..keys.len())];
            black_box(selector.next(key, 5).ok())
        })
    });

    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for size in [1usize, 8, 64, 256] {
        let raw = encode_node_list(&node_ids(size));
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("decode", size), &raw, |b, raw| {
            b.iter(|| black_box(decode_node_list(raw).ok()))
        });
    }

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    group.measurement_time(Duration::from_secs(5));

    let Ok(runtime) = tokio::runtime::Runtime::new() else {
        return;
    };
    let nodes = node_ids(8);
    let catalog = Arc::new(InMemoryServiceCatalog::new());
    for (i, node) in nodes.iter().enumerate() {
        catalog.register(
            "streaming-node",
            ServiceInstance::new(node.as_str(), format!("10.0.0.{}", i + 1), 50052),
        );
    }
    let engine = RoutingEngine::new(
        RoutingConfig::default(),
        Arc::new(AuthorizationGuard::new(nodes.clone())),
        Arc::new(InMemoryKeyValueStore::new()),
        catalog,
    );
    runtime.block_on(async {
        for node in &nodes {
            let _ = engine.register_node(node.as_str(), "btc").await;
        }
    });

    group.bench_function("resolve_8_nodes", |b| {
        b.iter(|| runtime.block_on(async { black_box(engine.resolve_node("btc").await.ok()) }))
    });

    group.finish();
}

criterion_group!(benches, bench_selector, bench_codec, bench_resolve);
criterion_main!(benches);
