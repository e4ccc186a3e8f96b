//! In-memory adapters for the outbound ports.
//!
//! Used for standalone development and as test doubles. The key-value
//! store follows the same conditional-write rules as Consul: every write
//! gets a fresh revision from a global counter and a put succeeds only if
//! the key is still at the expected revision.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::domain::{NodeId, Revision, ServiceInstance};
use crate::ports::{
    CatalogError, KeyValueStore, PutOutcome, ServiceCatalog, StoreError, VersionedValue,
};

// =============================================================================
// KEY-VALUE STORE
// =============================================================================

#[derive(Debug, Default)]
struct KvState {
    entries: HashMap<String, VersionedValue>,
    last_revision: u64,
    forced_conflicts: u32,
    forced_failures: u32,
    writes: u64,
}

impl KvState {
    fn take_failure(&mut self) -> Option<StoreError> {
        if self.forced_failures == 0 {
            return None;
        }
        self.forced_failures -= 1;
        Some(StoreError::Unavailable("injected failure".into()))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    state: Mutex<KvState>,
    latency: Option<Duration>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`, widening the window between a read
    /// and the conditional write that follows it.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Unconditionally store a raw value. Returns its revision.
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Revision {
        let mut state = self.state.lock();
        state.last_revision += 1;
        state.writes += 1;
        let revision = Revision(state.last_revision);
        state.entries.insert(
            key.into(),
            VersionedValue {
                value: value.into(),
                revision,
            },
        );
        revision
    }

    /// Raw value currently stored under `key`.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.state.lock().entries.get(key).map(|v| v.value.clone())
    }

    /// Number of successful writes, including `insert_raw`.
    pub fn write_count(&self) -> u64 {
        self.state.lock().writes
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next `n` conditional puts report a conflict.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn inject_conflicts(&self, n: u32) {
        self.state.lock().forced_conflicts = n;
    }

    /// Make the next `n` calls (get or put) fail with `Unavailable`.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn fail_next(&self, n: u32) {
        self.state.lock().forced_failures = n;
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StoreError> {
        let result = {
            let mut state = self.state.lock();
            if let Some(err) = state.take_failure() {
                return Err(err);
            }
            state.entries.get(key).cloned()
        };
        self.simulate_latency().await;
        Ok(result)
    }

    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        expected: Revision,
    ) -> Result<PutOutcome, StoreError> {
        self.simulate_latency().await;
        let mut state = self.state.lock();
        if let Some(err) = state.take_failure() {
            return Err(err);
        }
        if state.forced_conflicts > 0 {
            state.forced_conflicts -= 1;
            return Ok(PutOutcome::Conflict);
        }

        let current = state
            .entries
            .get(key)
            .map(|v| v.revision)
            .unwrap_or(Revision::ABSENT);
        if current != expected {
            return Ok(PutOutcome::Conflict);
        }

        state.last_revision += 1;
        state.writes += 1;
        let revision = Revision(state.last_revision);
        state
            .entries
            .insert(key.to_string(), VersionedValue { value, revision });
        Ok(PutOutcome::Written(revision))
    }
}

// =============================================================================
// SERVICE CATALOG
// =============================================================================

#[derive(Debug, Clone)]
struct CatalogEntry {
    instance: ServiceInstance,
    passing: bool,
}

#[derive(Debug, Default)]
pub struct InMemoryServiceCatalog {
    services: RwLock<HashMap<String, Vec<CatalogEntry>>>,
    forced_failures: Mutex<u32>,
}

impl InMemoryServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a passing instance of `service`.
    pub fn register(&self, service: impl Into<String>, instance: ServiceInstance) {
        let mut services = self.services.write();
        let entries = services.entry(service.into()).or_default();
        entries.retain(|e| e.instance.node_id != instance.node_id);
        entries.push(CatalogEntry {
            instance,
            passing: true,
        });
    }

    /// Remove an instance. Returns whether it existed.
    pub fn deregister(&self, service: &str, node_id: &NodeId) -> bool {
        let mut services = self.services.write();
        let Some(entries) = services.get_mut(service) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| &e.instance.node_id != node_id);
        before != entries.len()
    }

    /// Flip an instance's health status. Returns whether it exists.
    pub fn set_passing(&self, service: &str, node_id: &NodeId, passing: bool) -> bool {
        let mut services = self.services.write();
        services
            .get_mut(service)
            .and_then(|entries| entries.iter_mut().find(|e| &e.instance.node_id == node_id))
            .map(|entry| entry.passing = passing)
            .is_some()
    }

    /// Make the next `n` queries fail with `Unavailable`.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn fail_next(&self, n: u32) {
        *self.forced_failures.lock() = n;
    }
}

#[async_trait]
impl ServiceCatalog for InMemoryServiceCatalog {
    async fn query_healthy(
        &self,
        service: &str,
        tag: Option<&str>,
    ) -> Result<Vec<ServiceInstance>, CatalogError> {
        {
            let mut failures = self.forced_failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(CatalogError::Unavailable("injected failure".into()));
            }
        }

        let services = self.services.read();
        Ok(services
            .get(service)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.passing)
                    .filter(|e| tag.map_or(true, |t| e.instance.has_tag(t)))
                    .map(|e| e.instance.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cas_create_requires_absent() {
        let store = InMemoryKeyValueStore::new();
        let first = store.put("k", b"a".to_vec(), Revision::ABSENT).await.unwrap();
        let PutOutcome::Written(rev) = first else {
            panic!("expected write, got {first:?}");
        };

        // a second create must conflict
        let second = store.put("k", b"b".to_vec(), Revision::ABSENT).await.unwrap();
        assert_eq!(second, PutOutcome::Conflict);

        // an update at the read revision succeeds and bumps the revision
        let third = store.put("k", b"c".to_vec(), rev).await.unwrap();
        assert!(matches!(third, PutOutcome::Written(r) if r > rev));
        assert_eq!(store.raw("k"), Some(b"c".to_vec()));
    }

    #[tokio::test]
    async fn test_stale_revision_conflicts() {
        let store = InMemoryKeyValueStore::new();
        let rev = store.insert_raw("k", "node1");
        store.insert_raw("k", "node1,node2");

        let outcome = store.put("k", b"node1,node3".to_vec(), rev).await.unwrap();
        assert_eq!(outcome, PutOutcome::Conflict);
        assert_eq!(store.raw("k"), Some(b"node1,node2".to_vec()));
    }

    #[tokio::test]
    async fn test_missing_key_reads_none() {
        let store = InMemoryKeyValueStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_injected_conflicts_and_failures() {
        let store = InMemoryKeyValueStore::new();
        store.inject_conflicts(2);
        for _ in 0..2 {
            let outcome = store.put("k", b"v".to_vec(), Revision::ABSENT).await.unwrap();
            assert_eq!(outcome, PutOutcome::Conflict);
        }
        assert!(matches!(
            store.put("k", b"v".to_vec(), Revision::ABSENT).await.unwrap(),
            PutOutcome::Written(_)
        ));

        store.fail_next(1);
        assert!(matches!(
            store.get("k").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_catalog_filters_health_and_tags() {
        let catalog = InMemoryServiceCatalog::new();
        catalog.register(
            "streaming-node",
            ServiceInstance::new("node1", "10.0.0.1", 50052).with_tag("chain:btc"),
        );
        catalog.register(
            "streaming-node",
            ServiceInstance::new("node2", "10.0.0.2", 50052).with_tag("chain:eth"),
        );

        let all = catalog.query_healthy("streaming-node", None).await.unwrap();
        assert_eq!(all.len(), 2);

        let btc = catalog
            .query_healthy("streaming-node", Some("chain:btc"))
            .await
            .unwrap();
        assert_eq!(btc.len(), 1);
        assert_eq!(btc[0].node_id.as_str(), "node1");

        let node1 = NodeId::new("node1").unwrap();
        assert!(catalog.set_passing("streaming-node", &node1, false));
        let btc = catalog
            .query_healthy("streaming-node", Some("chain:btc"))
            .await
            .unwrap();
        assert!(btc.is_empty());

        assert!(catalog.deregister("streaming-node", &node1));
        assert!(!catalog.deregister("streaming-node", &node1));
        assert!(catalog.query_healthy("other", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_register_replaces_instance() {
        let catalog = InMemoryServiceCatalog::new();
        catalog.register("svc", ServiceInstance::new("node1", "10.0.0.1", 1));
        catalog.register("svc", ServiceInstance::new("node1", "10.0.0.9", 2));

        let instances = catalog.query_healthy("svc", None).await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].endpoint(), "10.0.0.9:2");
    }
}
