//! # Routing Engine
//!
//! Registry-backed round-robin routing: maps an opaque routing key (a data
//! id or chain name) to the endpoint of a live worker node serving it.
//!
//! - Nodes register for a key; the assignment is persisted through a
//!   key-value store with conditional writes, so concurrent registrations
//!   never lose an update.
//! - Lookups rotate over the assigned, authorized nodes with a per-key
//!   atomic counter and confirm the pick against a health catalog.
//!
//! ## Architecture
//!
//! - **Domain Layer:** identifiers, authorization set, selector, codec
//! - **Ports Layer:** `RoutingApi` (inbound), `KeyValueStore` and
//!   `ServiceCatalog` (outbound)
//! - **Service Layer:** `RoutingEngine`, `CatalogRouter`
//! - **Adapters Layer:** in-memory doubles, Consul (feature `consul`)
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use eg_01_routing_engine::{
//!     AuthorizationGuard, InMemoryKeyValueStore, InMemoryServiceCatalog, NodeId,
//!     RoutingApi, RoutingConfig, RoutingEngine, ServiceInstance,
//! };
//!
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let catalog = Arc::new(InMemoryServiceCatalog::new());
//! catalog.register("streaming-node", ServiceInstance::new("node1", "10.0.0.1", 50052));
//!
//! let guard = Arc::new(AuthorizationGuard::new([NodeId::new("node1").unwrap()]));
//! let engine = RoutingEngine::new(
//!     RoutingConfig::default(),
//!     guard,
//!     Arc::new(InMemoryKeyValueStore::new()),
//!     catalog,
//! );
//!
//! engine.register_node("node1", "btc").await.unwrap();
//! let endpoint = engine.resolve_node("btc").await.unwrap();
//! assert_eq!(endpoint.address, "10.0.0.1:50052");
//! # });
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// =============================================================================
// PUBLIC API RE-EXPORTS
// =============================================================================

pub use adapters::{InMemoryKeyValueStore, InMemoryServiceCatalog};
pub use domain::{
    AppendOutcome, Assignment, AuthorizationGuard, ErrorCode, InternalReason, NodeId,
    RegisterResponse, RegistrationStatus, ResolvedEndpoint, RetryPolicy, Revision,
    RoundRobinSelector, RoutingError, RoutingKey, ServiceInstance,
};
pub use ports::{
    CatalogError, KeyValueStore, PutOutcome, RoutingApi, ServiceCatalog, StoreError,
    VersionedValue,
};
pub use service::{
    CatalogResolution, CatalogRouter, RoutingConfig, RoutingEngine, RoutingStats,
    RoutingStatsSnapshot,
};
