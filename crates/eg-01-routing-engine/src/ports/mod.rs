//! # Ports Layer
//!
//! - **Inbound (Driving):** [`RoutingApi`], implemented by the engine
//! - **Outbound (Driven):** [`KeyValueStore`], [`ServiceCatalog`]

pub mod inbound;
pub mod outbound;

pub use inbound::RoutingApi;
pub use outbound::{
    CatalogError, KeyValueStore, PutOutcome, ServiceCatalog, StoreError, VersionedValue,
};
