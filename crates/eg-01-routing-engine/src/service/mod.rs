//! # Service Layer
//!
//! Connects the domain to the ports. [`RoutingEngine`] implements the
//! inbound [`RoutingApi`](crate::ports::RoutingApi); [`CatalogRouter`] is the
//! tag-scoped variant served on its own endpoint.

pub mod assignment_store;
pub mod catalog_router;
pub mod config;
mod deadline;
pub mod engine;
pub mod stats;

pub use assignment_store::AssignmentStore;
pub use catalog_router::{CatalogResolution, CatalogRouter};
pub use config::RoutingConfig;
pub use engine::RoutingEngine;
pub use stats::{RoutingStats, RoutingStatsSnapshot};
