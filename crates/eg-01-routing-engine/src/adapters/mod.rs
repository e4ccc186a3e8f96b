//! # Adapters
//!
//! - `memory`: in-process store and catalog (always available)
//! - `consul`: Consul HTTP API (feature `consul`)

pub mod memory;

#[cfg(feature = "consul")]
pub mod consul;

pub use memory::{InMemoryKeyValueStore, InMemoryServiceCatalog};

#[cfg(feature = "consul")]
pub use consul::{ConsulClient, ConsulConfig, ConsulError, ConsulKeyValueStore, ConsulServiceCatalog};
