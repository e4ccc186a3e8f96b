//! # Driven Ports (Outbound SPI)
//!
//! Capabilities the routing engine requires from its host: a key-value
//! store with conditional writes and a health catalog.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`; one engine instance serves many
//! concurrent requests.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Revision, ServiceInstance};

/// A stored value together with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub revision: Revision,
}

/// Result of a conditional put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// Value stored; the new revision of the key
    Written(Revision),
    /// The key's revision no longer matched the expected one
    Conflict,
}

/// Errors from the key-value backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Backend answered with something unusable
    #[error("store protocol error: {0}")]
    Protocol(String),
}

/// Errors from the health catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
    #[error("catalog protocol error: {0}")]
    Protocol(String),
}

/// Key-value store with optimistic concurrency.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a key. `None` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StoreError>;

    /// Write `value` only if the key is still at `expected`.
    ///
    /// `Revision::ABSENT` means the key must not exist yet.
    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        expected: Revision,
    ) -> Result<PutOutcome, StoreError>;
}

/// Health catalog of running service instances.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Instances of `service` currently passing health checks, optionally
    /// restricted to those carrying `tag`.
    async fn query_healthy(
        &self,
        service: &str,
        tag: Option<&str>,
    ) -> Result<Vec<ServiceInstance>, CatalogError>;
}
