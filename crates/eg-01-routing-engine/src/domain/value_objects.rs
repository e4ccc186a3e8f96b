//! Value objects for the routing domain.
//!
//! Routing keys and node ids are opaque strings. Both are validated once at
//! the boundary and then passed around as newtypes.

use std::fmt;

use super::codec::DELIMITER;
use super::errors::RoutingError;

/// Opaque identifier for a unit of routable work (a data id or chain name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutingKey(String);

impl RoutingKey {
    /// Create a routing key, rejecting the empty string.
    pub fn new(key: impl Into<String>) -> Result<Self, RoutingError> {
        let key = key.into();
        if key.is_empty() {
            return Err(RoutingError::InvalidArgument(
                "routing key must not be empty".into(),
            ));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoutingKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Stable identity of a worker node, distinct from its network address.
///
/// A node id must be non-empty, must not contain the list delimiter `,`
/// and must not carry surrounding whitespace (stored lists are trimmed on
/// decode, so such an id could never be read back).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Result<Self, RoutingError> {
        let id = id.into();
        if id.is_empty() {
            return Err(RoutingError::InvalidArgument(
                "node id must not be empty".into(),
            ));
        }
        if id.contains(DELIMITER) {
            return Err(RoutingError::InvalidArgument(format!(
                "node id {id:?} must not contain '{DELIMITER}'"
            )));
        }
        if id.trim() != id {
            return Err(RoutingError::InvalidArgument(format!(
                "node id {id:?} must not have leading or trailing whitespace"
            )));
        }
        Ok(Self(id))
    }

    /// Wrap an id already known to satisfy the invariants (decoded from the
    /// store or reported by the catalog).
    pub(crate) fn from_trusted(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Revision token returned by the key-value store for optimistic writes.
///
/// `Revision::ABSENT` on a conditional put means "the key must not exist".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Revision(pub u64);

impl Revision {
    pub const ABSENT: Revision = Revision(0);

    pub fn is_absent(self) -> bool {
        self == Self::ABSENT
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node picked for a request together with its current address.
///
/// Computed per request from the catalog, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub node_id: NodeId,
    /// `host:port`
    pub address: String,
}

/// A live instance reported by the health catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    pub node_id: NodeId,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
}

impl ServiceInstance {
    pub fn new(node_id: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            node_id: NodeId::from_trusted(node_id),
            address: address.into(),
            port,
            tags: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Render the instance address as `host:port`, bracketing IPv6 hosts.
    pub fn endpoint(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
