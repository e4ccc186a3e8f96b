//! Assignment entities and registration results.

use std::fmt;

use super::value_objects::{NodeId, Revision, RoutingKey};

/// Ordered, duplicate-free list of nodes serving a routing key.
///
/// Insertion order is registration order. The core never deletes an
/// assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub key: RoutingKey,
    pub nodes: Vec<NodeId>,
    pub revision: Revision,
}

impl Assignment {
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains(node_id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Result of a conditional append to an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Node list after the operation
    pub nodes: Vec<NodeId>,
    /// The node was already assigned; nothing was written
    pub already_present: bool,
    /// Conditional write attempts used (0 when nothing had to be written)
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationStatus {
    Registered,
    AlreadyRegistered,
}

impl RegistrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::AlreadyRegistered => "already_registered",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful `RegisterNode` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub status: RegistrationStatus,
    /// Nodes assigned to the key after registration
    pub total_nodes: usize,
}

impl RegisterResponse {
    pub fn registered(node_id: &NodeId, key: &RoutingKey, total_nodes: usize) -> Self {
        Self {
            success: true,
            message: format!("node {node_id} registered for {key}"),
            status: RegistrationStatus::Registered,
            total_nodes,
        }
    }

    pub fn already_registered(node_id: &NodeId, key: &RoutingKey, total_nodes: usize) -> Self {
        Self {
            success: true,
            message: format!("node {node_id} already registered for {key}"),
            status: RegistrationStatus::AlreadyRegistered,
            total_nodes,
        }
    }
}
