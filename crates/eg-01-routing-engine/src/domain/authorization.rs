//! Authorization set: the node ids permitted to register and be returned.

use std::collections::HashSet;

use parking_lot::RwLock;

use super::value_objects::NodeId;

/// Read-mostly set of authorized node ids.
///
/// Lookups take a shared lock; `reload` swaps the whole set under the
/// writer lock so readers never observe a partially replaced set.
#[derive(Debug, Default)]
pub struct AuthorizationGuard {
    nodes: RwLock<HashSet<NodeId>>,
}

impl AuthorizationGuard {
    pub fn new<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        Self {
            nodes: RwLock::new(nodes.into_iter().collect()),
        }
    }

    pub fn is_authorized(&self, node_id: &NodeId) -> bool {
        self.nodes.read().contains(node_id)
    }

    /// Replace the authorization set. Returns the new size.
    pub fn reload<I>(&self, nodes: I) -> usize
    where
        I: IntoIterator<Item = NodeId>,
    {
        let next: HashSet<NodeId> = nodes.into_iter().collect();
        let len = next.len();
        *self.nodes.write() = next;
        len
    }

    /// Sorted snapshot of the current set.
    pub fn authorized_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.nodes.read().iter().cloned().collect();
        nodes.sort();
        nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}
