//! Topology collaborator
//!
//! The topology supplies the current node set. The dispatcher asks it exactly once
//! per dispatch and does not cache the answer, so a refreshed topology is picked up
//! by the next dispatch.

use super::{NodeIdentity, NodeSelector};
use std::sync::RwLock;

/// Source of the current cluster node set
pub trait Topology: Send + Sync {
    /// Snapshot of all known nodes, in a stable order
    fn nodes(&self) -> Vec<NodeIdentity>;

    /// Ordered node set for a selection strategy
    fn current_nodes(&self, selector: &NodeSelector) -> Vec<NodeIdentity> {
        selector.select(&self.nodes())
    }
}

/// In-memory topology
///
/// Holds a fixed list of nodes that can be swapped wholesale with [`replace`](Self::replace).
#[derive(Debug, Default)]
pub struct StaticTopology {
    nodes: RwLock<Vec<NodeIdentity>>,
}

impl StaticTopology {
    pub fn new(nodes: Vec<NodeIdentity>) -> Self {
        Self {
            nodes: RwLock::new(nodes),
        }
    }

    /// Replace the node set (e.g. after a topology refresh)
    pub fn replace(&self, nodes: Vec<NodeIdentity>) {
        match self.nodes.write() {
            Ok(mut guard) => *guard = nodes,
            Err(poisoned) => *poisoned.into_inner() = nodes,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Topology for StaticTopology {
    fn nodes(&self) -> Vec<NodeIdentity> {
        match self.nodes.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
