//! In-flight operation registry
//!
//! A table of node operations currently in flight, keyed by node id. The registry is
//! created by the caller and handed to every [`Dispatcher`](super::Dispatcher) that
//! should share it; there is no process-wide instance.
//!
//! Each send task holds an [`InFlightGuard`] for its lifetime. The guard decrements
//! the node's count when the task ends, including when the task is aborted.

use crate::cluster::NodeId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared table of in-flight node operations
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    counts: Mutex<HashMap<NodeId, usize>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn counts(&self) -> MutexGuard<'_, HashMap<NodeId, usize>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register one operation on `node`; it stays registered until the guard drops
    pub fn begin(self: &Arc<Self>, node: &NodeId) -> InFlightGuard {
        *self.counts().entry(node.clone()).or_insert(0) += 1;
        InFlightGuard {
            registry: Arc::clone(self),
            node: node.clone(),
        }
    }

    /// Operations currently in flight on `node`
    pub fn in_flight(&self, node: &NodeId) -> usize {
        self.counts().get(node).copied().unwrap_or(0)
    }

    /// Operations currently in flight across all nodes
    pub fn total(&self) -> usize {
        self.counts().values().sum()
    }

    /// Nodes with at least one operation in flight
    pub fn busy_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.counts().keys().cloned().collect();
        nodes.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        nodes
    }

    fn finish(&self, node: &NodeId) {
        let mut counts = self.counts();
        if let Some(count) = counts.get_mut(node) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(node);
            }
        }
    }
}

/// Keeps one operation registered while alive
#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<InFlightRegistry>,
    node: NodeId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.finish(&self.node);
    }
}
