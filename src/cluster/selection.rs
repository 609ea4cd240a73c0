//! Node selection strategies
//!
//! A selection answers one question: given a snapshot of the cluster, which nodes
//! should receive the command, and in what order? Every strategy is a variant of
//! [`NodeSelector`]; there is no selector hierarchy.

use super::{slot_for_key, NodeId, NodeIdentity, NodeRole};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Predicate used by [`NodeSelector::Filter`]
pub type NodePredicate = Arc<dyn Fn(&NodeIdentity) -> bool + Send + Sync>;

/// Strategy producing an ordered node set from a topology snapshot
#[derive(Clone)]
pub enum NodeSelector {
    /// Every known node, in topology order
    All,
    /// Master nodes only
    Masters,
    /// Replica nodes only
    Replicas,
    /// Nodes whose slot ranges cover the given slot
    SlotOwner(u16),
    /// An explicit list of node ids; the result follows the list order
    Explicit(Vec<NodeId>),
    /// Nodes accepted by a custom predicate
    Filter(NodePredicate),
}

impl NodeSelector {
    /// Select the owner(s) of the slot a key hashes to
    pub fn for_key(key: impl AsRef<[u8]>) -> Self {
        NodeSelector::SlotOwner(slot_for_key(key.as_ref()))
    }

    pub fn explicit<I, N>(ids: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        NodeSelector::Explicit(ids.into_iter().map(Into::into).collect())
    }

    pub fn filter<F>(predicate: F) -> Self
    where
        F: Fn(&NodeIdentity) -> bool + Send + Sync + 'static,
    {
        NodeSelector::Filter(Arc::new(predicate))
    }

    /// Apply the strategy to a snapshot of the cluster
    pub fn select(&self, nodes: &[NodeIdentity]) -> Vec<NodeIdentity> {
        match self {
            NodeSelector::All => nodes.to_vec(),
            NodeSelector::Masters => Self::retain(nodes, |n| n.role == NodeRole::Master),
            NodeSelector::Replicas => Self::retain(nodes, |n| n.role == NodeRole::Replica),
            NodeSelector::SlotOwner(slot) => Self::retain(nodes, |n| n.owns_slot(*slot)),
            NodeSelector::Filter(predicate) => Self::retain(nodes, |n| predicate(n)),
            NodeSelector::Explicit(ids) => ids
                .iter()
                .filter_map(|id| {
                    let found = nodes.iter().find(|n| &n.id == id).cloned();
                    if found.is_none() {
                        warn!(node = %id, "explicitly selected node is not part of the topology");
                    }
                    found
                })
                .collect(),
        }
    }

    fn retain(nodes: &[NodeIdentity], keep: impl Fn(&NodeIdentity) -> bool) -> Vec<NodeIdentity> {
        nodes.iter().filter(|n| keep(n)).cloned().collect()
    }
}

impl fmt::Debug for NodeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeSelector::All => f.write_str("All"),
            NodeSelector::Masters => f.write_str("Masters"),
            NodeSelector::Replicas => f.write_str("Replicas"),
            NodeSelector::SlotOwner(slot) => f.debug_tuple("SlotOwner").field(slot).finish(),
            NodeSelector::Explicit(ids) => f.debug_tuple("Explicit").field(ids).finish(),
            NodeSelector::Filter(_) => f.write_str("Filter(..)"),
        }
    }
}

impl fmt::Display for NodeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeSelector::All => f.write_str("all"),
            NodeSelector::Masters => f.write_str("masters"),
            NodeSelector::Replicas => f.write_str("replicas"),
            NodeSelector::SlotOwner(slot) => write!(f, "slot:{}", slot),
            NodeSelector::Explicit(ids) => {
                let ids: Vec<&str> = ids.iter().map(NodeId::as_str).collect();
                write!(f, "nodes:{}", ids.join(","))
            }
            NodeSelector::Filter(_) => f.write_str("filter"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::SlotRange;

    fn cluster() -> Vec<NodeIdentity> {
        vec![
            NodeIdentity::master("m1", "10.0.0.1:6379").with_slots(vec![SlotRange::new(0, 8191)]),
            NodeIdentity::replica("r1", "10.0.0.2:6379"),
            NodeIdentity::master("m2", "10.0.0.3:6379").with_slots(vec![SlotRange::new(8192, 16383)]),
            NodeIdentity::replica("r2", "10.0.0.4:6379"),
        ]
    }

    fn ids(nodes: &[NodeIdentity]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_select_all_preserves_order() {
        let nodes = cluster();
        assert_eq!(ids(&NodeSelector::All.select(&nodes)), vec!["m1", "r1", "m2", "r2"]);
    }

    #[test]
    fn test_select_by_role() {
        let nodes = cluster();
        assert_eq!(ids(&NodeSelector::Masters.select(&nodes)), vec!["m1", "m2"]);
        assert_eq!(ids(&NodeSelector::Replicas.select(&nodes)), vec!["r1", "r2"]);
    }

    #[test]
    fn test_select_slot_owner() {
        let nodes = cluster();
        assert_eq!(ids(&NodeSelector::SlotOwner(100).select(&nodes)), vec!["m1"]);
        assert_eq!(ids(&NodeSelector::SlotOwner(9000).select(&nodes)), vec!["m2"]);

        // "foo" hashes to 12182
        assert_eq!(ids(&NodeSelector::for_key("foo").select(&nodes)), vec!["m2"]);
    }

    #[test]
    fn test_select_explicit_follows_list_order() {
        let nodes = cluster();
        let selector = NodeSelector::explicit(["r2", "m1", "missing"]);
        assert_eq!(ids(&selector.select(&nodes)), vec!["r2", "m1"]);
    }

    #[test]
    fn test_select_filter() {
        let nodes = cluster();
        let selector = NodeSelector::filter(|n| n.endpoint.ends_with(".3:6379"));
        assert_eq!(ids(&selector.select(&nodes)), vec!["m2"]);
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeSelector::Masters.to_string(), "masters");
        assert_eq!(NodeSelector::SlotOwner(5).to_string(), "slot:5");
        assert_eq!(NodeSelector::explicit(["a", "b"]).to_string(), "nodes:a,b");
    }
}
