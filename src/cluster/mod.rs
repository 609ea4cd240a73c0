//! Cluster node model
//!
//! Types describing the nodes a command can be fanned out to. A node is identified
//! by a [`NodeId`] and carries the endpoint, role, and hash-slot ranges reported by the
//! topology collaborator. The engine treats these as already validated input.
//!
//! # Modules
//!
//! - `slot`: Hash-slot calculation for keys (CRC16 with hash tags)
//! - `selection`: Node selection strategies (all, masters, replicas, slot owner, ...)
//! - `topology`: The topology collaborator trait and an in-memory implementation

pub mod selection;
pub mod slot;
pub mod topology;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use selection::NodeSelector;
pub use slot::{slot_for_key, SLOT_COUNT};
pub use topology::{StaticTopology, Topology};

/// Unique identifier of a cluster node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
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

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Role of a node in its shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    #[default]
    Master,
    Replica,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Master => f.write_str("master"),
            NodeRole::Replica => f.write_str("replica"),
        }
    }
}

/// Inclusive range of hash slots served by a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRange {
    pub start: u16,
    pub end: u16,
}

impl SlotRange {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    /// Range covering exactly one slot
    pub fn single(slot: u16) -> Self {
        Self { start: slot, end: slot }
    }

    #[inline]
    pub fn contains(&self, slot: u16) -> bool {
        slot >= self.start && slot <= self.end
    }

    /// Number of slots in the range (0 for an inverted range)
    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for SlotRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Identity of one cluster node for the duration of a dispatch
///
/// Immutable once handed to the dispatcher. Equality and hashing are by value, but
/// keyed lookups inside a collection use the [`NodeId`] only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub id: NodeId,
    /// Network endpoint (host:port)
    pub endpoint: String,
    pub role: NodeRole,
    /// Slot ranges served by this node (empty for replicas in most topologies)
    #[serde(default)]
    pub slots: Vec<SlotRange>,
}

impl NodeIdentity {
    pub fn new(id: impl Into<NodeId>, endpoint: impl Into<String>, role: NodeRole) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            role,
            slots: Vec::new(),
        }
    }

    pub fn master(id: impl Into<NodeId>, endpoint: impl Into<String>) -> Self {
        Self::new(id, endpoint, NodeRole::Master)
    }

    pub fn replica(id: impl Into<NodeId>, endpoint: impl Into<String>) -> Self {
        Self::new(id, endpoint, NodeRole::Replica)
    }

    /// Builder-style helper to attach slot ranges
    pub fn with_slots(mut self, slots: Vec<SlotRange>) -> Self {
        self.slots = slots;
        self
    }

    pub fn is_master(&self) -> bool {
        self.role == NodeRole::Master
    }

    pub fn owns_slot(&self, slot: u16) -> bool {
        self.slots.iter().any(|range| range.contains(slot))
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.id, self.endpoint, self.role)
    }
}
