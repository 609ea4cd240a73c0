//! nodefan - command fan-out and result aggregation for partitioned KV clusters
//!
//! One logical command is issued as N independent node operations, one per node of
//! a selection. Each node's outcome is tracked on its own, and the aggregate is
//! exposed without waiting on the slowest node longer than the caller asks and
//! without letting one node's failure touch another node's result.
//!
//! # Architecture
//!
//! - **Selection**: Topology snapshot + strategy (all, masters, replicas, slot owner, explicit list)
//! - **Dispatch**: One spawned task per node, returned immediately as a collection
//! - **Execution tracking**: Single-transition per-node state, shared completion latch
//! - **Coercion**: Raw replies decoded by a fresh typed output per node
//! - **Reporting**: Counts, HDR latency percentiles, text and JSON reports
//!
//! Transport, topology discovery, and wire decoding are collaborators behind traits.

pub mod cluster;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod report;
pub mod stats;
pub mod transport;
pub mod util;

// Re-export commonly used types
pub use cluster::{NodeId, NodeIdentity, NodeSelector};
pub use command::CommandDescriptor;
pub use dispatch::Dispatcher;
pub use error::ExecutionError;
pub use execution::ExecutionCollection;

/// Result type for application-level code (configuration, reporting)
pub type Result<T> = anyhow::Result<T>;
