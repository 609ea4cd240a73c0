//! Execution tracking
//!
//! Everything that happens after a command has been handed to the nodes:
//!
//! - `node`: Per-node execution (read side) and its single writer
//! - `collection`: The aggregate returned by a dispatch
//! - `wait`: Completion latch, wait helper and wait/cancel policy
//! - `coerce`: Reply to typed value (or per-node error) conversion

pub mod coerce;
pub mod collection;
pub mod node;
pub mod wait;

pub use collection::ExecutionCollection;
pub use node::{Completer, ExecutionState, NodeExecution};
pub use wait::{CancelPolicy, CompletionLatch, WaitPolicy};
