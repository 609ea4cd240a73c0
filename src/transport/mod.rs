//! Node transport abstraction
//!
//! The dispatcher never talks to a node directly. It hands the shared request to a
//! [`Transport`], once per selected node, from that node's own task. The transport
//! returns the node's untyped [`Reply`] or a [`TransportError`]; typing the reply is
//! the dispatcher's job.
//!
//! Connection management, retries, and redirects belong to the transport
//! implementation and are out of scope here.
//!
//! # Implementations
//!
//! - [`mock::MockTransport`]: Scripted per-node behavior for tests and simulation

pub mod mock;

use crate::cluster::NodeIdentity;
use crate::command::{CommandRequest, Reply};
use crate::error::TransportError;
use async_trait::async_trait;

pub use mock::{MockOutcome, MockTransport, NodeBehavior};

/// Sends one request to one node
///
/// Implementations must be safe to call concurrently for different nodes; the
/// dispatcher issues every node's send in parallel.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` to `node` and wait for its reply
    async fn send(&self, node: &NodeIdentity, request: &CommandRequest) -> Result<Reply, TransportError>;

    /// Notification that the caller cancelled the node's execution
    ///
    /// Called after the execution has been marked cancelled. Whether the send task
    /// is also aborted depends on the dispatcher's cancel policy.
    fn cancelled(&self, _node: &NodeIdentity) {}
}
