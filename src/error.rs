//! Error types for fan-out execution
//!
//! [`ExecutionError`] is the one taxonomy shared by the dispatcher, the per-node
//! executions, and the wait calls. Caller misuse (`NoNodesSelected`,
//! `InvalidArgument`, `InvalidState`) is returned synchronously; everything else is
//! stored as the Failed state of exactly one node and handed back verbatim on read.

use crate::cluster::NodeId;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while dispatching or reading a fan-out command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The node selection resolved to zero nodes.
    #[error("no nodes selected for dispatch")]
    NoNodesSelected,

    /// The command descriptor or selection is malformed.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The node could not be reached or the send failed.
    #[error("transport failure on node '{node}': {source}")]
    TransportFailure {
        node: NodeId,
        #[source]
        source: TransportError,
    },

    /// The node's reply did not have the shape the output expected.
    #[error("reply from node '{node}' did not match expected {expected}: {message}")]
    DecodeMismatch {
        node: NodeId,
        expected: String,
        message: String,
    },

    /// The node answered with an error reply.
    #[error("node '{node}' replied with error: {message}")]
    ServerError { node: NodeId, message: String },

    /// A blocking wait elapsed. Never stored in an execution.
    #[error("timed out after {timeout:?}{}", waiting_on(.node))]
    Timeout {
        node: Option<NodeId>,
        timeout: Duration,
    },

    /// The execution was cancelled before the node replied.
    #[error("execution on node '{node}' was cancelled")]
    Cancelled { node: NodeId },

    /// Programmer misuse: double completion or reading a pending value.
    #[error("invalid state: {message}")]
    InvalidState { message: String },
}

impl ExecutionError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ExecutionError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        ExecutionError::InvalidState {
            message: message.into(),
        }
    }

    /// True for errors raised synchronously to the direct caller
    pub fn is_caller_misuse(&self) -> bool {
        matches!(
            self,
            ExecutionError::NoNodesSelected
                | ExecutionError::InvalidArgument { .. }
                | ExecutionError::InvalidState { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutionError::Cancelled { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::Timeout { .. })
    }

    /// Node the error is attributed to, if any
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            ExecutionError::TransportFailure { node, .. }
            | ExecutionError::DecodeMismatch { node, .. }
            | ExecutionError::ServerError { node, .. }
            | ExecutionError::Cancelled { node } => Some(node),
            ExecutionError::Timeout { node, .. } => node.as_ref(),
            _ => None,
        }
    }
}

fn waiting_on(node: &Option<NodeId>) -> String {
    match node {
        Some(node) => format!(" waiting for node '{}'", node),
        None => String::new(),
    }
}

/// Failures reported by the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("node unreachable: {0}")]
    Unreachable(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("connection closed before reply")]
    ConnectionClosed,

    /// The send task ended without producing a reply.
    #[error("reply dropped before completion")]
    ReplyDropped,
}

/// A reply that does not fit the expected output shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, got {actual}")]
pub struct DecodeError {
    pub expected: &'static str,
    pub actual: String,
}

impl DecodeError {
    pub fn new(expected: &'static str, actual: impl Into<String>) -> Self {
        Self {
            expected,
            actual: actual.into(),
        }
    }
}
