//! Result coercion
//!
//! Turns the transport's outcome for one node into that node's terminal state. Every
//! failure (unreachable node, error reply, reply of the wrong shape, even a panicking
//! decoder) becomes a `Failed` state of that node only. Nothing propagates out of
//! the node's task, so siblings are never affected.

use super::node::Completer;
use crate::cluster::NodeIdentity;
use crate::command::output::CommandOutput;
use crate::command::Reply;
use crate::error::{ExecutionError, TransportError};
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

/// Coerce one node's transport outcome into a typed value or a per-node error
pub fn coerce<T>(
    node: &NodeIdentity,
    outcome: Result<Reply, TransportError>,
    output: Box<dyn CommandOutput<T>>,
) -> Result<T, ExecutionError> {
    let reply = outcome.map_err(|source| ExecutionError::TransportFailure {
        node: node.id.clone(),
        source,
    })?;

    if let Reply::Error(message) = reply {
        return Err(ExecutionError::ServerError {
            node: node.id.clone(),
            message,
        });
    }

    let expected = output.expected();
    match panic::catch_unwind(AssertUnwindSafe(move || output.decode(reply))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ExecutionError::DecodeMismatch {
            node: node.id.clone(),
            expected: expected.to_string(),
            message: e.to_string(),
        }),
        Err(panic) => Err(ExecutionError::DecodeMismatch {
            node: node.id.clone(),
            expected: expected.to_string(),
            message: format!("decoder panicked: {}", panic_message(panic.as_ref())),
        }),
    }
}

/// Coerce and settle the node's execution
///
/// A rejected transition (the execution was already cancelled) is logged and
/// returned, never raised.
pub fn settle<T>(
    completer: &Completer<T>,
    outcome: Result<Reply, TransportError>,
    output: Box<dyn CommandOutput<T>>,
) -> Result<(), ExecutionError> {
    let node = completer.node().clone();
    let settled = match coerce(&node, outcome, output) {
        Ok(value) => completer.complete(value),
        Err(error) => {
            debug!(node = %node.id, error = %error, "node execution failed");
            completer.fail(error)
        }
    };

    if let Err(ref e) = settled {
        debug!(node = %node.id, error = %e, "late result discarded");
    }
    settled
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
