//! Per-node execution
//!
//! One outstanding command on one node. The execution is split in two halves that
//! share the same state:
//!
//! - [`NodeExecution`]: the read side, owned by the collection. Observes state,
//!   waits with a timeout, reads the value.
//! - [`Completer`]: the write side, moved into the node's send task. It is the only
//!   path that settles the execution with a reply (single writer per execution).
//!
//! State starts `Pending` and transitions exactly once to `Succeeded` or `Failed`.
//! A second transition attempt is rejected with `InvalidState` and leaves the stored
//! outcome untouched.

use super::wait::{wait_for, CompletionLatch};
use crate::cluster::{NodeId, NodeIdentity};
use crate::error::{ExecutionError, TransportError};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// Completion state of one node's execution
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionState<T> {
    Pending,
    Succeeded(T),
    Failed(ExecutionError),
}

impl<T> ExecutionState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, ExecutionState::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, ExecutionState::Succeeded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ExecutionState::Failed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutionState::Failed(e) if e.is_cancelled())
    }

    pub fn error(&self) -> Option<&ExecutionError> {
        match self {
            ExecutionState::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Short label used in logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionState::Pending => "pending",
            ExecutionState::Succeeded(_) => "succeeded",
            ExecutionState::Failed(e) if e.is_cancelled() => "cancelled",
            ExecutionState::Failed(_) => "failed",
        }
    }
}

/// State shared by the read and write halves
struct Shared<T> {
    node: NodeIdentity,
    state: watch::Sender<ExecutionState<T>>,
    latch: Arc<CompletionLatch>,
    started: Instant,
    latency: OnceLock<Duration>,
    abort: OnceLock<AbortHandle>,
}

impl<T> Shared<T> {
    /// Apply a terminal transition if still pending
    fn transition(&self, next: ExecutionState<T>) -> Result<(), ExecutionError> {
        let mut next = Some(next);
        let applied = self.state.send_if_modified(|current| {
            match (current.is_pending(), next.take()) {
                (true, Some(state)) => {
                    *current = state;
                    true
                }
                _ => false,
            }
        });

        if !applied {
            return Err(ExecutionError::invalid_state(format!(
                "execution on node '{}' already completed",
                self.node.id
            )));
        }

        let _ = self.latency.set(self.started.elapsed());
        self.latch.count_down();
        Ok(())
    }

    fn is_pending(&self) -> bool {
        self.state.borrow().is_pending()
    }
}

/// Read side of one node's execution
pub struct NodeExecution<T> {
    shared: Arc<Shared<T>>,
}

/// Write side of one node's execution
///
/// Dropping a completer that never settled its execution fails it with
/// [`TransportError::ReplyDropped`], so an abandoned send can never leave a
/// collection waiting forever.
pub struct Completer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> NodeExecution<T> {
    /// Create a pending execution and its completer
    ///
    /// The latch is counted down once when the execution becomes terminal.
    pub fn pending(node: NodeIdentity, latch: Arc<CompletionLatch>) -> (Self, Completer<T>) {
        let (state, _) = watch::channel(ExecutionState::Pending);
        let shared = Arc::new(Shared {
            node,
            state,
            latch,
            started: Instant::now(),
            latency: OnceLock::new(),
            abort: OnceLock::new(),
        });

        (
            Self {
                shared: Arc::clone(&shared),
            },
            Completer { shared },
        )
    }

    /// Standalone execution with its own single-member latch
    pub fn standalone(node: NodeIdentity) -> (Self, Completer<T>) {
        Self::pending(node, Arc::new(CompletionLatch::new(1)))
    }

    /// Node this execution targets
    pub fn node(&self) -> &NodeIdentity {
        &self.shared.node
    }

    /// Id of the target node, the collection's lookup key
    pub fn node_id(&self) -> &NodeId {
        &self.shared.node.id
    }

    /// Non-blocking completion check
    pub fn is_done(&self) -> bool {
        !self.shared.is_pending()
    }

    /// Failed, cancellation included
    pub fn is_failed(&self) -> bool {
        self.shared.state.borrow().is_failed()
    }

    /// Failed because the collection was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.shared.state.borrow().is_cancelled()
    }

    /// State label ("pending", "succeeded", "failed", "cancelled")
    pub fn label(&self) -> &'static str {
        self.shared.state.borrow().label()
    }

    /// Error message of a failed execution
    pub fn error_message(&self) -> Option<String> {
        self.shared.state.borrow().error().map(ToString::to_string)
    }

    /// Time from dispatch to the terminal transition
    pub fn latency(&self) -> Option<Duration> {
        self.shared.latency.get().copied()
    }

    /// Wait for a terminal state
    ///
    /// Returns `Timeout` if the limit elapses first. The execution itself is left
    /// untouched and the node operation keeps running.
    pub async fn wait(&self, timeout: Duration) -> Result<(), ExecutionError> {
        let mut rx = self.shared.state.subscribe();
        if wait_for(&mut rx, Some(timeout), ExecutionState::is_terminal).await {
            Ok(())
        } else {
            Err(ExecutionError::Timeout {
                node: Some(self.node_id().clone()),
                timeout,
            })
        }
    }

    /// Wait for a terminal state without a time limit
    pub async fn join(&self) {
        let mut rx = self.shared.state.subscribe();
        wait_for(&mut rx, None, ExecutionState::is_terminal).await;
    }

    /// Record the handle used to abort the node's send task
    pub(crate) fn set_abort_handle(&self, handle: AbortHandle) {
        let _ = self.shared.abort.set(handle);
    }

    /// Mark the execution cancelled if it is still pending
    ///
    /// Returns `true` if this call performed the transition. With `abort_send` the
    /// node's send task is aborted as well.
    pub(crate) fn cancel(&self, abort_send: bool) -> bool {
        let cancelled = self
            .shared
            .transition(ExecutionState::Failed(ExecutionError::Cancelled {
                node: self.node_id().clone(),
            }))
            .is_ok();

        if cancelled && abort_send {
            if let Some(handle) = self.shared.abort.get() {
                handle.abort();
            }
        }
        cancelled
    }
}

impl<T: Clone> NodeExecution<T> {
    /// Snapshot of the current state
    pub fn state(&self) -> ExecutionState<T> {
        self.shared.state.borrow().clone()
    }

    /// Read the outcome without waiting
    ///
    /// A failed execution returns its stored error verbatim; a pending one is
    /// `InvalidState`.
    pub fn try_get(&self) -> Result<T, ExecutionError> {
        match &*self.shared.state.borrow() {
            ExecutionState::Succeeded(value) => Ok(value.clone()),
            ExecutionState::Failed(error) => Err(error.clone()),
            ExecutionState::Pending => Err(ExecutionError::invalid_state(format!(
                "execution on node '{}' read before completion",
                self.node_id()
            ))),
        }
    }

    /// Wait up to `timeout` and read the outcome
    pub async fn get(&self, timeout: Duration) -> Result<T, ExecutionError> {
        self.wait(timeout).await?;
        self.try_get()
    }
}

impl<T> Completer<T> {
    /// Node whose execution this completer settles
    pub fn node(&self) -> &NodeIdentity {
        &self.shared.node
    }

    /// True until the execution reaches a terminal state
    pub fn is_pending(&self) -> bool {
        self.shared.is_pending()
    }

    /// Transition Pending -> Succeeded
    pub fn complete(&self, value: T) -> Result<(), ExecutionError> {
        self.shared.transition(ExecutionState::Succeeded(value))
    }

    /// Transition Pending -> Failed
    pub fn fail(&self, error: ExecutionError) -> Result<(), ExecutionError> {
        self.shared.transition(ExecutionState::Failed(error))
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if self.shared.is_pending() {
            let _ = self.shared.transition(ExecutionState::Failed(ExecutionError::TransportFailure {
                node: self.shared.node.id.clone(),
                source: TransportError::ReplyDropped,
            }));
        }
    }
}

impl<T> std::fmt::Debug for NodeExecution<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeExecution")
            .field("node", &self.shared.node.id)
            .field("state", &self.shared.state.borrow().label())
            .finish()
    }
}
