//! Execution collection
//!
//! The object returned by every dispatch: one [`NodeExecution`] per selected node,
//! in dispatch order, plus a node-id index for keyed lookup. Membership is fixed at
//! creation; only the member states change afterwards.
//!
//! There is no implicit fail-fast. A failed node does not cancel or otherwise affect
//! its siblings; callers decide what to do with a partial failure.

use super::node::{ExecutionState, NodeExecution};
use super::wait::{CancelPolicy, CompletionLatch, WaitPolicy};
use crate::cluster::{NodeId, NodeIdentity};
use crate::command::CommandRequest;
use crate::error::ExecutionError;
use crate::stats::ExecutionSummary;
use crate::transport::Transport;
use crate::util::time::as_millis_u64;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Aggregate of the per-node executions created by one dispatch
///
/// Dropping a collection that is not complete cancels its pending members. Under
/// [`CancelPolicy::Abort`] their send tasks are aborted and release their in-flight
/// entries; under [`CancelPolicy::Detach`] the sends keep running to completion.
pub struct ExecutionCollection<T> {
    members: Vec<NodeExecution<T>>,
    index: HashMap<NodeId, usize>,
    latch: Arc<CompletionLatch>,
    request: Arc<CommandRequest>,
    policy: WaitPolicy,
    transport: Option<Arc<dyn Transport>>,
}

impl<T> ExecutionCollection<T> {
    /// Assemble a collection from members that share `latch`
    ///
    /// Node ids must be unique; the dispatcher checks this before creating members.
    pub(crate) fn new(
        members: Vec<NodeExecution<T>>,
        latch: Arc<CompletionLatch>,
        request: Arc<CommandRequest>,
        policy: WaitPolicy,
        transport: Option<Arc<dyn Transport>>,
    ) -> Self {
        let index = members
            .iter()
            .enumerate()
            .map(|(i, m)| (m.node_id().clone(), i))
            .collect();

        Self {
            members,
            index,
            latch,
            request,
            policy,
            transport,
        }
    }

    /// Number of member executions (equals the selection size)
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false for a dispatched collection
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Request shared by every member
    pub fn request(&self) -> &CommandRequest {
        &self.request
    }

    /// Member nodes, in dispatch order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeIdentity> {
        self.members.iter().map(NodeExecution::node)
    }

    /// Member executions, in dispatch order
    pub fn iter(&self) -> std::slice::Iter<'_, NodeExecution<T>> {
        self.members.iter()
    }

    /// Keyed lookup by node id
    pub fn get(&self, node: &NodeId) -> Option<&NodeExecution<T>> {
        self.index.get(node).map(|&i| &self.members[i])
    }

    /// True if `node` is a member of this collection
    pub fn contains(&self, node: &NodeId) -> bool {
        self.index.contains_key(node)
    }

    /// True once every member is terminal, whether or not any failed
    pub fn is_complete(&self) -> bool {
        self.latch.is_released()
    }

    /// Number of members not yet terminal
    pub fn pending_count(&self) -> usize {
        self.members.iter().filter(|m| !m.is_done()).count()
    }

    /// Non-blocking scan for a failed member
    pub fn any_failed(&self) -> bool {
        self.members.iter().any(NodeExecution::is_failed)
    }

    /// Nodes still pending, in dispatch order
    pub fn pending(&self) -> Vec<NodeIdentity> {
        self.members
            .iter()
            .filter(|m| !m.is_done())
            .map(|m| m.node().clone())
            .collect()
    }

    /// Wait until every member is terminal or the timeout elapses
    ///
    /// Waiting never changes member state.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Longest time to wait
    ///
    /// # Returns
    ///
    /// The members still pending, in dispatch order. An empty result means every
    /// node reached a terminal state (succeeded or failed).
    pub async fn await_all(&self, timeout: Duration) -> Vec<NodeIdentity> {
        if self.latch.wait(Some(timeout)).await {
            return Vec::new();
        }

        let pending = self.pending();
        debug!(
            command = %self.request.keyword,
            pending = pending.len(),
            timeout_ms = as_millis_u64(timeout),
            "wait elapsed with nodes still pending"
        );
        pending
    }

    /// [`await_all`](Self::await_all) with the dispatcher's default timeout
    pub async fn await_default(&self) -> Vec<NodeIdentity> {
        self.await_all(self.policy.default_timeout).await
    }

    /// Wait without a time limit
    pub async fn join(&self) {
        self.latch.wait(None).await;
    }

    /// Cancel every member that is still pending
    ///
    /// Terminal members are untouched. Each cancelled node's transport is signalled;
    /// under [`CancelPolicy::Abort`] its send task is aborted as well. Returns the
    /// number of members this call cancelled.
    pub fn cancel(&self) -> usize {
        let abort = self.policy.cancel == CancelPolicy::Abort;
        let mut cancelled = 0;

        for member in &self.members {
            if member.cancel(abort) {
                cancelled += 1;
                if let Some(transport) = &self.transport {
                    transport.cancelled(member.node());
                }
            }
        }

        if cancelled > 0 {
            info!(
                command = %self.request.keyword,
                cancelled,
                policy = ?self.policy.cancel,
                "cancelled pending node executions"
            );
        }
        cancelled
    }

    /// Count and latency account of the collection as of now
    pub fn summary(&self) -> crate::Result<ExecutionSummary> {
        let mut summary = ExecutionSummary::new()?;
        for member in &self.members {
            summary.record(member);
        }
        Ok(summary)
    }
}

impl<T: Clone> ExecutionCollection<T> {
    /// Per-node state snapshot, in dispatch order
    pub fn snapshot(&self) -> Vec<(NodeIdentity, ExecutionState<T>)> {
        self.members
            .iter()
            .map(|m| (m.node().clone(), m.state()))
            .collect()
    }

    /// Failed members and their stored errors
    pub fn failures(&self) -> Vec<(NodeIdentity, ExecutionError)> {
        self.members
            .iter()
            .filter_map(|m| match m.state() {
                ExecutionState::Failed(e) => Some((m.node().clone(), e)),
                _ => None,
            })
            .collect()
    }

    /// Complete per-node account
    ///
    /// Waits up to `timeout`; if any member is still pending the result is `Timeout`
    /// and no partial account is returned.
    pub async fn collect(
        &self,
        timeout: Duration,
    ) -> Result<Vec<(NodeIdentity, Result<T, ExecutionError>)>, ExecutionError> {
        if !self.await_all(timeout).await.is_empty() {
            return Err(ExecutionError::Timeout { node: None, timeout });
        }

        Ok(self
            .members
            .iter()
            .map(|m| (m.node().clone(), m.try_get()))
            .collect())
    }

    /// All values in dispatch order, or the first stored error in dispatch order
    pub async fn values(&self, timeout: Duration) -> Result<Vec<T>, ExecutionError> {
        self.collect(timeout)
            .await?
            .into_iter()
            .map(|(_, result)| result)
            .collect()
    }
}

impl<T> Drop for ExecutionCollection<T> {
    fn drop(&mut self) {
        if !self.is_complete() {
            let cancelled = self.cancel();
            debug!(cancelled, "collection dropped with nodes still pending");
        }
    }
}

impl<'a, T> IntoIterator for &'a ExecutionCollection<T> {
    type Item = &'a NodeExecution<T>;
    type IntoIter = std::slice::Iter<'a, NodeExecution<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

impl<T> std::fmt::Debug for ExecutionCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionCollection")
            .field("command", &self.request.keyword)
            .field("members", &self.members)
            .field("remaining", &self.latch.remaining())
            .finish()
    }
}
