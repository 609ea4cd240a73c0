//! Mock transport for testing and simulation
//!
//! Simulates a cluster without any network: each node is scripted with a delay and
//! an outcome (a reply, a transport failure, or never answering). Every request and
//! every cancellation signal is recorded for verification.
//!
//! # Features
//!
//! - Per-node behavior with a fallback default
//! - Optional random jitter on top of the fixed delay
//! - Nodes that never answer, for timeout and cancellation tests
//! - Thread-safe request tracking
//!
//! # Example
//!
//! ```
//! use nodefan::transport::{MockTransport, NodeBehavior};
//! use nodefan::command::Reply;
//! use std::time::Duration;
//!
//! let transport = MockTransport::new();
//! transport.set_behavior("a", NodeBehavior::reply_after(Duration::from_millis(10), Reply::status("OK")));
//! transport.set_behavior("b", NodeBehavior::hang());
//! assert!(transport.sent_requests().is_empty());
//! ```

use super::Transport;
use crate::cluster::{NodeId, NodeIdentity};
use crate::command::{CommandRequest, Reply};
use crate::error::TransportError;
use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::trace;

/// What a scripted node does once its delay has elapsed
#[derive(Debug, Clone, PartialEq)]
pub enum MockOutcome {
    Reply(Reply),
    Fail(TransportError),
    /// Never answer
    Hang,
}

/// Scripted behavior of one node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBehavior {
    pub delay: Duration,
    /// Upper bound of a uniform random delay added to `delay`
    pub jitter: Duration,
    pub outcome: MockOutcome,
}

impl NodeBehavior {
    pub fn reply_after(delay: Duration, reply: Reply) -> Self {
        Self {
            delay,
            jitter: Duration::ZERO,
            outcome: MockOutcome::Reply(reply),
        }
    }

    pub fn fail_after(delay: Duration, error: TransportError) -> Self {
        Self {
            delay,
            jitter: Duration::ZERO,
            outcome: MockOutcome::Fail(error),
        }
    }

    pub fn hang() -> Self {
        Self {
            delay: Duration::ZERO,
            jitter: Duration::ZERO,
            outcome: MockOutcome::Hang,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn total_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let max = self.jitter.as_micros() as u64;
        let extra = rand::thread_rng().gen_range(0..=max);
        self.delay + Duration::from_micros(extra)
    }
}

impl Default for NodeBehavior {
    /// Immediate `+OK`
    fn default() -> Self {
        Self::reply_after(Duration::ZERO, Reply::status("OK"))
    }
}

/// Record of a request handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    pub node: NodeId,
    pub command: String,
}

/// Scripted in-memory transport
#[derive(Clone, Default)]
pub struct MockTransport {
    behaviors: Arc<Mutex<HashMap<NodeId, NodeBehavior>>>,
    default_behavior: Arc<Mutex<NodeBehavior>>,
    sent: Arc<Mutex<Vec<SentRecord>>>,
    cancelled: Arc<Mutex<Vec<NodeId>>>,
    finished: Arc<AtomicUsize>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Every node answers `+OK` immediately until scripted otherwise
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_behavior(&self, node: impl Into<NodeId>, behavior: NodeBehavior) {
        lock(&self.behaviors).insert(node.into(), behavior);
    }

    /// Behavior for nodes without their own script
    pub fn set_default_behavior(&self, behavior: NodeBehavior) {
        *lock(&self.default_behavior) = behavior;
    }

    pub fn behavior_for(&self, node: &NodeId) -> NodeBehavior {
        lock(&self.behaviors)
            .get(node)
            .cloned()
            .unwrap_or_else(|| lock(&self.default_behavior).clone())
    }

    /// Requests handed to the transport so far, in send order
    pub fn sent_requests(&self) -> Vec<SentRecord> {
        lock(&self.sent).clone()
    }

    /// Nodes whose cancellation was signalled
    pub fn cancelled_nodes(&self) -> Vec<NodeId> {
        lock(&self.cancelled).clone()
    }

    /// Sends that ran to the end of their delay (hanging nodes never count)
    pub fn finished_count(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        lock(&self.sent).clear();
        lock(&self.cancelled).clear();
        self.finished.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, node: &NodeIdentity, request: &CommandRequest) -> Result<Reply, TransportError> {
        lock(&self.sent).push(SentRecord {
            node: node.id.clone(),
            command: request.to_string(),
        });

        let behavior = self.behavior_for(&node.id);
        if behavior.outcome == MockOutcome::Hang {
            trace!(node = %node.id, "mock node will never answer");
            std::future::pending::<()>().await;
        }

        let delay = behavior.total_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        trace!(node = %node.id, delay_us = delay.as_micros() as u64, "mock node answered");

        match behavior.outcome {
            MockOutcome::Reply(reply) => Ok(reply),
            MockOutcome::Fail(error) => Err(error),
            MockOutcome::Hang => Err(TransportError::ConnectionClosed),
        }
    }

    fn cancelled(&self, node: &NodeIdentity) {
        lock(&self.cancelled).push(node.id.clone());
    }
}
