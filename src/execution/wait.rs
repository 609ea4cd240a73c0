//! Wait policy
//!
//! One wake-up protocol backs every blocking call in the engine. State lives in
//! `tokio::sync::watch` channels: a waiter subscribes and then checks the current
//! value before sleeping, and every transition marks the channel changed. A
//! transition that lands between the check and the sleep therefore still wakes the
//! waiter.
//!
//! The policy also carries the defaults shared by every collection of a dispatcher:
//! the default wait timeout and what cancellation does to in-flight sends.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;

/// Counts members of a collection that have not reached a terminal state
#[derive(Debug)]
pub struct CompletionLatch {
    remaining: watch::Sender<usize>,
}

impl CompletionLatch {
    /// Latch waiting on `count` terminal transitions
    pub fn new(count: usize) -> Self {
        let (remaining, _) = watch::channel(count);
        Self { remaining }
    }

    /// Record one terminal transition
    pub fn count_down(&self) {
        self.remaining.send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Members not yet terminal
    pub fn remaining(&self) -> usize {
        *self.remaining.borrow()
    }

    /// True once every member is terminal
    pub fn is_released(&self) -> bool {
        self.remaining() == 0
    }

    /// Wait until the count reaches zero
    ///
    /// Returns `false` if the timeout elapsed first. `None` waits without limit.
    pub async fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut rx = self.remaining.subscribe();
        wait_for(&mut rx, timeout, |n| *n == 0).await
    }
}

/// Wait until `done` holds for the watched value, or the timeout elapses
///
/// The predicate is checked against the current value before waiting, so a value
/// published before the call is never missed.
pub(crate) async fn wait_for<T>(
    rx: &mut watch::Receiver<T>,
    timeout: Option<Duration>,
    mut done: impl FnMut(&T) -> bool,
) -> bool {
    let waited = match timeout {
        Some(limit) => match tokio::time::timeout(limit, rx.wait_for(|v| done(v))).await {
            Ok(result) => result.is_ok(),
            Err(_) => return false,
        },
        None => rx.wait_for(|v| done(v)).await.is_ok(),
    };

    // A closed channel cannot change again; decide from the last value
    waited || done(&rx.borrow())
}

/// What cancelling a collection does to sends that are still in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CancelPolicy {
    /// Mark pending members cancelled and abort their send tasks
    #[default]
    Abort,
    /// Mark pending members cancelled; the sends run to completion and their
    /// late results are discarded
    Detach,
}

/// Defaults shared by the collections of one dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub default_timeout: Duration,
    pub cancel: CancelPolicy,
}

impl WaitPolicy {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

    pub fn new(default_timeout: Duration, cancel: CancelPolicy) -> Self {
        Self {
            default_timeout,
            cancel,
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT, CancelPolicy::Abort)
    }
}
