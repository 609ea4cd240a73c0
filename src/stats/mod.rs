//! Collection statistics
//!
//! An [`ExecutionSummary`] is a point-in-time account of one collection: how many
//! members succeeded, failed, were cancelled, or are still pending, plus the
//! latency distribution of the members that already settled.
//!
//! # Example
//!
//! ```
//! use nodefan::cluster::NodeIdentity;
//! use nodefan::execution::NodeExecution;
//! use nodefan::stats::ExecutionSummary;
//!
//! let (exec, completer) = NodeExecution::<i64>::standalone(NodeIdentity::master("a", "a:6379"));
//! completer.complete(1).unwrap();
//!
//! let mut summary = ExecutionSummary::new().unwrap();
//! summary.record(&exec);
//! assert_eq!(summary.succeeded, 1);
//! assert!(summary.is_complete());
//! ```

pub mod histogram;

use crate::execution::NodeExecution;
use crate::Result;
use histogram::LatencyHistogram;
use std::time::Duration;

/// Count and latency account of a collection
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    pub total: usize,
    pub succeeded: usize,
    /// Failed members, cancelled ones excluded
    pub failed: usize,
    pub cancelled: usize,
    pub pending: usize,
    latencies: LatencyHistogram,
}

impl ExecutionSummary {
    pub fn new() -> Result<Self> {
        Ok(Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            cancelled: 0,
            pending: 0,
            latencies: LatencyHistogram::new()?,
        })
    }

    /// Account for one member
    pub fn record<T>(&mut self, member: &NodeExecution<T>) {
        self.total += 1;
        if !member.is_done() {
            self.pending += 1;
        } else if member.is_cancelled() {
            self.cancelled += 1;
        } else if member.is_failed() {
            self.failed += 1;
        } else {
            self.succeeded += 1;
        }
        if let Some(latency) = member.latency() {
            self.latencies.record(latency);
        }
    }

    /// Every member terminal
    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }

    /// Every member succeeded
    pub fn all_succeeded(&self) -> bool {
        self.total > 0 && self.succeeded == self.total
    }

    /// Succeeded share of all members, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.total as f64 * 100.0
    }

    pub fn latencies(&self) -> &LatencyHistogram {
        &self.latencies
    }

    pub fn latency_percentile(&self, percentile: f64) -> Option<Duration> {
        self.latencies.percentile(percentile)
    }
}
