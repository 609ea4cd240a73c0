//! Dispatch reports
//!
//! A [`DispatchReport`] is a serializable per-node account of one collection, taken
//! at a point in time. It is rendered as text for the console (`text`) or as JSON
//! for files and tooling (`json`).
//!
//! # Modules
//!
//! - `text`: Human-readable console output
//! - `json`: JSON serialization and file output

pub mod json;
pub mod text;

use crate::execution::{ExecutionCollection, ExecutionState};
use crate::stats::ExecutionSummary;
use crate::util::time::format_duration;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Duration with both microseconds and human-readable format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDuration {
    pub micros: u64,
    pub human: String,
}

impl ReportDuration {
    pub fn from_duration(d: Duration) -> Self {
        Self {
            micros: u64::try_from(d.as_micros()).unwrap_or(u64::MAX),
            human: format_duration(d),
        }
    }
}

/// Outcome of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    pub id: String,
    pub endpoint: String,
    pub role: String,
    /// `pending`, `succeeded`, `failed` or `cancelled`
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<ReportDuration>,
}

/// Counts and latency percentiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub pending: usize,
    pub success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<ReportDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p50: Option<ReportDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p99: Option<ReportDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<ReportDuration>,
}

impl From<&ExecutionSummary> for SummaryReport {
    fn from(summary: &ExecutionSummary) -> Self {
        let latencies = summary.latencies();
        Self {
            total: summary.total,
            succeeded: summary.succeeded,
            failed: summary.failed,
            cancelled: summary.cancelled,
            pending: summary.pending,
            success_rate: summary.success_rate(),
            min: latencies.min().map(ReportDuration::from_duration),
            p50: latencies.percentile(50.0).map(ReportDuration::from_duration),
            p99: latencies.percentile(99.0).map(ReportDuration::from_duration),
            max: latencies.max().map(ReportDuration::from_duration),
        }
    }
}

/// Per-node account of one dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// RFC 3339 time the report was taken
    pub generated_at: String,
    pub command: String,
    pub selector: String,
    pub summary: SummaryReport,
    pub nodes: Vec<NodeReport>,
}

impl DispatchReport {
    /// Snapshot `collection`, rendering succeeded values with `render`
    pub fn from_collection<T, F>(collection: &ExecutionCollection<T>, selector: &str, render: F) -> Result<Self>
    where
        T: Clone,
        F: Fn(&T) -> String,
    {
        let summary = collection.summary()?;

        let nodes = collection
            .iter()
            .map(|member| {
                let state = member.state();
                let (value, error) = match &state {
                    ExecutionState::Succeeded(v) => (Some(render(v)), None),
                    ExecutionState::Failed(e) => (None, Some(e.to_string())),
                    ExecutionState::Pending => (None, None),
                };
                let node = member.node();
                NodeReport {
                    id: node.id.to_string(),
                    endpoint: node.endpoint.clone(),
                    role: node.role.to_string(),
                    state: state.label().to_string(),
                    value,
                    error,
                    latency: member.latency().map(ReportDuration::from_duration),
                }
            })
            .collect();

        Ok(Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            command: collection.request().to_string(),
            selector: selector.to_string(),
            summary: SummaryReport::from(&summary),
            nodes,
        })
    }

    /// Nodes that failed or never settled
    pub fn unhealthy_nodes(&self) -> impl Iterator<Item = &NodeReport> {
        self.nodes.iter().filter(|n| n.state != "succeeded")
    }
}
