//! Configuration module
//!
//! Handles CLI argument parsing, TOML cluster files, and validation.
//!
//! A cluster file has three sections:
//!
//! ```toml
//! [dispatch]
//! timeout_ms = 500
//! cancel_policy = "abort"      # or "detach"
//! cancel_on_timeout = true
//!
//! [logging]
//! filter = "nodefan=debug"
//! json = false
//!
//! [[nodes]]
//! id = "m1"
//! endpoint = "10.0.0.1:6379"
//! role = "master"
//! slots = ["0-8191"]
//! latency_ms = 5
//! jitter_ms = 2
//! reply = { status = "PONG" }
//! ```

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::cluster::{NodeIdentity, NodeRole, StaticTopology};
use crate::command::Reply;
use crate::error::TransportError;
use crate::execution::{CancelPolicy, WaitPolicy};
use crate::transport::{MockTransport, NodeBehavior};
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Simulated cluster nodes, in topology order
    #[serde(default)]
    pub nodes: Vec<SimulatedNode>,
}

/// Wait and cancellation defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Default wait timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub cancel_policy: CancelPolicy,
    /// Cancel members still pending when the wait times out
    #[serde(default)]
    pub cancel_on_timeout: bool,
}

fn default_timeout_ms() -> u64 {
    1000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            cancel_policy: CancelPolicy::default(),
            cancel_on_timeout: false,
        }
    }
}

impl DispatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::new(self.timeout(), self.cancel_policy)
    }
}

/// Tracing output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `NODEFAN_LOG` overrides it
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of plain text
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

/// One node of the simulated cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedNode {
    pub id: String,
    pub endpoint: String,
    #[serde(default)]
    pub role: NodeRole,
    /// Owned slots: `"start-end"` or a single `"n"`
    #[serde(default)]
    pub slots: Vec<String>,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub jitter_ms: u64,
    #[serde(default)]
    pub reply: SimulatedReply,
}

/// What a simulated node answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulatedReply {
    Status(String),
    Integer(i64),
    Bulk(String),
    /// Error reply from the node
    Error(String),
    /// Transport failure (node unreachable)
    Fail(String),
    Nil,
    /// Never answer
    Hang,
}

impl Default for SimulatedReply {
    fn default() -> Self {
        SimulatedReply::Status("OK".to_string())
    }
}

impl SimulatedNode {
    /// Node identity with parsed slot ranges
    pub fn identity(&self) -> Result<NodeIdentity> {
        let slots = self
            .slots
            .iter()
            .map(|s| cli_convert::parse_slot_range(s))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Invalid slots for node '{}'", self.id))?;

        Ok(NodeIdentity::new(self.id.as_str(), self.endpoint.as_str(), self.role).with_slots(slots))
    }

    /// Scripted transport behavior
    pub fn behavior(&self) -> NodeBehavior {
        let delay = Duration::from_millis(self.latency_ms);
        let behavior = match &self.reply {
            SimulatedReply::Status(s) => NodeBehavior::reply_after(delay, Reply::status(s.as_str())),
            SimulatedReply::Integer(n) => NodeBehavior::reply_after(delay, Reply::Integer(*n)),
            SimulatedReply::Bulk(b) => NodeBehavior::reply_after(delay, Reply::bulk(b.as_bytes())),
            SimulatedReply::Error(e) => NodeBehavior::reply_after(delay, Reply::Error(e.clone())),
            SimulatedReply::Nil => NodeBehavior::reply_after(delay, Reply::Nil),
            SimulatedReply::Fail(reason) => {
                NodeBehavior::fail_after(delay, TransportError::Unreachable(reason.clone()))
            }
            SimulatedReply::Hang => NodeBehavior::hang(),
        };
        behavior.with_jitter(Duration::from_millis(self.jitter_ms))
    }
}

impl Config {
    /// Topology over the configured nodes, in file order
    pub fn topology(&self) -> Result<StaticTopology> {
        let nodes = self
            .nodes
            .iter()
            .map(SimulatedNode::identity)
            .collect::<Result<Vec<_>>>()?;
        Ok(StaticTopology::new(nodes))
    }

    /// Mock transport scripted from the configured nodes
    pub fn mock_transport(&self) -> MockTransport {
        let transport = MockTransport::new();
        for node in &self.nodes {
            transport.set_behavior(node.id.as_str(), node.behavior());
        }
        transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{SlotRange, Topology};
    use crate::transport::MockOutcome;

    fn node(id: &str, reply: SimulatedReply) -> SimulatedNode {
        SimulatedNode {
            id: id.to_string(),
            endpoint: format!("{}:6379", id),
            role: NodeRole::Master,
            slots: vec!["0-99".to_string(), "200".to_string()],
            latency_ms: 5,
            jitter_ms: 0,
            reply,
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.dispatch.timeout(), Duration::from_secs(1));
        assert_eq!(config.dispatch.cancel_policy, CancelPolicy::Abort);
        assert!(!config.dispatch.cancel_on_timeout);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.dispatch.wait_policy(), WaitPolicy::default());
    }

    #[test]
    fn test_identity_parses_slots() {
        let identity = node("m1", SimulatedReply::Nil).identity().unwrap();
        assert_eq!(identity.slots, vec![SlotRange::new(0, 99), SlotRange::single(200)]);
        assert!(identity.owns_slot(200));
        assert!(!identity.owns_slot(150));
    }

    #[test]
    fn test_identity_rejects_bad_slots() {
        let mut bad = node("m1", SimulatedReply::Nil);
        bad.slots = vec!["9-3".to_string()];
        let err = bad.identity().unwrap_err();
        assert!(format!("{:#}", err).contains("m1"));
    }

    #[test]
    fn test_behavior_mapping() {
        let b = node("a", SimulatedReply::Integer(3)).behavior();
        assert_eq!(b.delay, Duration::from_millis(5));
        assert_eq!(b.outcome, MockOutcome::Reply(Reply::Integer(3)));

        let b = node("a", SimulatedReply::Fail("refused".into())).behavior();
        assert_eq!(b.outcome, MockOutcome::Fail(TransportError::Unreachable("refused".into())));

        let b = node("a", SimulatedReply::Hang).behavior();
        assert_eq!(b.outcome, MockOutcome::Hang);
    }

    #[test]
    fn test_topology_and_transport() {
        let config = Config {
            nodes: vec![node("a", SimulatedReply::default()), node("b", SimulatedReply::Hang)],
            ..Config::default()
        };
        let topology = config.topology().unwrap();
        let ids: Vec<String> = topology.nodes().iter().map(|n| n.id.to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let transport = config.mock_transport();
        assert_eq!(transport.behavior_for(&"b".into()).outcome, MockOutcome::Hang);
    }
}
