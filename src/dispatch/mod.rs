//! Command dispatch
//!
//! The [`Dispatcher`] turns one logical command into N independent node operations.
//! For every node of the selection, in selection order, it creates a pending
//! execution, asks the output supplier for a fresh output, and spawns a task that
//! sends the request through the transport and settles the execution with the
//! coerced reply. The collection is returned as soon as every task is spawned; no
//! reply is awaited.
//!
//! # Architecture
//!
//! ```text
//! caller ── dispatch(selector, descriptor)
//!              │
//!              ├── topology.current_nodes(selector)     (once per dispatch)
//!              ├── validate (output, selection, ids)
//!              └── per node: spawn ─► transport.send ─► coerce ─► Completer
//!                                                                  │
//! caller ◄── ExecutionCollection ◄── NodeExecution ◄───────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use nodefan::cluster::{NodeIdentity, NodeSelector, StaticTopology};
//! use nodefan::dispatch::{Dispatcher, InFlightRegistry};
//! use nodefan::transport::MockTransport;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), nodefan::ExecutionError> {
//! let topology = Arc::new(StaticTopology::new(vec![
//!     NodeIdentity::master("a", "10.0.0.1:6379"),
//!     NodeIdentity::master("b", "10.0.0.2:6379"),
//! ]));
//! let dispatcher = Dispatcher::new(topology, Arc::new(MockTransport::new()), Arc::new(InFlightRegistry::new()));
//!
//! let pings = dispatcher.on(NodeSelector::All).ping()?;
//! assert!(pings.await_all(Duration::from_secs(1)).await.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod registry;

use crate::cluster::{NodeIdentity, NodeSelector, Topology};
use crate::command::{CommandDescriptor, NodeSelectionCommands};
use crate::error::ExecutionError;
use crate::execution::{coerce, CompletionLatch, ExecutionCollection, NodeExecution, WaitPolicy};
use crate::transport::Transport;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tracing::{debug, info};

pub use registry::{InFlightGuard, InFlightRegistry};

/// Fans commands out to node selections
pub struct Dispatcher {
    topology: Arc<dyn Topology>,
    transport: Arc<dyn Transport>,
    in_flight: Arc<InFlightRegistry>,
    policy: WaitPolicy,
    runtime: Option<Handle>,
}

impl Dispatcher {
    /// Create a dispatcher over explicitly owned collaborators
    ///
    /// Send tasks run on the runtime current at dispatch time unless
    /// [`with_runtime`](Self::with_runtime) pins one.
    pub fn new(topology: Arc<dyn Topology>, transport: Arc<dyn Transport>, in_flight: Arc<InFlightRegistry>) -> Self {
        Self {
            topology,
            transport,
            in_flight,
            policy: WaitPolicy::default(),
            runtime: None,
        }
    }

    /// Override the wait and cancel defaults handed to every collection
    pub fn with_policy(mut self, policy: WaitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Spawn send tasks on `runtime` instead of the caller's runtime
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Wait and cancel defaults of this dispatcher
    pub fn policy(&self) -> WaitPolicy {
        self.policy
    }

    /// Topology consulted once per dispatch
    pub fn topology(&self) -> &Arc<dyn Topology> {
        &self.topology
    }

    /// Registry of node operations still in flight
    pub fn in_flight(&self) -> &Arc<InFlightRegistry> {
        &self.in_flight
    }

    /// Ready-made commands against one selection
    pub fn on(&self, selector: NodeSelector) -> NodeSelectionCommands<'_> {
        NodeSelectionCommands::new(self, selector)
    }

    /// Resolve `selector` against the topology and fan the command out
    pub fn dispatch<T>(
        &self,
        selector: &NodeSelector,
        descriptor: CommandDescriptor<T>,
    ) -> Result<ExecutionCollection<T>, ExecutionError>
    where
        T: Send + Sync + 'static,
    {
        let nodes = self.topology.current_nodes(selector);
        debug!(selector = %selector, nodes = nodes.len(), "selection resolved");
        self.dispatch_to(nodes, descriptor)
    }

    /// Fan the command out to an already-resolved node list, in the order given
    ///
    /// Caller misuse is rejected before anything is sent: a descriptor without an
    /// output supplier or with an empty command name is `InvalidArgument`, an empty
    /// selection is `NoNodesSelected`, a selection naming a node twice is
    /// `InvalidArgument`, and dispatching outside a runtime is `InvalidState`.
    ///
    /// # Arguments
    ///
    /// * `nodes` - Target nodes; the collection keeps this order
    /// * `descriptor` - Command plus the supplier of per-node outputs
    ///
    /// # Returns
    ///
    /// One pending member per node, returned before any reply arrives.
    pub fn dispatch_to<T>(
        &self,
        nodes: Vec<NodeIdentity>,
        descriptor: CommandDescriptor<T>,
    ) -> Result<ExecutionCollection<T>, ExecutionError>
    where
        T: Send + Sync + 'static,
    {
        let (request, supplier) = descriptor.into_parts();
        let supplier = supplier.ok_or_else(|| {
            ExecutionError::invalid_argument(format!("command {} has no output supplier", request.keyword))
        })?;
        request.keyword.validate()?;

        if nodes.is_empty() {
            return Err(ExecutionError::NoNodesSelected);
        }

        let mut seen = HashSet::with_capacity(nodes.len());
        for node in &nodes {
            if !seen.insert(&node.id) {
                return Err(ExecutionError::invalid_argument(format!(
                    "node '{}' selected more than once",
                    node.id
                )));
            }
        }

        let runtime = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current()
                .map_err(|_| ExecutionError::invalid_state("dispatch requires a running Tokio runtime"))?,
        };

        info!(command = %request.keyword, nodes = nodes.len(), "dispatching command");

        let latch = Arc::new(CompletionLatch::new(nodes.len()));
        let request = Arc::new(request);
        let mut members = Vec::with_capacity(nodes.len());

        for node in nodes {
            // One output per node; outputs are never shared
            let output = supplier();
            let guard = self.in_flight.begin(&node.id);
            let (execution, completer) = NodeExecution::pending(node, Arc::clone(&latch));
            let transport = Arc::clone(&self.transport);
            let request = Arc::clone(&request);

            let task = runtime.spawn(async move {
                let _guard = guard;
                let started = Instant::now();
                let outcome = transport.send(completer.node(), &request).await;
                if coerce::settle(&completer, outcome, output).is_ok() {
                    debug!(
                        node = %completer.node().id,
                        latency_us = started.elapsed().as_micros() as u64,
                        "node execution settled"
                    );
                }
            });
            execution.set_abort_handle(task.abort_handle());
            members.push(execution);
        }

        Ok(ExecutionCollection::new(
            members,
            latch,
            request,
            self.policy,
            Some(Arc::clone(&self.transport)),
        ))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("policy", &self.policy)
            .field("in_flight", &self.in_flight.total())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::StaticTopology;
    use crate::command::{output, CommandArgs, CommandKeyword, Reply};
    use crate::error::TransportError;
    use crate::execution::{CancelPolicy, ExecutionState};
    use crate::transport::{MockTransport, NodeBehavior};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn cluster() -> Vec<NodeIdentity> {
        vec![
            NodeIdentity::master("A", "10.0.0.1:6379"),
            NodeIdentity::master("B", "10.0.0.2:6379"),
            NodeIdentity::replica("C", "10.0.0.3:6379"),
        ]
    }

    fn dispatcher(transport: &MockTransport) -> Dispatcher {
        Dispatcher::new(
            Arc::new(StaticTopology::new(cluster())),
            Arc::new(transport.clone()),
            Arc::new(InFlightRegistry::new()),
        )
    }

    fn ping() -> CommandDescriptor<String> {
        CommandDescriptor::with_output(CommandKeyword::Ping, output::status(), CommandArgs::new())
    }

    fn ok_after(ms: u64) -> NodeBehavior {
        NodeBehavior::reply_after(Duration::from_millis(ms), Reply::status("OK"))
    }

    #[tokio::test]
    async fn test_mixed_outcomes_complete_account() {
        let transport = MockTransport::new();
        transport.set_behavior("A", ok_after(10));
        transport.set_behavior(
            "B",
            NodeBehavior::fail_after(Duration::from_millis(5), TransportError::Unreachable("10.0.0.2:6379".into())),
        );
        transport.set_behavior("C", ok_after(50));

        let collection = dispatcher(&transport).dispatch(&NodeSelector::All, ping()).unwrap();
        assert_eq!(collection.len(), 3);

        assert!(collection.await_all(Duration::from_millis(500)).await.is_empty());
        assert_eq!(collection.get(&"A".into()).unwrap().try_get().unwrap(), "OK");
        assert_eq!(collection.get(&"C".into()).unwrap().try_get().unwrap(), "OK");
        assert_eq!(
            collection.get(&"B".into()).unwrap().try_get().unwrap_err(),
            ExecutionError::TransportFailure {
                node: "B".into(),
                source: TransportError::Unreachable("10.0.0.2:6379".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_await_all_timeout_then_completion() {
        let transport = MockTransport::new();
        transport.set_behavior("A", ok_after(50));

        let collection = dispatcher(&transport)
            .dispatch(&NodeSelector::explicit(["A"]), ping())
            .unwrap();

        let pending = collection.await_all(Duration::from_millis(1)).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id.as_str(), "A");

        assert!(collection.await_all(Duration::from_secs(1)).await.is_empty());
        assert!(collection.get(&"A".into()).unwrap().state().is_succeeded());
    }

    #[tokio::test]
    async fn test_members_follow_selection_order() {
        let transport = MockTransport::new();
        transport.set_behavior("A", ok_after(30));
        transport.set_behavior("C", ok_after(1));

        let collection = dispatcher(&transport)
            .dispatch(&NodeSelector::explicit(["C", "A", "B"]), ping())
            .unwrap();

        let order: Vec<&str> = collection.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["C", "A", "B"]);
        collection.join().await;
    }

    #[tokio::test]
    async fn test_dispatch_returns_before_replies() {
        let transport = MockTransport::new();
        transport.set_default_behavior(NodeBehavior::hang());

        let collection = dispatcher(&transport).dispatch(&NodeSelector::All, ping()).unwrap();
        assert_eq!(collection.pending_count(), 3);
        assert!(!collection.is_complete());
        collection.cancel();
    }

    #[tokio::test]
    async fn test_empty_selection_rejected() {
        let transport = MockTransport::new();
        let err = dispatcher(&transport)
            .dispatch(&NodeSelector::SlotOwner(42), ping())
            .unwrap_err();
        assert_eq!(err, ExecutionError::NoNodesSelected);
        assert!(transport.sent_requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_output_rejected() {
        let transport = MockTransport::new();
        let descriptor: CommandDescriptor<String> = CommandDescriptor::new(CommandKeyword::Ping);

        let err = dispatcher(&transport)
            .dispatch(&NodeSelector::All, descriptor)
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidArgument { .. }));
        assert!(transport.sent_requests().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_nodes_rejected() {
        let transport = MockTransport::new();
        let a = NodeIdentity::master("A", "10.0.0.1:6379");

        let err = dispatcher(&transport)
            .dispatch_to(vec![a.clone(), a], ping())
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidArgument { .. }));
    }

    #[test]
    fn test_dispatch_without_runtime() {
        let transport = MockTransport::new();
        let err = dispatcher(&transport)
            .dispatch(&NodeSelector::All, ping())
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidState { .. }));
    }

    #[test]
    fn test_dispatch_with_explicit_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let transport = MockTransport::new();
        let dispatcher = dispatcher(&transport).with_runtime(runtime.handle().clone());

        let collection = dispatcher.dispatch(&NodeSelector::Masters, ping()).unwrap();
        let pending = runtime.block_on(collection.await_all(Duration::from_secs(1)));
        assert!(pending.is_empty());
        assert_eq!(collection.len(), 2);
    }

    #[tokio::test]
    async fn test_supplier_invoked_once_per_node() {
        let transport = MockTransport::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let status = output::status();
        let supplier: crate::command::OutputSupplier<String> = Arc::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
            status()
        });

        let collection = dispatcher(&transport)
            .dispatch(
                &NodeSelector::All,
                CommandDescriptor::with_output(CommandKeyword::Ping, supplier, CommandArgs::new()),
            )
            .unwrap();
        collection.join().await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_decode_failure_isolated() {
        let transport = MockTransport::new();
        transport.set_behavior(
            "B",
            NodeBehavior::reply_after(Duration::ZERO, Reply::Integer(1)),
        );

        let collection = dispatcher(&transport).dispatch(&NodeSelector::All, ping()).unwrap();
        collection.join().await;

        assert!(matches!(
            collection.get(&"B".into()).unwrap().try_get(),
            Err(ExecutionError::DecodeMismatch { .. })
        ));
        assert!(collection.get(&"A".into()).unwrap().state().is_succeeded());
        assert!(collection.get(&"C".into()).unwrap().state().is_succeeded());
    }

    #[tokio::test]
    async fn test_cancel_abort_releases_in_flight() {
        let transport = MockTransport::new();
        transport.set_behavior("A", ok_after(0));
        transport.set_behavior("B", NodeBehavior::hang());
        transport.set_behavior("C", NodeBehavior::hang());
        let dispatcher = dispatcher(&transport);

        let collection = dispatcher.dispatch(&NodeSelector::All, ping()).unwrap();
        collection.get(&"A".into()).unwrap().join().await;

        assert_eq!(collection.cancel(), 2);
        assert!(collection.await_all(Duration::from_millis(10)).await.is_empty());
        assert_eq!(collection.get(&"A".into()).unwrap().try_get().unwrap(), "OK");
        assert!(collection.get(&"B".into()).unwrap().state().is_cancelled());

        let mut cancelled: Vec<String> = transport
            .cancelled_nodes()
            .iter()
            .map(|n| n.as_str().to_string())
            .collect();
        cancelled.sort();
        assert_eq!(cancelled, vec!["B", "C"]);

        // Aborted tasks drop their in-flight guards
        for _ in 0..100 {
            if dispatcher.in_flight().total() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(dispatcher.in_flight().total(), 0);
    }

    #[tokio::test]
    async fn test_cancel_detach_lets_sends_finish() {
        let transport = MockTransport::new();
        transport.set_default_behavior(ok_after(30));
        let dispatcher = dispatcher(&transport)
            .with_policy(WaitPolicy::new(Duration::from_secs(1), CancelPolicy::Detach));

        let collection = dispatcher.dispatch(&NodeSelector::All, ping()).unwrap();
        assert_eq!(collection.cancel(), 3);

        // Sends keep running; their late replies are discarded
        for _ in 0..100 {
            if transport.finished_count() == 3 && dispatcher.in_flight().total() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(transport.finished_count(), 3);
        assert!(collection.iter().all(|m| m.state().is_cancelled()));
    }

    #[tokio::test]
    async fn test_dropped_collection_releases_hanging_sends() {
        let transport = MockTransport::new();
        transport.set_behavior("A", ok_after(0));
        transport.set_behavior("B", NodeBehavior::hang());
        transport.set_behavior("C", NodeBehavior::hang());
        let dispatcher = dispatcher(&transport);

        let collection = dispatcher.dispatch(&NodeSelector::All, ping()).unwrap();
        collection.get(&"A".into()).unwrap().join().await;
        drop(collection);

        for _ in 0..100 {
            if dispatcher.in_flight().total() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(dispatcher.in_flight().total(), 0);

        let mut cancelled: Vec<String> = transport
            .cancelled_nodes()
            .iter()
            .map(|n| n.as_str().to_string())
            .collect();
        cancelled.sort();
        assert_eq!(cancelled, vec!["B", "C"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_replies_racing_cancel_settle_each_member_once() {
        const NODES: usize = 16;

        for round in 0..20u64 {
            let transport = MockTransport::new();
            transport.set_default_behavior(ok_after(0).with_jitter(Duration::from_millis(2)));
            let dispatcher = dispatcher(&transport);

            let nodes: Vec<NodeIdentity> = (0..NODES)
                .map(|i| NodeIdentity::master(format!("n{}", i), format!("10.0.1.{}:6379", i)))
                .collect();
            let collection = Arc::new(dispatcher.dispatch_to(nodes, ping()).unwrap());

            let canceller = Arc::clone(&collection);
            let cancel = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_micros(500 * (round % 4))).await;
                canceller.cancel()
            });
            let cancelled = cancel.await.unwrap();

            assert!(collection.await_all(Duration::from_secs(1)).await.is_empty());
            assert!(collection.is_complete());

            let mut succeeded = 0;
            for member in collection.iter() {
                match member.state() {
                    ExecutionState::Succeeded(value) => {
                        assert_eq!(value, "OK");
                        succeeded += 1;
                    }
                    ExecutionState::Failed(e) => assert!(e.is_cancelled(), "unexpected failure: {}", e),
                    ExecutionState::Pending => panic!("member {} still pending", member.node_id()),
                }
            }
            assert_eq!(succeeded + cancelled, NODES);
            assert_eq!(transport.cancelled_nodes().len(), cancelled);

            for _ in 0..100 {
                if dispatcher.in_flight().total() == 0 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            assert_eq!(dispatcher.in_flight().total(), 0);
        }
    }
}
