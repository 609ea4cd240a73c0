//! Node-selection commands
//!
//! Ready-made commands for a selection of nodes, each a thin builder over
//! [`Dispatcher::dispatch`]: it assembles the argument payload, picks the output
//! supplier, and fans the command out. Every method returns the collection
//! immediately; nothing waits for a reply.
//!
//! # Example
//!
//! ```no_run
//! use nodefan::cluster::NodeSelector;
//! use nodefan::dispatch::Dispatcher;
//! use std::time::Duration;
//!
//! # async fn run(dispatcher: &Dispatcher) -> Result<(), nodefan::ExecutionError> {
//! let counts = dispatcher.on(NodeSelector::Masters).pubsub_numsub(&["news", "alerts"])?;
//! for (node, result) in counts.collect(Duration::from_secs(1)).await? {
//!     println!("{}: {:?}", node.id, result);
//! }
//! # Ok(())
//! # }
//! ```

use super::output::{self, OutputSupplier};
use super::{CommandArgs, CommandDescriptor, CommandKeyword, Reply};
use crate::cluster::NodeSelector;
use crate::dispatch::Dispatcher;
use crate::error::ExecutionError;
use crate::execution::ExecutionCollection;

type Fanout<T> = Result<ExecutionCollection<T>, ExecutionError>;

/// Commands bound to one node selection
#[derive(Debug)]
pub struct NodeSelectionCommands<'a> {
    dispatcher: &'a Dispatcher,
    selector: NodeSelector,
}

impl<'a> NodeSelectionCommands<'a> {
    pub fn new(dispatcher: &'a Dispatcher, selector: NodeSelector) -> Self {
        Self { dispatcher, selector }
    }

    pub fn selector(&self) -> &NodeSelector {
        &self.selector
    }

    /// Post a message to a channel; each node reports its receiver count
    pub fn publish(&self, channel: &str, message: impl AsRef<[u8]>) -> Fanout<i64> {
        let args = CommandArgs::new().add_key(channel).add_value(message);
        self.dispatch(CommandKeyword::Publish, output::integer(), args)
    }

    /// Active channels, optionally restricted to those matching `pattern`
    pub fn pubsub_channels(&self, pattern: Option<&str>) -> Fanout<Vec<String>> {
        let mut args = CommandArgs::new().add_literal("CHANNELS");
        if let Some(pattern) = pattern {
            args = args.add_key(pattern);
        }
        self.dispatch(CommandKeyword::Pubsub, output::key_list(), args)
    }

    /// Subscriber counts of the given channels
    pub fn pubsub_numsub(&self, channels: &[&str]) -> Fanout<Vec<(String, i64)>> {
        let args = channels
            .iter()
            .fold(CommandArgs::new().add_literal("NUMSUB"), |args, c| args.add_key(c));
        self.dispatch(CommandKeyword::Pubsub, output::key_counts(), args)
    }

    /// Active shard channels, optionally restricted to those matching `pattern`
    pub fn pubsub_shard_channels(&self, pattern: Option<&str>) -> Fanout<Vec<String>> {
        let mut args = CommandArgs::new().add_literal("SHARDCHANNELS");
        if let Some(pattern) = pattern {
            args = args.add_key(pattern);
        }
        self.dispatch(CommandKeyword::Pubsub, output::key_list(), args)
    }

    /// Subscriber counts of the given shard channels
    pub fn pubsub_shard_numsub(&self, channels: &[&str]) -> Fanout<Vec<(String, i64)>> {
        let args = channels
            .iter()
            .fold(CommandArgs::new().add_literal("SHARDNUMSUB"), |args, c| args.add_key(c));
        self.dispatch(CommandKeyword::Pubsub, output::key_counts(), args)
    }

    /// Number of pattern subscriptions
    pub fn pubsub_numpat(&self) -> Fanout<i64> {
        let args = CommandArgs::new().add_literal("NUMPAT");
        self.dispatch(CommandKeyword::Pubsub, output::integer(), args)
    }

    /// Post a message to a shard channel
    pub fn spublish(&self, shard_channel: &str, message: impl AsRef<[u8]>) -> Fanout<i64> {
        let args = CommandArgs::new().add_key(shard_channel).add_value(message);
        self.dispatch(CommandKeyword::Spublish, output::integer(), args)
    }

    pub fn echo(&self, message: impl AsRef<[u8]>) -> Fanout<Option<Vec<u8>>> {
        let args = CommandArgs::new().add_value(message);
        self.dispatch(CommandKeyword::Echo, output::bulk(), args)
    }

    /// Replication role of each node, as the raw reply array
    pub fn role(&self) -> Fanout<Vec<Reply>> {
        self.dispatch(CommandKeyword::Role, output::array(), CommandArgs::new())
    }

    pub fn ping(&self) -> Fanout<String> {
        self.dispatch(CommandKeyword::Ping, output::status(), CommandArgs::new())
    }

    /// Ask each node to close the connection
    pub fn quit(&self) -> Fanout<String> {
        self.dispatch(CommandKeyword::Quit, output::status(), CommandArgs::new())
    }

    /// Block each node until `replicas` replicas acknowledged prior writes, or
    /// `timeout_ms` elapsed on the node; reports the acknowledged replica count
    pub fn wait_for_replication(&self, replicas: u32, timeout_ms: u64) -> Fanout<i64> {
        let args = CommandArgs::new()
            .add_int(i64::from(replicas))
            .add_int(timeout_ms.min(i64::MAX as u64) as i64);
        self.dispatch(CommandKeyword::Wait, output::integer(), args)
    }

    /// Any command, decoded by a fresh output from `supplier` on every node
    pub fn dispatch<T>(&self, keyword: CommandKeyword, supplier: OutputSupplier<T>, args: CommandArgs) -> Fanout<T>
    where
        T: Send + Sync + 'static,
    {
        self.dispatcher.dispatch(
            &self.selector,
            CommandDescriptor::with_output(keyword, supplier, args),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{NodeIdentity, StaticTopology};
    use crate::dispatch::InFlightRegistry;
    use crate::transport::{MockTransport, NodeBehavior};
    use std::sync::Arc;
    use std::time::Duration;

    fn setup(transport: &MockTransport) -> Dispatcher {
        let topology = StaticTopology::new(vec![
            NodeIdentity::master("m1", "10.0.0.1:6379"),
            NodeIdentity::master("m2", "10.0.0.2:6379"),
            NodeIdentity::replica("r1", "10.0.0.3:6379"),
        ]);
        Dispatcher::new(
            Arc::new(topology),
            Arc::new(transport.clone()),
            Arc::new(InFlightRegistry::new()),
        )
    }

    fn sent_commands(transport: &MockTransport) -> Vec<String> {
        transport.sent_requests().into_iter().map(|r| r.command).collect()
    }

    #[tokio::test]
    async fn test_publish_to_masters() {
        let transport = MockTransport::new();
        transport.set_default_behavior(NodeBehavior::reply_after(Duration::ZERO, Reply::Integer(2)));
        let dispatcher = setup(&transport);

        let counts = dispatcher.on(NodeSelector::Masters).publish("news", "hello").unwrap();
        assert_eq!(counts.values(Duration::from_secs(1)).await.unwrap(), vec![2, 2]);
        assert_eq!(sent_commands(&transport), vec!["PUBLISH news hello"; 2]);
    }

    #[tokio::test]
    async fn test_pubsub_arguments() {
        let transport = MockTransport::new();
        transport.set_default_behavior(NodeBehavior::reply_after(Duration::ZERO, Reply::Array(vec![])));
        let dispatcher = setup(&transport);
        let on = dispatcher.on(NodeSelector::explicit(["m1"]));

        on.pubsub_channels(None).unwrap().join().await;
        on.pubsub_channels(Some("news.*")).unwrap().join().await;
        on.pubsub_shard_numsub(&["a", "b"]).unwrap().join().await;

        assert_eq!(
            sent_commands(&transport),
            vec![
                "PUBSUB CHANNELS",
                "PUBSUB CHANNELS news.*",
                "PUBSUB SHARDNUMSUB a b",
            ]
        );
    }

    #[tokio::test]
    async fn test_numsub_pairs() {
        let transport = MockTransport::new();
        transport.set_default_behavior(NodeBehavior::reply_after(
            Duration::ZERO,
            Reply::Array(vec![Reply::bulk("news"), Reply::Integer(3)]),
        ));
        let dispatcher = setup(&transport);

        let counts = dispatcher.on(NodeSelector::explicit(["m2"])).pubsub_numsub(&["news"]).unwrap();
        let values = counts.values(Duration::from_secs(1)).await.unwrap();
        assert_eq!(values, vec![vec![("news".to_string(), 3)]]);
    }

    #[tokio::test]
    async fn test_wait_and_ping_on_replicas() {
        let transport = MockTransport::new();
        transport.set_default_behavior(NodeBehavior::reply_after(Duration::ZERO, Reply::status("PONG")));
        let dispatcher = setup(&transport);

        let pongs = dispatcher.on(NodeSelector::Replicas).ping().unwrap();
        assert_eq!(pongs.values(Duration::from_secs(1)).await.unwrap(), vec!["PONG"]);

        transport.set_default_behavior(NodeBehavior::reply_after(Duration::ZERO, Reply::Integer(1)));
        let acks = dispatcher.on(NodeSelector::Replicas).wait_for_replication(1, 100).unwrap();
        assert_eq!(acks.values(Duration::from_secs(1)).await.unwrap(), vec![1]);
        assert_eq!(sent_commands(&transport).last().unwrap(), "WAIT 1 100");
    }

    #[tokio::test]
    async fn test_generic_dispatch() {
        let transport = MockTransport::new();
        transport.set_default_behavior(NodeBehavior::reply_after(Duration::ZERO, Reply::bulk("v")));
        let dispatcher = setup(&transport);

        let replies = dispatcher
            .on(NodeSelector::All)
            .dispatch(
                CommandKeyword::custom("GET"),
                output::raw(),
                CommandArgs::new().add_key("k"),
            )
            .unwrap();
        assert_eq!(replies.values(Duration::from_secs(1)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_selection() {
        let transport = MockTransport::new();
        let dispatcher = setup(&transport);
        let err = dispatcher.on(NodeSelector::explicit(["nope"])).ping().unwrap_err();
        assert_eq!(err, ExecutionError::NoNodesSelected);
    }
}
