//! Command descriptors
//!
//! A [`CommandDescriptor`] bundles what the dispatcher needs to fan a command out:
//! the operation keyword, the argument payload, and the supplier of typed outputs.
//! The keyword and arguments form a [`CommandRequest`] that is shared read-only by
//! every node of one dispatch; the output supplier is invoked once per node.
//!
//! # Modules
//!
//! - `reply`: Untyped replies returned by the transport
//! - `output`: Typed output decoders and suppliers
//! - `builders`: Ready-made node-selection commands (PING, PUBLISH, PUBSUB ...)

pub mod builders;
pub mod output;
pub mod reply;

use crate::error::ExecutionError;
use std::fmt;

pub use builders::NodeSelectionCommands;
pub use output::{CommandOutput, OutputSupplier};
pub use reply::Reply;

/// Operation keyword
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommandKeyword {
    Ping,
    Echo,
    Publish,
    Spublish,
    Pubsub,
    Role,
    Quit,
    Wait,
    /// Any other command, by name
    Custom(String),
}

impl CommandKeyword {
    pub fn custom(name: impl Into<String>) -> Self {
        CommandKeyword::Custom(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            CommandKeyword::Ping => "PING",
            CommandKeyword::Echo => "ECHO",
            CommandKeyword::Publish => "PUBLISH",
            CommandKeyword::Spublish => "SPUBLISH",
            CommandKeyword::Pubsub => "PUBSUB",
            CommandKeyword::Role => "ROLE",
            CommandKeyword::Quit => "QUIT",
            CommandKeyword::Wait => "WAIT",
            CommandKeyword::Custom(name) => name,
        }
    }

    /// Reject custom keywords that name no command
    pub fn validate(&self) -> Result<(), ExecutionError> {
        match self {
            CommandKeyword::Custom(name) if name.trim().is_empty() => {
                Err(ExecutionError::invalid_argument("command keyword is empty"))
            }
            _ => Ok(()),
        }
    }

    /// Parse a command name, mapping known names onto their variants
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "PING" => CommandKeyword::Ping,
            "ECHO" => CommandKeyword::Echo,
            "PUBLISH" => CommandKeyword::Publish,
            "SPUBLISH" => CommandKeyword::Spublish,
            "PUBSUB" => CommandKeyword::Pubsub,
            "ROLE" => CommandKeyword::Role,
            "QUIT" => CommandKeyword::Quit,
            "WAIT" => CommandKeyword::Wait,
            _ => CommandKeyword::Custom(name.to_string()),
        }
    }
}

impl fmt::Display for CommandKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque argument payload, forwarded to every node unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    args: Vec<Vec<u8>>,
}

impl CommandArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key argument
    pub fn add_key(mut self, key: impl AsRef<[u8]>) -> Self {
        self.args.push(key.as_ref().to_vec());
        self
    }

    /// Append a value argument
    pub fn add_value(mut self, value: impl AsRef<[u8]>) -> Self {
        self.args.push(value.as_ref().to_vec());
        self
    }

    /// Append a literal token (subcommand, option name)
    pub fn add_literal(mut self, literal: &str) -> Self {
        self.args.push(literal.as_bytes().to_vec());
        self
    }

    pub fn add_int(mut self, n: i64) -> Self {
        self.args.push(n.to_string().into_bytes());
        self
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.args.iter().map(Vec::as_slice)
    }
}

/// Keyword + arguments, shared read-only by all nodes of one dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub keyword: CommandKeyword,
    pub args: CommandArgs,
}

impl fmt::Display for CommandRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword)?;
        for arg in self.args.iter() {
            write!(f, " {}", String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}

/// Command to fan out: request plus typed output supplier
///
/// The output supplier is optional at construction so descriptors can be built in
/// steps; dispatching a descriptor without one is rejected as an invalid argument.
pub struct CommandDescriptor<T> {
    request: CommandRequest,
    output: Option<OutputSupplier<T>>,
}

impl<T> CommandDescriptor<T> {
    pub fn new(keyword: CommandKeyword) -> Self {
        Self {
            request: CommandRequest {
                keyword,
                args: CommandArgs::new(),
            },
            output: None,
        }
    }

    /// Descriptor with keyword, output supplier, and arguments in one call
    pub fn with_output(keyword: CommandKeyword, output: OutputSupplier<T>, args: CommandArgs) -> Self {
        Self {
            request: CommandRequest { keyword, args },
            output: Some(output),
        }
    }

    pub fn args(mut self, args: CommandArgs) -> Self {
        self.request.args = args;
        self
    }

    pub fn output(mut self, output: OutputSupplier<T>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn request(&self) -> &CommandRequest {
        &self.request
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    pub(crate) fn into_parts(self) -> (CommandRequest, Option<OutputSupplier<T>>) {
        (self.request, self.output)
    }
}

impl<T> fmt::Debug for CommandDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("request", &self.request)
            .field("has_output", &self.output.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_parse_roundtrip() {
        assert_eq!(CommandKeyword::parse("ping"), CommandKeyword::Ping);
        assert_eq!(CommandKeyword::parse("PubSub"), CommandKeyword::Pubsub);
        assert_eq!(
            CommandKeyword::parse("CLUSTER"),
            CommandKeyword::Custom("CLUSTER".to_string())
        );
        assert_eq!(CommandKeyword::Spublish.as_str(), "SPUBLISH");
    }

    #[test]
    fn test_empty_custom_keyword_invalid() {
        assert!(CommandKeyword::custom("  ").validate().is_err());
        assert!(CommandKeyword::custom("CLIENT").validate().is_ok());
        assert!(CommandKeyword::Ping.validate().is_ok());
    }

    #[test]
    fn test_args_builder() {
        let args = CommandArgs::new()
            .add_literal("NUMSUB")
            .add_key("news")
            .add_int(42);
        assert_eq!(args.len(), 3);
        let collected: Vec<&[u8]> = args.iter().collect();
        assert_eq!(collected, vec![&b"NUMSUB"[..], &b"news"[..], &b"42"[..]]);
    }

    #[test]
    fn test_request_display() {
        let request = CommandRequest {
            keyword: CommandKeyword::Publish,
            args: CommandArgs::new().add_key("chan").add_value("hello"),
        };
        assert_eq!(request.to_string(), "PUBLISH chan hello");
    }

    #[test]
    fn test_descriptor_output_presence() {
        let descriptor: CommandDescriptor<String> = CommandDescriptor::new(CommandKeyword::Ping);
        assert!(!descriptor.has_output());

        let descriptor = descriptor.output(output::status());
        assert!(descriptor.has_output());
        assert_eq!(descriptor.request().keyword, CommandKeyword::Ping);
    }
}
