//! Raw replies
//!
//! A [`Reply`] is what the transport collaborator hands back after decoding the wire
//! bytes of one node's answer. It is untyped; a [`CommandOutput`](super::output::CommandOutput)
//! turns it into the value the caller asked for.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Decoded but untyped reply from one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    /// Simple status string (e.g. `OK`, `PONG`)
    Status(String),
    /// Error reply sent by the node
    Error(String),
    Integer(i64),
    Bulk(Vec<u8>),
    /// Null bulk / null array
    Nil,
    Array(Vec<Reply>),
}

impl Reply {
    pub fn status(s: impl Into<String>) -> Self {
        Reply::Status(s.into())
    }

    pub fn bulk(bytes: impl Into<Vec<u8>>) -> Self {
        Reply::Bulk(bytes.into())
    }

    /// Short name of the reply shape, used in decode errors
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Status(_) => "status",
            Reply::Error(_) => "error",
            Reply::Integer(_) => "integer",
            Reply::Bulk(_) => "bulk string",
            Reply::Nil => "nil",
            Reply::Array(_) => "array",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Textual view of status and bulk replies
    pub fn as_text(&self) -> Option<String> {
        match self {
            Reply::Status(s) => Some(s.clone()),
            Reply::Bulk(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(s) => f.write_str(s),
            Reply::Error(e) => write!(f, "(error) {}", e),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Bulk(bytes) => write!(f, "\"{}\"", String::from_utf8_lossy(bytes)),
            Reply::Nil => f.write_str("(nil)"),
            Reply::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_display() {
        assert_eq!(Reply::status("OK").to_string(), "OK");
        assert_eq!(Reply::Integer(3).to_string(), "(integer) 3");
        assert_eq!(Reply::bulk("hi").to_string(), "\"hi\"");
        assert_eq!(
            Reply::Array(vec![Reply::bulk("a"), Reply::Integer(1), Reply::Nil]).to_string(),
            "[\"a\", (integer) 1, (nil)]"
        );
    }

    #[test]
    fn test_reply_kind_and_text() {
        assert_eq!(Reply::Nil.kind(), "nil");
        assert!(Reply::Error("ERR".into()).is_error());
        assert_eq!(Reply::bulk("x").as_text().as_deref(), Some("x"));
        assert_eq!(Reply::Integer(1).as_text(), None);
    }
}
