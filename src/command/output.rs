//! Typed command outputs
//!
//! A [`CommandOutput`] converts one node's [`Reply`] into the value type `T` the caller
//! expects. Outputs may keep state while decoding, so every node gets its own
//! instance: the dispatcher calls the [`OutputSupplier`] once per node and never
//! shares an output between nodes.
//!
//! # Example
//!
//! ```
//! use nodefan::command::output;
//! use nodefan::command::Reply;
//!
//! let supplier = output::integer();
//! let out = supplier();
//! assert_eq!(out.decode(Reply::Integer(7)).unwrap(), 7);
//! ```

use super::reply::Reply;
use crate::error::DecodeError;
use std::sync::Arc;

/// Converts one node's raw reply into a typed value
pub trait CommandOutput<T>: Send {
    /// Name of the reply shape this output accepts
    fn expected(&self) -> &'static str;

    /// Consume the output and decode the reply
    fn decode(self: Box<Self>, reply: Reply) -> Result<T, DecodeError>;
}

/// Produces a fresh output instance for each node
pub type OutputSupplier<T> = Arc<dyn Fn() -> Box<dyn CommandOutput<T>> + Send + Sync>;

/// Build a supplier from a constructor closure
pub fn supplier<T, O, F>(make: F) -> OutputSupplier<T>
where
    O: CommandOutput<T> + 'static,
    F: Fn() -> O + Send + Sync + 'static,
{
    Arc::new(move || Box::new(make()) as Box<dyn CommandOutput<T>>)
}

/// Output backed by a decode function
pub struct FnOutput<T> {
    expected: &'static str,
    decode: Arc<dyn Fn(Reply) -> Result<T, DecodeError> + Send + Sync>,
}

impl<T> CommandOutput<T> for FnOutput<T> {
    fn expected(&self) -> &'static str {
        self.expected
    }

    fn decode(self: Box<Self>, reply: Reply) -> Result<T, DecodeError> {
        (self.decode)(reply)
    }
}

/// Supplier for a stateless decode function
pub fn from_fn<T, F>(expected: &'static str, decode: F) -> OutputSupplier<T>
where
    T: 'static,
    F: Fn(Reply) -> Result<T, DecodeError> + Send + Sync + 'static,
{
    let decode: Arc<dyn Fn(Reply) -> Result<T, DecodeError> + Send + Sync> = Arc::new(decode);
    Arc::new(move || {
        Box::new(FnOutput {
            expected,
            decode: Arc::clone(&decode),
        }) as Box<dyn CommandOutput<T>>
    })
}

/// Status reply (`OK`, `PONG`, ...)
pub struct StatusOutput;

impl CommandOutput<String> for StatusOutput {
    fn expected(&self) -> &'static str {
        "status"
    }

    fn decode(self: Box<Self>, reply: Reply) -> Result<String, DecodeError> {
        match reply {
            Reply::Status(s) => Ok(s),
            // Some servers answer status-like commands with a bulk string
            Reply::Bulk(bytes) => String::from_utf8(bytes)
                .map_err(|_| DecodeError::new("status", "non-utf8 bulk string")),
            other => Err(DecodeError::new("status", other.kind())),
        }
    }
}

/// Integer reply
pub struct IntegerOutput;

impl CommandOutput<i64> for IntegerOutput {
    fn expected(&self) -> &'static str {
        "integer"
    }

    fn decode(self: Box<Self>, reply: Reply) -> Result<i64, DecodeError> {
        match reply {
            Reply::Integer(n) => Ok(n),
            other => Err(DecodeError::new("integer", other.kind())),
        }
    }
}

/// Integer reply interpreted as 0 / 1
pub struct BooleanOutput;

impl CommandOutput<bool> for BooleanOutput {
    fn expected(&self) -> &'static str {
        "boolean"
    }

    fn decode(self: Box<Self>, reply: Reply) -> Result<bool, DecodeError> {
        match reply {
            Reply::Integer(0) => Ok(false),
            Reply::Integer(1) => Ok(true),
            Reply::Integer(n) => Err(DecodeError::new("boolean", format!("integer {}", n))),
            other => Err(DecodeError::new("boolean", other.kind())),
        }
    }
}

/// Bulk string reply, `None` for nil
pub struct BulkOutput;

impl CommandOutput<Option<Vec<u8>>> for BulkOutput {
    fn expected(&self) -> &'static str {
        "bulk string"
    }

    fn decode(self: Box<Self>, reply: Reply) -> Result<Option<Vec<u8>>, DecodeError> {
        match reply {
            Reply::Bulk(bytes) => Ok(Some(bytes)),
            Reply::Nil => Ok(None),
            other => Err(DecodeError::new("bulk string", other.kind())),
        }
    }
}

/// Array of keys / channel names
#[derive(Default)]
pub struct KeyListOutput {
    keys: Vec<String>,
}

impl CommandOutput<Vec<String>> for KeyListOutput {
    fn expected(&self) -> &'static str {
        "array of strings"
    }

    fn decode(mut self: Box<Self>, reply: Reply) -> Result<Vec<String>, DecodeError> {
        let items = match reply {
            Reply::Array(items) => items,
            Reply::Nil => return Ok(Vec::new()),
            other => return Err(DecodeError::new("array of strings", other.kind())),
        };

        for item in items {
            match item.as_text() {
                Some(key) => self.keys.push(key),
                None => {
                    return Err(DecodeError::new(
                        "array of strings",
                        format!("array containing {}", item.kind()),
                    ))
                }
            }
        }
        Ok(self.keys)
    }
}

/// Flat `[key, count, key, count, ...]` array (e.g. `PUBSUB NUMSUB`)
///
/// Pairs keep the order the node returned them in.
#[derive(Default)]
pub struct KeyCountOutput {
    pairs: Vec<(String, i64)>,
}

impl CommandOutput<Vec<(String, i64)>> for KeyCountOutput {
    fn expected(&self) -> &'static str {
        "key/count pairs"
    }

    fn decode(mut self: Box<Self>, reply: Reply) -> Result<Vec<(String, i64)>, DecodeError> {
        let items = match reply {
            Reply::Array(items) => items,
            other => return Err(DecodeError::new("key/count pairs", other.kind())),
        };
        if items.len() % 2 != 0 {
            return Err(DecodeError::new(
                "key/count pairs",
                format!("array of odd length {}", items.len()),
            ));
        }

        let mut iter = items.into_iter();
        while let (Some(key), Some(count)) = (iter.next(), iter.next()) {
            let key = key
                .as_text()
                .ok_or_else(|| DecodeError::new("key/count pairs", format!("key of type {}", key.kind())))?;
            let count = match count {
                Reply::Integer(n) => n,
                other => {
                    return Err(DecodeError::new(
                        "key/count pairs",
                        format!("count of type {}", other.kind()),
                    ))
                }
            };
            self.pairs.push((key, count));
        }
        Ok(self.pairs)
    }
}

/// Array reply with untyped elements (e.g. `ROLE`)
pub struct ArrayOutput;

impl CommandOutput<Vec<Reply>> for ArrayOutput {
    fn expected(&self) -> &'static str {
        "array"
    }

    fn decode(self: Box<Self>, reply: Reply) -> Result<Vec<Reply>, DecodeError> {
        match reply {
            Reply::Array(items) => Ok(items),
            other => Err(DecodeError::new("array", other.kind())),
        }
    }
}

/// Pass-through output; accepts any non-error reply
pub struct RawOutput;

impl CommandOutput<Reply> for RawOutput {
    fn expected(&self) -> &'static str {
        "any reply"
    }

    fn decode(self: Box<Self>, reply: Reply) -> Result<Reply, DecodeError> {
        Ok(reply)
    }
}

pub fn status() -> OutputSupplier<String> {
    supplier(|| StatusOutput)
}

pub fn integer() -> OutputSupplier<i64> {
    supplier(|| IntegerOutput)
}

pub fn boolean() -> OutputSupplier<bool> {
    supplier(|| BooleanOutput)
}

pub fn bulk() -> OutputSupplier<Option<Vec<u8>>> {
    supplier(|| BulkOutput)
}

pub fn key_list() -> OutputSupplier<Vec<String>> {
    supplier(KeyListOutput::default)
}

pub fn key_counts() -> OutputSupplier<Vec<(String, i64)>> {
    supplier(KeyCountOutput::default)
}

pub fn array() -> OutputSupplier<Vec<Reply>> {
    supplier(|| ArrayOutput)
}

pub fn raw() -> OutputSupplier<Reply> {
    supplier(|| RawOutput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_status_output() {
        let out = status()();
        assert_eq!(out.expected(), "status");
        assert_eq!(out.decode(Reply::status("PONG")).unwrap(), "PONG");

        let err = status()().decode(Reply::Integer(1)).unwrap_err();
        assert_eq!(err, DecodeError::new("status", "integer"));
    }

    #[test]
    fn test_integer_and_boolean_output() {
        assert_eq!(integer()().decode(Reply::Integer(-4)).unwrap(), -4);
        assert!(integer()().decode(Reply::Nil).is_err());

        assert!(boolean()().decode(Reply::Integer(1)).unwrap());
        assert!(!boolean()().decode(Reply::Integer(0)).unwrap());
        assert!(boolean()().decode(Reply::Integer(2)).is_err());
    }

    #[test]
    fn test_bulk_output() {
        assert_eq!(bulk()().decode(Reply::bulk("v")).unwrap(), Some(b"v".to_vec()));
        assert_eq!(bulk()().decode(Reply::Nil).unwrap(), None);
        assert!(bulk()().decode(Reply::Integer(1)).is_err());
    }

    #[test]
    fn test_key_list_output() {
        let reply = Reply::Array(vec![Reply::bulk("news"), Reply::bulk("sports")]);
        assert_eq!(key_list()().decode(reply).unwrap(), vec!["news", "sports"]);

        let mixed = Reply::Array(vec![Reply::bulk("news"), Reply::Integer(1)]);
        let err = key_list()().decode(mixed).unwrap_err();
        assert_eq!(err.actual, "array containing integer");
    }

    #[test]
    fn test_key_count_output() {
        let reply = Reply::Array(vec![
            Reply::bulk("news"),
            Reply::Integer(3),
            Reply::bulk("sports"),
            Reply::Integer(0),
        ]);
        assert_eq!(
            key_counts()().decode(reply).unwrap(),
            vec![("news".to_string(), 3), ("sports".to_string(), 0)]
        );

        let odd = Reply::Array(vec![Reply::bulk("news")]);
        assert!(key_counts()().decode(odd).is_err());
    }

    #[test]
    fn test_from_fn_output() {
        let supplier = from_fn("length", |reply| match reply {
            Reply::Bulk(b) => Ok(b.len()),
            other => Err(DecodeError::new("length", other.kind())),
        });
        let out = supplier();
        assert_eq!(out.expected(), "length");
        assert_eq!(out.decode(Reply::bulk("abcd")).unwrap(), 4);
    }

    #[test]
    fn test_supplier_creates_fresh_instances() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let supplier: OutputSupplier<Vec<String>> = supplier(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            KeyListOutput::default()
        });

        let first = supplier();
        let second = supplier();
        assert_eq!(created.load(Ordering::SeqCst), 2);

        // Each instance accumulates independently
        let a = first.decode(Reply::Array(vec![Reply::bulk("a")])).unwrap();
        let b = second.decode(Reply::Array(vec![Reply::bulk("b")])).unwrap();
        assert_eq!(a, vec!["a"]);
        assert_eq!(b, vec!["b"]);
    }
}
