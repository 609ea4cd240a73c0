//! Ambient helpers
//!
//! - `logging`: Tracing subscriber setup for the binary
//! - `time`: Duration formatting

pub mod logging;
pub mod time;
