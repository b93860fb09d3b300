//! Conversation history and session storage
//!
//! Two append-only JSONL stores live here: the [`EventLog`], which records
//! one display entry per agent event, and [`JsonlSession`], which keeps the
//! conversation messages so a chat can be resumed later.

pub mod history;
pub mod session;

pub use history::{EntryId, EntryKind, EventLog, HistoryEntry};
pub use session::{JsonlSession, Session};

use crate::providers::{Message, ToolCall};
use serde::Serialize;

/// Conversion of an entity into plain JSON data for persistence
///
/// Implemented explicitly per stored type. Never fails: if serialization
/// does not succeed the value is stored as a JSON string of its `Debug`
/// rendering so a record is still written.
pub trait PlainData {
    /// Plain JSON representation of `self`
    fn to_plain_data(&self) -> serde_json::Value;
}

fn serialize_or_debug<T: Serialize + std::fmt::Debug>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::warn!("Falling back to debug rendering for stored item: {}", e);
        serde_json::Value::String(format!("{:?}", value))
    })
}

impl PlainData for Message {
    fn to_plain_data(&self) -> serde_json::Value {
        serialize_or_debug(self)
    }
}

impl PlainData for ToolCall {
    fn to_plain_data(&self) -> serde_json::Value {
        serialize_or_debug(self)
    }
}

impl PlainData for HistoryEntry {
    fn to_plain_data(&self) -> serde_json::Value {
        serialize_or_debug(self)
    }
}

/// One JSONL line for `item`, including the trailing newline
pub(crate) fn jsonl_line<T: PlainData>(item: &T) -> String {
    let mut line = item.to_plain_data().to_string();
    line.push('\n');
    line
}
