//! Event history log
//!
//! Every user input and agent event becomes a [`HistoryEntry`] holding the
//! text shown to the user plus structured data. Entries are kept in memory
//! and, when a path is configured, appended to a JSONL file one line at a
//! time as they are recorded.

use crate::agent::AgentEvent;
use crate::error::{HoroscopeError, Result};
use crate::storage::{jsonl_line, PlainData};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Kind of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Text typed by the user
    UserInput,
    /// Agent started handling a turn
    AgentUpdated,
    /// Model requested a tool
    ToolCall,
    /// Tool result returned to the model
    ToolOutput,
    /// Final answer
    MessageOutput,
}

/// One recorded history item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Entry kind
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Pre-formatted display text (may contain newlines)
    pub text: String,
    /// When the entry was recorded (UTC)
    pub timestamp: DateTime<Utc>,
    /// Kind of the event the entry was built from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_event_type: Option<String>,
    /// Structured payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl HistoryEntry {
    /// Create an entry stamped with the current time
    pub fn new(kind: EntryKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            timestamp: Utc::now(),
            raw_event_type: None,
            data: None,
        }
    }

    /// Set the originating event kind
    pub fn with_raw_event_type(mut self, raw_event_type: impl Into<String>) -> Self {
        self.raw_event_type = Some(raw_event_type.into());
        self
    }

    /// Attach a structured payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Entry for text typed by the user
    ///
    /// # Examples
    ///
    /// ```
    /// use horoscope_agent::storage::{EntryKind, HistoryEntry};
    ///
    /// let entry = HistoryEntry::user_input("私は水瓶座です。");
    /// assert_eq!(entry.kind, EntryKind::UserInput);
    /// assert_eq!(entry.text, "User: 私は水瓶座です。\n");
    /// ```
    pub fn user_input(text: &str) -> Self {
        Self::new(EntryKind::UserInput, format!("User: {}\n", text))
            .with_raw_event_type("user_input")
            .with_data(json!({ "content": text }))
    }

    /// Entry describing an agent event
    pub fn from_event(event: &AgentEvent) -> Self {
        let entry = match event {
            AgentEvent::AgentUpdated { agent_name } => {
                Self::new(EntryKind::AgentUpdated, format!("Agent updated: {}\n", agent_name))
                    .with_data(json!({ "agent_name": agent_name }))
            }
            AgentEvent::ToolCalled {
                call_id,
                name,
                arguments,
            } => Self::new(EntryKind::ToolCall, "-- Tool was called\n").with_data(json!({
                "tool": name,
                "call_id": call_id,
                "arguments": arguments,
            })),
            AgentEvent::ToolOutput { call_id, name, output } => {
                Self::new(EntryKind::ToolOutput, format!("-- Tool output: {}\n", output))
                    .with_data(json!({
                        "tool": name,
                        "call_id": call_id,
                        "output": output,
                    }))
            }
            AgentEvent::MessageOutput { text } => {
                Self::new(EntryKind::MessageOutput, format!("-- Message output:\n {}\n", text))
                    .with_data(json!({ "message": text }))
            }
        };
        entry.with_raw_event_type(event.kind())
    }
}

/// Index of an entry within its [`EventLog`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub usize);

/// In-memory history log with optional JSONL tail persistence
///
/// # Examples
///
/// ```
/// use horoscope_agent::storage::EventLog;
///
/// let mut log = EventLog::in_memory();
/// let id = log.add_user_input("こんにちは");
/// assert_eq!(log.get(id).unwrap().text, "User: こんにちは\n");
/// ```
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<HistoryEntry>,
    path: Option<PathBuf>,
}

impl EventLog {
    /// Create a log that appends every recorded entry to `path`
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            entries: Vec::new(),
            path,
        }
    }

    /// Create a log that never touches the filesystem
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// JSONL file entries are appended to, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append an entry to the in-memory log
    pub fn record(&mut self, entry: HistoryEntry) -> EntryId {
        self.entries.push(entry);
        EntryId(self.entries.len() - 1)
    }

    /// Record user input and persist it
    pub fn add_user_input(&mut self, text: &str) -> EntryId {
        let id = self.record(HistoryEntry::user_input(text));
        self.persist_last();
        id
    }

    /// Record an agent event and persist it
    pub fn record_event(&mut self, event: &AgentEvent) -> EntryId {
        let id = self.record(HistoryEntry::from_event(event));
        self.persist_last();
        id
    }

    /// Entry by id
    pub fn get(&self, id: EntryId) -> Option<&HistoryEntry> {
        self.entries.get(id.0)
    }

    /// All entries in recording order
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of recorded entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append one entry to the JSONL file
    ///
    /// Does nothing without a configured path. Failures are logged and
    /// swallowed; history persistence never fails a turn.
    pub fn persist_entry(&self, entry: &HistoryEntry) {
        let Some(path) = self.path.as_deref() else {
            return;
        };

        if let Err(e) = append_line(path, &jsonl_line(entry)) {
            tracing::warn!("Failed to persist history entry to {}: {}", path.display(), e);
        }
    }

    /// Append the most recent entry to the JSONL file
    pub fn persist_last(&self) {
        if let Some(entry) = self.entries.last() {
            self.persist_entry(entry);
        }
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HoroscopeError::Persistence(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| HoroscopeError::Persistence(format!("cannot open {}: {}", path.display(), e)))?;

    file.write_all(line.as_bytes())
        .map_err(|e| HoroscopeError::Persistence(format!("cannot write {}: {}", path.display(), e)))?;
    Ok(())
}
