//! JSONL-backed conversation sessions
//!
//! A session is the list of conversation items stored under
//! `{base_dir}/{session_id}.jsonl`, one JSON object per line. The file is
//! read once, lazily; after that the in-process cache is authoritative and
//! every change is written through.

use crate::error::{HoroscopeError, Result};
use crate::providers::Message;
use crate::storage::{jsonl_line, PlainData};

use serde::de::DeserializeOwned;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Storage of the items of one conversation
pub trait Session<T> {
    /// Identifier of the session
    fn session_id(&self) -> &str;

    /// The last `limit` items in insertion order
    ///
    /// `None`, `Some(0)` and limits past the end return every item.
    fn get_items(&mut self, limit: Option<usize>) -> Vec<T>;

    /// Append items to the end of the session
    fn add_items(&mut self, items: &[T]);

    /// Remove and return the most recent item
    fn pop_item(&mut self) -> Option<T>;

    /// Remove every item
    fn clear_session(&mut self);
}

/// Session stored as a JSONL file
///
/// Write failures are logged and swallowed; the cached items stay correct
/// for the rest of the process even if the file falls behind.
///
/// # Examples
///
/// ```no_run
/// use horoscope_agent::providers::Message;
/// use horoscope_agent::storage::{JsonlSession, Session};
///
/// let mut session: JsonlSession<Message> = JsonlSession::new("user-1", "logs/sessions");
/// session.add_items(&[Message::user("こんにちは")]);
/// assert_eq!(session.get_items(None).len(), 1);
/// ```
#[derive(Debug)]
pub struct JsonlSession<T = Message> {
    session_id: String,
    base_dir: PathBuf,
    path: PathBuf,
    items: Vec<T>,
    loaded: bool,
}

impl<T> JsonlSession<T>
where
    T: PlainData + DeserializeOwned + Clone,
{
    /// Open (lazily) the session `session_id` under `base_dir`
    pub fn new(session_id: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        let session_id = session_id.into();
        let base_dir = base_dir.into();
        let path = base_dir.join(format!("{}.jsonl", session_id));
        Self {
            session_id,
            base_dir,
            path,
            items: Vec::new(),
            loaded: false,
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_if_needed(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;
        self.items.clear();

        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!("Failed to read session {}: {}", self.path.display(), e);
                return;
            }
        };

        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(line) {
                Ok(item) => self.items.push(item),
                Err(e) => tracing::warn!(
                    "Skipping unreadable line {} of {}: {}",
                    index + 1,
                    self.path.display(),
                    e
                ),
            }
        }

        tracing::debug!(
            "Loaded session {} with {} items",
            self.session_id,
            self.items.len()
        );
    }

    fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir).map_err(|e| {
            HoroscopeError::Persistence(format!(
                "cannot create session directory {}: {}",
                self.base_dir.display(),
                e
            ))
            .into()
        })
    }

    fn append(&self, items: &[T]) -> Result<()> {
        self.ensure_dir()?;
        let payload: String = items.iter().map(jsonl_line).collect();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(payload.as_bytes())?;
        Ok(())
    }

    fn rewrite(&self) -> Result<()> {
        self.ensure_dir()?;
        let payload: String = self.items.iter().map(jsonl_line).collect();
        let tmp = self.path.with_extension("jsonl.tmp");
        std::fs::write(&tmp, payload.as_bytes())?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn truncate(&self) -> Result<()> {
        if self.path.exists() {
            OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&self.path)?;
        }
        Ok(())
    }
}

impl<T> Session<T> for JsonlSession<T>
where
    T: PlainData + DeserializeOwned + Clone,
{
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn get_items(&mut self, limit: Option<usize>) -> Vec<T> {
        self.load_if_needed();
        match limit {
            Some(limit) if limit > 0 && limit < self.items.len() => {
                self.items[self.items.len() - limit..].to_vec()
            }
            _ => self.items.clone(),
        }
    }

    fn add_items(&mut self, items: &[T]) {
        if items.is_empty() {
            return;
        }
        self.load_if_needed();
        self.items.extend_from_slice(items);
        if let Err(e) = self.append(items) {
            tracing::warn!("Failed to append to session {}: {}", self.path.display(), e);
        }
    }

    fn pop_item(&mut self) -> Option<T> {
        self.load_if_needed();
        let last = self.items.pop()?;
        if let Err(e) = self.rewrite() {
            tracing::warn!("Failed to rewrite session {}: {}", self.path.display(), e);
        }
        Some(last)
    }

    fn clear_session(&mut self) {
        self.load_if_needed();
        self.items.clear();
        if let Err(e) = self.truncate() {
            tracing::warn!("Failed to clear session {}: {}", self.path.display(), e);
        }
    }
}
