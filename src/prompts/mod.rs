//! Agent instructions
//!
//! The system prompt comes from a UTF-8 instruction file read once when the
//! agent is built. A missing or unreadable file is not fatal: the agent runs
//! without a system message.

use crate::error::{HoroscopeError, Result};
use std::path::Path;

/// Read the instruction file
///
/// # Arguments
///
/// * `path` - Path of the instruction file
///
/// # Errors
///
/// Returns `HoroscopeError::InstructionLoad` if the file cannot be read
pub fn read_instructions(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        HoroscopeError::InstructionLoad(format!("{}: {}", path.display(), e)).into()
    })
}

/// Load instructions, logging and absorbing failures
///
/// Returns `None` when no path is configured, the file cannot be read, or
/// it contains only whitespace.
///
/// # Examples
///
/// ```
/// use horoscope_agent::prompts::load_instructions;
/// use std::path::Path;
///
/// assert!(load_instructions(Some(Path::new("does/not/exist.txt"))).is_none());
/// assert!(load_instructions(None).is_none());
/// ```
pub fn load_instructions(path: Option<&Path>) -> Option<String> {
    let path = path?;
    match read_instructions(path) {
        Ok(text) if text.trim().is_empty() => {
            tracing::warn!("Instruction file {} is empty", path.display());
            None
        }
        Ok(text) => {
            tracing::debug!("Loaded instructions from {}", path.display());
            Some(text)
        }
        Err(e) => {
            tracing::warn!("{}; continuing without instructions", e);
            None
        }
    }
}
