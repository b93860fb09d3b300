//! Error types for the horoscope agent
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for agent operations
///
/// Errors are propagated as `anyhow::Error`; callers that need to react to a
/// specific failure (the chat loop, tests) use `downcast_ref::<HoroscopeError>()`.
#[derive(Error, Debug)]
pub enum HoroscopeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The model requested a tool that is not registered
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// A tool handler failed or its arguments could not be parsed
    #[error("Tool '{tool}' execution failed: {message}")]
    ToolExecution {
        /// Name of the tool that failed
        tool: String,
        /// Underlying cause
        message: String,
    },

    /// The model endpoint was unreachable or returned malformed data
    #[error("Transport error: {0}")]
    Transport(String),

    /// The model or caller broke the chat-completion protocol
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// The instruction file could not be loaded
    #[error("Instruction load error: {0}")]
    InstructionLoad(String),

    /// History or session file write failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The model kept requesting tools past the configured round limit
    #[error("Agent exceeded maximum tool rounds: limit={limit}")]
    LoopLimitExceeded {
        /// The configured round limit
        limit: usize,
        /// Last assistant text produced before the limit was hit (may be empty)
        partial: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl HoroscopeError {
    /// Whether this error should be shown to the interactive user and the
    /// prompt resumed, rather than terminating the process
    pub fn is_turn_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Http(_)
                | Self::Protocol(_)
                | Self::LoopLimitExceeded { .. }
                | Self::ToolNotFound(_)
                | Self::ToolExecution { .. }
        )
    }
}

/// Result type alias for agent operations
///
/// Uses `anyhow::Error` so context can be attached while the typed
/// `HoroscopeError` stays recoverable through downcasting.
pub type Result<T> = anyhow::Result<T>;
