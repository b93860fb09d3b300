//! Provider module for the horoscope agent
//!
//! This module contains the chat transport abstraction and the
//! OpenAI-compatible implementation used against local model servers.

pub mod base;
pub mod openai;

pub use base::{
    validate_request_messages, CompletionResponse, FunctionCall, Message, ModelReply, Provider,
    Role, TokenUsage, ToolCall,
};
pub use openai::OpenAiCompatibleProvider;

use crate::config::ProviderConfig;
use crate::error::Result;

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `config` - Provider configuration
///
/// # Returns
///
/// Returns a boxed provider instance
///
/// # Errors
///
/// Returns error if the HTTP client cannot be initialized
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn Provider>> {
    Ok(Box::new(OpenAiCompatibleProvider::new(config.clone())?))
}
