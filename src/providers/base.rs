//! Base provider trait and common message types
//!
//! This module defines the Provider trait that chat transports implement,
//! along with the conversation message types and the two shapes a model
//! reply can take: a final answer or a request to run tools.

use crate::error::{HoroscopeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions seeding the conversation
    System,
    /// Human input
    User,
    /// Model output (text and/or tool calls)
    Assistant,
    /// Result of a tool call
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// Message structure for conversation
///
/// Mirrors the OpenAI chat-completions message object. `tool_call_id` is only
/// set on tool-role messages, `tool_calls` only on assistant messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool calls requested by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// ID of the tool call this message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use horoscope_agent::providers::{Message, Role};
    ///
    /// let msg = Message::user("私は水瓶座です。");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new tool result message
    ///
    /// # Examples
    ///
    /// ```
    /// use horoscope_agent::providers::{Message, Role};
    ///
    /// let msg = Message::tool_result("call_123", r#"{"horoscope":"..."}"#);
    /// assert_eq!(msg.role, Role::Tool);
    /// assert_eq!(msg.tool_call_id.as_deref(), Some("call_123"));
    /// ```
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Creates an assistant message carrying tool calls
    ///
    /// The text that accompanied the calls, if any, is kept as content.
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let content = content.into();
        Self {
            role: Role::Assistant,
            content: if content.is_empty() {
                None
            } else {
                Some(content)
            },
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Text content, empty when absent
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// Function call information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function/tool to call
    pub name: String,
    /// Arguments for the function (as JSON string)
    pub arguments: String,
}

/// Tool call structure
///
/// Represents a request from the model to execute a tool with specific
/// arguments. The id is unique within a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Function call details
    pub function: FunctionCall,
}

impl ToolCall {
    /// Build a tool call from its parts
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Token usage information from a completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    pub completion_tokens: usize,
    /// Total tokens used (prompt + completion)
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    ///
    /// # Examples
    ///
    /// ```
    /// use horoscope_agent::providers::TokenUsage;
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// What the model answered
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Plain text answer; ends the turn
    Final {
        /// Answer text
        text: String,
    },
    /// Request to execute tools before answering
    ToolRequest {
        /// Calls in the order the model issued them
        calls: Vec<ToolCall>,
        /// Text sent alongside the calls (often empty)
        text: String,
    },
}

/// Completion response with reply and optional token usage
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The model's reply
    pub reply: ModelReply,
    /// Optional token usage information
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Final text response
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            reply: ModelReply::Final { text: text.into() },
            usage: None,
        }
    }

    /// Tool request response without accompanying text
    pub fn tool_request(calls: Vec<ToolCall>) -> Self {
        Self {
            reply: ModelReply::ToolRequest {
                calls,
                text: String::new(),
            },
            usage: None,
        }
    }

    /// Attach token usage information
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Provider trait for chat transports
///
/// Implementations send the conversation and tool specs to a model endpoint
/// and translate the answer into a [`ModelReply`]. They must not retain or
/// mutate the messages they are given.
///
/// # Examples
///
/// ```no_run
/// use horoscope_agent::providers::{CompletionResponse, Message, Provider};
/// use horoscope_agent::error::Result;
/// use async_trait::async_trait;
///
/// struct EchoProvider;
///
/// #[async_trait]
/// impl Provider for EchoProvider {
///     async fn complete(
///         &self,
///         messages: &[Message],
///         _tools: &[serde_json::Value],
///     ) -> Result<CompletionResponse> {
///         let last = messages.last().map(|m| m.text().to_string()).unwrap_or_default();
///         Ok(CompletionResponse::final_text(last))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Completes a conversation with the given messages and available tools
    ///
    /// # Errors
    ///
    /// Returns `HoroscopeError::Transport` if the endpoint is unreachable or
    /// answers with something that is not a chat completion
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse>;

    /// Name of the model requests are sent to
    fn model(&self) -> String {
        "unknown".to_string()
    }
}

/// Check the preconditions of a completion request
///
/// The conversation must be non-empty and end with a user or tool message;
/// anything else means the caller is about to ask the model to answer a
/// conversation that does not need an answer.
///
/// # Errors
///
/// Returns `HoroscopeError::Protocol` describing the violation
///
/// # Examples
///
/// ```
/// use horoscope_agent::providers::{validate_request_messages, Message};
///
/// assert!(validate_request_messages(&[Message::user("hi")]).is_ok());
/// assert!(validate_request_messages(&[]).is_err());
/// assert!(validate_request_messages(&[Message::assistant("done")]).is_err());
/// ```
pub fn validate_request_messages(messages: &[Message]) -> Result<()> {
    match messages.last() {
        None => Err(HoroscopeError::Protocol(
            "cannot request a completion for an empty conversation".to_string(),
        )
        .into()),
        Some(last) if matches!(last.role, Role::User | Role::Tool) => Ok(()),
        Some(last) => Err(HoroscopeError::Protocol(format!(
            "conversation must end with a user or tool message, found {}",
            last.role
        ))
        .into()),
    }
}
