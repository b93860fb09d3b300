//! Conversation management for the agent
//!
//! This module implements the append-only message list the agent sends to
//! the model. Tool results are checked against the assistant message that
//! requested them when they are added, so a conversation built through this
//! API always satisfies the chat-completions pairing rules.

use crate::error::{HoroscopeError, Result};
use crate::providers::{Message, Role, TokenUsage, ToolCall};

/// Ordered conversation history
///
/// Messages are only ever appended. Any pruning or rewriting belongs to the
/// session store, never to a live conversation.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    provider_token_usage: Option<TokenUsage>,
}

impl Conversation {
    /// Creates a new empty conversation
    ///
    /// # Examples
    ///
    /// ```
    /// use horoscope_agent::agent::Conversation;
    ///
    /// let conversation = Conversation::new();
    /// assert!(conversation.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a conversation from previously stored messages
    ///
    /// The messages are taken as they are; call [`Conversation::verify`] to
    /// check them.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            provider_token_usage: None,
        }
    }

    /// Adds a system message to the conversation
    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::system(content));
    }

    /// Adds a user message to the conversation
    ///
    /// # Examples
    ///
    /// ```
    /// use horoscope_agent::agent::Conversation;
    ///
    /// let mut conversation = Conversation::new();
    /// conversation.add_user_message("私は水瓶座です。");
    /// assert_eq!(conversation.messages().len(), 1);
    /// ```
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Adds a final assistant answer
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Adds an assistant message requesting tool calls
    pub fn add_assistant_tool_calls(&mut self, content: impl Into<String>, calls: Vec<ToolCall>) {
        self.messages.push(Message::assistant_with_tools(content, calls));
    }

    /// Adds a tool result message to the conversation
    ///
    /// # Arguments
    ///
    /// * `tool_call_id` - The ID of the tool call this result corresponds to
    /// * `content` - The tool execution result content
    ///
    /// # Errors
    ///
    /// Returns `HoroscopeError::Protocol` unless `tool_call_id` names a call
    /// of the nearest preceding assistant message that has not been answered
    /// yet
    pub fn add_tool_result(
        &mut self,
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<()> {
        let tool_call_id = tool_call_id.into();
        check_pending_call(&self.messages, &tool_call_id)?;
        self.messages
            .push(Message::tool_result(tool_call_id, content));
        Ok(())
    }

    /// Returns all messages in the conversation
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the conversation is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Text of the most recent assistant message with non-empty content,
    /// looking only at messages from index `start` on
    pub fn last_assistant_text_since(&self, start: usize) -> Option<&str> {
        self.messages
            .get(start..)
            .unwrap_or_default()
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant)
            .map(Message::text)
            .find(|text| !text.trim().is_empty())
    }

    /// Record token usage reported by the provider
    pub fn update_from_provider_usage(&mut self, usage: &TokenUsage) {
        self.provider_token_usage = Some(*usage);
    }

    /// Token usage reported with the most recent completion, if any
    pub fn provider_token_usage(&self) -> Option<TokenUsage> {
        self.provider_token_usage
    }

    /// Check that every tool message answers a call of the assistant
    /// message before it, each call at most once
    ///
    /// # Errors
    ///
    /// Returns `HoroscopeError::Protocol` naming the first offending message
    pub fn verify(&self) -> Result<()> {
        for (index, message) in self.messages.iter().enumerate() {
            if message.role != Role::Tool {
                continue;
            }
            let id = message.tool_call_id.as_deref().ok_or_else(|| {
                HoroscopeError::Protocol(format!("tool message {} has no tool_call_id", index))
            })?;
            check_pending_call(&self.messages[..index], id)?;
        }
        Ok(())
    }
}

/// Ensure `id` belongs to the nearest preceding assistant message and has
/// not already been answered since
fn check_pending_call(messages: &[Message], id: &str) -> Result<()> {
    let mut answered = false;
    for message in messages.iter().rev() {
        match message.role {
            Role::Tool => {
                if message.tool_call_id.as_deref() == Some(id) {
                    answered = true;
                }
            }
            Role::Assistant => {
                let requested = message
                    .tool_calls
                    .as_ref()
                    .is_some_and(|calls| calls.iter().any(|c| c.id == id));
                if !requested {
                    return Err(HoroscopeError::Protocol(format!(
                        "tool result '{}' does not answer the preceding assistant message",
                        id
                    ))
                    .into());
                }
                if answered {
                    return Err(HoroscopeError::Protocol(format!(
                        "tool call '{}' was already answered",
                        id
                    ))
                    .into());
                }
                return Ok(());
            }
            Role::User | Role::System => break,
        }
    }

    Err(HoroscopeError::Protocol(format!(
        "tool result '{}' has no preceding assistant tool request",
        id
    ))
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str) -> ToolCall {
        ToolCall::new(id, "get_horoscope", r#"{"sign":"水瓶座"}"#)
    }

    #[test]
    fn test_add_messages_in_order() {
        let mut conversation = Conversation::new();
        conversation.add_system_message("instructions");
        conversation.add_user_message("hi");
        conversation.add_assistant_message("hello");

        let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(conversation.len(), 3);
    }

    #[test]
    fn test_tool_result_pairs_with_preceding_request() {
        let mut conversation = Conversation::new();
        conversation.add_user_message("運勢は？");
        conversation.add_assistant_tool_calls("", vec![call("a"), call("b")]);

        conversation.add_tool_result("b", "{}").unwrap();
        conversation.add_tool_result("a", "{}").unwrap();
        assert!(conversation.verify().is_ok());
    }

    #[test]
    fn test_tool_result_with_unknown_id_rejected() {
        let mut conversation = Conversation::new();
        conversation.add_user_message("q");
        conversation.add_assistant_tool_calls("", vec![call("a")]);

        let err = conversation.add_tool_result("zzz", "{}").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HoroscopeError>(),
            Some(HoroscopeError::Protocol(_))
        ));
        assert_eq!(conversation.len(), 2);
    }

    #[test]
    fn test_tool_result_answered_twice_rejected() {
        let mut conversation = Conversation::new();
        conversation.add_user_message("q");
        conversation.add_assistant_tool_calls("", vec![call("a")]);
        conversation.add_tool_result("a", "{}").unwrap();
        assert!(conversation.add_tool_result("a", "{}").is_err());
    }

    #[test]
    fn test_tool_result_without_request_rejected() {
        let mut conversation = Conversation::new();
        conversation.add_user_message("q");
        assert!(conversation.add_tool_result("a", "{}").is_err());

        let mut conversation = Conversation::new();
        conversation.add_assistant_message("plain answer");
        assert!(conversation.add_tool_result("a", "{}").is_err());
    }

    #[test]
    fn test_tool_result_only_pairs_with_nearest_request() {
        let mut conversation = Conversation::new();
        conversation.add_user_message("q");
        conversation.add_assistant_tool_calls("", vec![call("old")]);
        conversation.add_tool_result("old", "{}").unwrap();
        conversation.add_assistant_tool_calls("", vec![call("new")]);
        assert!(conversation.add_tool_result("old", "{}").is_err());
        assert!(conversation.add_tool_result("new", "{}").is_ok());
    }

    #[test]
    fn test_verify_detects_broken_stored_history() {
        let conversation = Conversation::from_messages(vec![
            Message::user("q"),
            Message::tool_result("orphan", "{}"),
        ]);
        assert!(conversation.verify().is_err());
    }

    #[test]
    fn test_last_assistant_text_skips_empty() {
        let mut conversation = Conversation::new();
        assert!(conversation.last_assistant_text_since(0).is_none());

        conversation.add_user_message("q");
        conversation.add_assistant_tool_calls("調べます", vec![call("a")]);
        conversation.add_tool_result("a", "{}").unwrap();
        conversation.add_assistant_tool_calls("", vec![call("b")]);
        assert_eq!(conversation.last_assistant_text_since(0), Some("調べます"));
        assert_eq!(conversation.last_assistant_text_since(3), None);
        assert_eq!(conversation.last_assistant_text_since(99), None);
    }

    #[test]
    fn test_provider_token_usage() {
        let mut conversation = Conversation::new();
        assert!(conversation.provider_token_usage().is_none());
        conversation.update_from_provider_usage(&TokenUsage::new(10, 5));
        assert_eq!(conversation.provider_token_usage().unwrap().total_tokens, 15);
    }
}
