//! Test utilities for the horoscope agent
//!
//! This module provides a scripted mock provider, an agent configuration
//! that never touches the working directory, and assertion helpers shared
//! by the unit tests.

use crate::config::AgentConfig;
use crate::error::{HoroscopeError, Result};
use crate::providers::{CompletionResponse, Message, Provider, Role};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Provider returning scripted responses in order
///
/// When the script runs out it answers with the fallback response, which
/// defaults to a final "Done".
#[derive(Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<CompletionResponse>>>,
    fallback: CompletionResponse,
    failure: Arc<Mutex<Option<String>>>,
    call_count: Arc<Mutex<usize>>,
    seen: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockProvider {
    /// Provider replaying `responses`, then answering "Done"
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            fallback: CompletionResponse::final_text("Done"),
            failure: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Provider answering every request with `response`
    pub fn always(response: CompletionResponse) -> Self {
        Self {
            fallback: response,
            ..Self::new(vec![])
        }
    }

    /// Make the next request fail with a transport error
    pub fn fail_next(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    /// Number of requests received
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Messages of every request received, in order
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        *self.call_count.lock().unwrap() += 1;
        self.seen.lock().unwrap().push(messages.to_vec());

        if let Some(message) = self.failure.lock().unwrap().take() {
            return Err(HoroscopeError::Transport(message).into());
        }

        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    fn model(&self) -> String {
        "mock".to_string()
    }
}

/// Agent configuration without instruction file or history file
pub fn test_agent_config() -> AgentConfig {
    AgentConfig {
        instructions_path: None,
        history_path: None,
        ..AgentConfig::default()
    }
}

/// Assert that `err` is a `HoroscopeError` matching `predicate`
///
/// # Panics
///
/// Panics if the error is of another type or does not match
pub fn assert_error(err: &anyhow::Error, predicate: impl Fn(&HoroscopeError) -> bool) {
    match err.downcast_ref::<HoroscopeError>() {
        Some(e) => assert!(predicate(e), "unexpected error variant: {:?}", e),
        None => panic!("expected HoroscopeError, got: {:?}", err),
    }
}

/// Assert the shape of a single committed turn
///
/// `rounds` lists the number of tool calls per round. The messages must be
/// `user, (assistant(tool_calls), tool x n)*, assistant(final)`, possibly
/// preceded by a system message, with every tool message answering a call
/// of the assistant message before it.
///
/// # Panics
///
/// Panics if the messages do not have that shape
pub fn assert_turn_shape(messages: &[Message], rounds: &[usize]) {
    let messages = match messages.first() {
        Some(first) if first.role == Role::System => &messages[1..],
        _ => messages,
    };

    let expected_len = 2 + rounds.iter().map(|n| n + 1).sum::<usize>();
    assert_eq!(messages.len(), expected_len, "messages: {:#?}", messages);
    assert_eq!(messages[0].role, Role::User);

    let mut index = 1;
    for &calls in rounds {
        let request = &messages[index];
        assert_eq!(request.role, Role::Assistant);
        let ids: Vec<&str> = request
            .tool_calls
            .as_ref()
            .map(|c| c.iter().map(|tc| tc.id.as_str()).collect())
            .unwrap_or_default();
        assert_eq!(ids.len(), calls);

        for (offset, id) in ids.iter().enumerate() {
            let result = &messages[index + 1 + offset];
            assert_eq!(result.role, Role::Tool);
            assert_eq!(result.tool_call_id.as_deref(), Some(*id));
        }
        index += calls + 1;
    }

    let last = &messages[index];
    assert_eq!(last.role, Role::Assistant);
    assert!(last.tool_calls.is_none());
}
