//! OpenAI-compatible chat-completions provider
//!
//! Talks to any server exposing `POST {base_url}/chat/completions` in the
//! OpenAI format (LM Studio, llama.cpp server, vLLM, the OpenAI API itself).

use crate::config::ProviderConfig;
use crate::error::{HoroscopeError, Result};
use crate::providers::{
    CompletionResponse, FunctionCall, Message, ModelReply, Provider, TokenUsage, ToolCall,
};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat-completions provider for OpenAI-compatible endpoints
///
/// # Examples
///
/// ```no_run
/// use horoscope_agent::config::ProviderConfig;
/// use horoscope_agent::providers::{Message, OpenAiCompatibleProvider, Provider};
///
/// # async fn example() -> horoscope_agent::error::Result<()> {
/// let provider = OpenAiCompatibleProvider::new(ProviderConfig::default())?;
/// let completion = provider.complete(&[Message::user("こんにちは")], &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: ProviderConfig,
}

/// Request body for `/chat/completions`
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "<[serde_json::Value]>::is_empty")]
    tools: &'a [serde_json::Value],
}

/// Message in the chat-completions wire format
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// Tool call in the wire format
#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    #[serde(default)]
    id: String,
    #[serde(default = "default_tool_type")]
    r#type: String,
    function: ChatFunctionCall,
}

/// Function call details; some servers send `arguments` as an object
#[derive(Debug, Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

fn default_tool_type() -> String {
    "function".to_string()
}

/// Response body from `/chat/completions`
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider from configuration
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("horoscope-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HoroscopeError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized OpenAI-compatible provider: base_url={}, model={}",
            config.base_url,
            config.model
        );

        Ok(Self { client, config })
    }

    /// Full URL of the chat-completions endpoint
    pub fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role.to_string(),
                content: Some(m.text().to_string()),
                tool_calls: m.tool_calls.as_ref().map(|calls| {
                    calls
                        .iter()
                        .map(|tc| ChatToolCall {
                            id: tc.id.clone(),
                            r#type: default_tool_type(),
                            function: ChatFunctionCall {
                                name: tc.function.name.clone(),
                                arguments: serde_json::Value::String(tc.function.arguments.clone()),
                            },
                        })
                        .collect()
                }),
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    fn convert_reply(&self, message: ChatMessage) -> ModelReply {
        let text = message.content.unwrap_or_default();
        // Some servers send `"tool_calls": []` with a plain answer
        match message.tool_calls {
            Some(calls) if !calls.is_empty() => ModelReply::ToolRequest {
                calls: calls.into_iter().map(convert_tool_call).collect(),
                text,
            },
            _ => ModelReply::Final { text },
        }
    }

    async fn send_once(&self, body: &ChatRequest<'_>) -> Result<CompletionResponse> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Chat completion request failed: {}", e);
                HoroscopeError::Transport(format!("Request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Endpoint returned error {}: {}", status, error_text);
            return Err(HoroscopeError::Transport(format!(
                "Endpoint returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse chat completion: {}", e);
            HoroscopeError::Transport(format!("Failed to parse chat completion: {}", e))
        })?;

        let choice = chat_response.choices.into_iter().next().ok_or_else(|| {
            HoroscopeError::Transport("No choices in chat completion".to_string())
        })?;

        let reply = self.convert_reply(choice.message);
        Ok(CompletionResponse {
            reply,
            usage: chat_response
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        })
    }
}

fn convert_tool_call(call: ChatToolCall) -> ToolCall {
    let id = if call.id.is_empty() {
        format!("call_{}", uuid::Uuid::new_v4().simple())
    } else {
        call.id
    };
    let arguments = match call.function.arguments {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };
    ToolCall {
        id,
        function: FunctionCall {
            name: call.function.name,
            arguments,
        },
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: self.convert_messages(messages),
            tools,
        };

        tracing::debug!(
            "Sending chat completion: {} messages, {} tools",
            body.messages.len(),
            body.tools.len()
        );

        let mut attempt = 0;
        loop {
            match self.send_once(&body).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Chat completion failed ({}), retry {}/{}",
                        e,
                        attempt,
                        self.config.max_retries
                    );
                    tokio::time::sleep(Duration::from_millis(250 * u64::from(attempt))).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Role;

    fn provider() -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(ProviderConfig::default()).unwrap()
    }

    #[test]
    fn test_completions_url_trims_slash() {
        let provider = OpenAiCompatibleProvider::new(ProviderConfig {
            base_url: "http://localhost:1234/v1/".to_string(),
            ..ProviderConfig::default()
        })
        .unwrap();
        assert_eq!(
            provider.completions_url(),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[test]
    fn test_convert_messages_keeps_tool_pairing() {
        let messages = vec![
            Message::user("運勢は？"),
            Message::assistant_with_tools(
                "",
                vec![ToolCall::new("call_1", "get_horoscope", r#"{"sign":"水瓶座"}"#)],
            ),
            Message::tool_result("call_1", r#"{"horoscope":"..."}"#),
        ];
        let converted = provider().convert_messages(&messages);

        assert_eq!(converted.len(), 3);
        assert_eq!(converted[1].role, "assistant");
        assert_eq!(converted[1].content.as_deref(), Some(""));
        let call = &converted[1].tool_calls.as_ref().unwrap()[0];
        assert_eq!(call.r#type, "function");
        assert_eq!(
            call.function.arguments,
            serde_json::Value::String(r#"{"sign":"水瓶座"}"#.to_string())
        );
        assert_eq!(converted[2].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_convert_reply_final() {
        let reply = provider().convert_reply(ChatMessage {
            role: Role::Assistant.to_string(),
            content: Some("答え".to_string()),
            tool_calls: None,
            tool_call_id: None,
        });
        assert_eq!(
            reply,
            ModelReply::Final {
                text: "答え".to_string()
            }
        );
    }

    #[test]
    fn test_convert_reply_null_content_is_empty() {
        let message: ChatMessage =
            serde_json::from_str(r#"{"role":"assistant","content":null}"#).unwrap();
        assert_eq!(
            provider().convert_reply(message),
            ModelReply::Final {
                text: String::new()
            }
        );
    }

    #[test]
    fn test_convert_reply_empty_tool_calls_is_final() {
        let message: ChatMessage = serde_json::from_str(
            r#"{"role":"assistant","content":"こんにちは","tool_calls":[]}"#,
        )
        .unwrap();
        assert_eq!(
            provider().convert_reply(message),
            ModelReply::Final {
                text: "こんにちは".to_string()
            }
        );
    }

    #[test]
    fn test_convert_tool_call_object_arguments_and_missing_id() {
        let call: ChatToolCall = serde_json::from_str(
            r#"{"function":{"name":"get_horoscope","arguments":{"sign":"牡牛座"}}}"#,
        )
        .unwrap();
        let converted = convert_tool_call(call);
        assert!(converted.id.starts_with("call_"));
        let args: serde_json::Value = serde_json::from_str(&converted.function.arguments).unwrap();
        assert_eq!(args["sign"], "牡牛座");
    }
}
