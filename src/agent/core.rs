//! Agent core implementation with the tool-calling run loop
//!
//! This module implements the loop that answers one user turn:
//! - Sends the conversation and tool specs to the provider
//! - Executes the tool calls the model requests, in the order it issued them
//! - Repeats until the model answers with plain text
//! - Fails with `LoopLimitExceeded` when the model keeps asking for tools
//!
//! A turn works on a copy of the conversation. The copy replaces the
//! committed conversation only once the final answer arrives, so a failed or
//! abandoned turn leaves the agent exactly as it was.

use crate::config::{AgentConfig, ToolErrorPolicy};
use crate::error::{HoroscopeError, Result};
use crate::prompts;
use crate::providers::{
    validate_request_messages, CompletionResponse, Message, ModelReply, Provider, Role, ToolCall,
};
use crate::storage::{EventLog, Session};
use crate::tools::ToolRegistry;

use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

use super::{AgentEvent, Conversation};

/// Session store the agent writes committed messages to
pub type MessageSession = Box<dyn Session<Message> + Send + Sync>;

/// The agent that answers user turns with the help of tools
///
/// # Examples
///
/// ```no_run
/// use horoscope_agent::agent::Agent;
/// use horoscope_agent::config::{AgentConfig, ProviderConfig};
/// use horoscope_agent::providers::OpenAiCompatibleProvider;
/// use horoscope_agent::tools::ToolRegistry;
///
/// # async fn example() -> horoscope_agent::error::Result<()> {
/// let provider = OpenAiCompatibleProvider::new(ProviderConfig::default())?;
/// let mut agent = Agent::new(provider, ToolRegistry::horoscope(), AgentConfig::default())?;
/// let answer = agent.run("私は水瓶座です。今日の運勢は？").await?;
/// println!("{}", answer);
/// # Ok(())
/// # }
/// ```
pub struct Agent {
    provider: Arc<dyn Provider>,
    conversation: Conversation,
    tools: ToolRegistry,
    config: AgentConfig,
    history: EventLog,
    session: Option<MessageSession>,
}

impl Agent {
    /// Creates a new agent instance
    ///
    /// Loads the instruction file named in `config` (if any) as the system
    /// message and opens the configured history log.
    ///
    /// # Arguments
    ///
    /// * `provider` - The chat transport to use for completions
    /// * `tools` - The tool registry with available tools
    /// * `config` - Agent configuration
    ///
    /// # Errors
    ///
    /// Returns `HoroscopeError::Config` if configuration validation fails
    pub fn new(
        provider: impl Provider + 'static,
        tools: ToolRegistry,
        config: AgentConfig,
    ) -> Result<Self> {
        Self::from_arc(Arc::new(provider), tools, config)
    }

    /// Creates a new agent instance with a boxed provider
    ///
    /// # Errors
    ///
    /// Returns `HoroscopeError::Config` if configuration validation fails
    pub fn new_boxed(
        provider: Box<dyn Provider>,
        tools: ToolRegistry,
        config: AgentConfig,
    ) -> Result<Self> {
        Self::from_arc(Arc::from(provider), tools, config)
    }

    fn from_arc(
        provider: Arc<dyn Provider>,
        tools: ToolRegistry,
        config: AgentConfig,
    ) -> Result<Self> {
        if config.max_rounds == 0 {
            return Err(
                HoroscopeError::Config("max_rounds must be greater than 0".to_string()).into(),
            );
        }

        if config.result_key.trim().is_empty() {
            return Err(
                HoroscopeError::Config("result_key cannot be empty".to_string()).into(),
            );
        }

        let mut conversation = Conversation::new();
        if let Some(instructions) = prompts::load_instructions(config.instructions_path.as_deref())
        {
            conversation.add_system_message(instructions);
        }

        let history = EventLog::new(config.history_path.clone());

        debug!(
            "Created agent '{}' with {} tools, model={}",
            config.name,
            tools.len(),
            provider.model()
        );

        Ok(Self {
            provider,
            conversation,
            tools,
            config,
            history,
            session: None,
        })
    }

    /// Attach a session store and resume from its items
    ///
    /// Stored messages follow the system message; stored system messages
    /// are skipped. Every successful turn appends its new messages to the
    /// session.
    pub fn with_session(mut self, mut session: MessageSession) -> Self {
        let stored: Vec<Message> = session
            .get_items(None)
            .into_iter()
            .filter(|m| m.role != Role::System)
            .collect();

        if !stored.is_empty() {
            info!(
                "Resuming session '{}' with {} messages",
                session.session_id(),
                stored.len()
            );
            let mut messages = self.conversation.messages().to_vec();
            messages.extend(stored);
            let conversation = Conversation::from_messages(messages);
            if let Err(e) = conversation.verify() {
                warn!("Stored session '{}' is inconsistent: {}", session.session_id(), e);
            }
            self.conversation = conversation;
        }

        self.session = Some(session);
        self
    }

    /// Answers one user turn and returns the final text
    ///
    /// Drives [`Agent::run_streamed`] to completion.
    ///
    /// # Errors
    ///
    /// - `HoroscopeError::Transport` if the provider call fails
    /// - `HoroscopeError::Protocol` if the model sends an empty tool request
    /// - `HoroscopeError::LoopLimitExceeded` if the model still requests
    ///   tools after `max_rounds` rounds
    /// - `HoroscopeError::ToolNotFound` / `ToolExecution` under the `abort`
    ///   tool error policy
    pub async fn run(&mut self, user_input: &str) -> Result<String> {
        let events = self.run_streamed(user_input);
        futures::pin_mut!(events);

        let mut answer = None;
        while let Some(event) = events.next().await {
            if let AgentEvent::MessageOutput { text } = event? {
                answer = Some(text);
            }
        }

        answer.ok_or_else(|| {
            HoroscopeError::Protocol("turn ended without a final answer".to_string()).into()
        })
    }

    /// Answers one user turn as a stream of events
    ///
    /// The stream is lazy: nothing happens until it is polled. Each event is
    /// recorded in the history log before it is yielded. An error ends the
    /// stream. Dropping the stream before the final `MessageOutput` leaves
    /// the conversation unchanged.
    pub fn run_streamed<'a>(
        &'a mut self,
        user_input: &str,
    ) -> impl Stream<Item = Result<AgentEvent>> + Send + 'a {
        let user_input = user_input.to_string();

        async_stream::stream! {
            let started = Instant::now();
            let mut working = self.conversation.clone();
            let turn_start = working.len();
            working.add_user_message(user_input.clone());
            self.history.add_user_input(&user_input);

            let event = AgentEvent::AgentUpdated {
                agent_name: self.config.name.clone(),
            };
            self.history.record_event(&event);
            yield Ok(event);

            let specs = self.tools.specs();
            let mut round = 0;

            loop {
                let response = match self.request_completion(&working, &specs, round).await {
                    Ok(response) => response,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                if let Some(usage) = &response.usage {
                    working.update_from_provider_usage(usage);
                }

                let (calls, text) = match response.reply {
                    ModelReply::Final { text } => {
                        working.add_assistant_message(text.clone());
                        let event = AgentEvent::MessageOutput { text };
                        self.history.record_event(&event);
                        self.commit(working);
                        info!(
                            "Turn completed after {} tool rounds in {} ms",
                            round,
                            started.elapsed().as_millis()
                        );
                        yield Ok(event);
                        return;
                    }
                    ModelReply::ToolRequest { calls, text } => (calls, text),
                };

                if calls.is_empty() {
                    warn!("Model sent a tool request without calls");
                    yield Err(HoroscopeError::Protocol(
                        "tool request contained no tool calls".to_string(),
                    )
                    .into());
                    return;
                }

                if round >= self.config.max_rounds {
                    warn!("Maximum tool rounds ({}) exceeded", self.config.max_rounds);
                    let partial = if text.trim().is_empty() {
                        working
                            .last_assistant_text_since(turn_start)
                            .unwrap_or_default()
                            .to_string()
                    } else {
                        text
                    };
                    yield Err(HoroscopeError::LoopLimitExceeded {
                        limit: self.config.max_rounds,
                        partial,
                    }
                    .into());
                    return;
                }
                round += 1;

                debug!("Round {}: executing {} tool calls", round, calls.len());
                working.add_assistant_tool_calls(text, calls.clone());

                for call in calls {
                    let event = AgentEvent::ToolCalled {
                        call_id: call.id.clone(),
                        name: call.function.name.clone(),
                        arguments: call.function.arguments.clone(),
                    };
                    self.history.record_event(&event);
                    yield Ok(event);

                    let output = match self.execute_tool_call(&call).await {
                        Ok(output) => output,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    };

                    if let Err(e) = working.add_tool_result(call.id.clone(), output.clone()) {
                        yield Err(e);
                        return;
                    }

                    let event = AgentEvent::ToolOutput {
                        call_id: call.id,
                        name: call.function.name,
                        output,
                    };
                    self.history.record_event(&event);
                    yield Ok(event);
                }
            }
        }
    }

    async fn request_completion(
        &self,
        conversation: &Conversation,
        specs: &[serde_json::Value],
        round: usize,
    ) -> Result<CompletionResponse> {
        let messages = conversation.messages();
        validate_request_messages(messages)?;

        let span = tracing::info_span!(
            "model_call",
            round,
            messages = messages.len(),
            tools = specs.len()
        );

        async {
            let started = Instant::now();
            let result = self.provider.complete(messages, specs).await;
            match &result {
                Ok(response) => debug!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    tool_request = matches!(response.reply, ModelReply::ToolRequest { .. }),
                    "Model call completed"
                ),
                Err(e) => warn!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Model call failed: {}", e
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Executes a single tool call and renders the tool message content
    ///
    /// Results are wrapped as `{"<result_key>": <result>}`. Under the
    /// `report` policy a lookup or handler failure becomes
    /// `{"<result_key>": null, "error": "<message>"}` instead of an error.
    async fn execute_tool_call(&self, call: &ToolCall) -> Result<String> {
        let span = tracing::info_span!(
            "tool_call",
            tool = %call.function.name,
            call_id = %call.id
        );

        async {
            match self
                .tools
                .invoke(&call.function.name, &call.function.arguments)
                .await
            {
                Ok(value) => {
                    debug!(outcome = "ok", "Tool call completed");
                    Ok(self.render_result(value, None))
                }
                Err(e) => {
                    let reportable = matches!(
                        e.downcast_ref::<HoroscopeError>(),
                        Some(HoroscopeError::ToolNotFound(_) | HoroscopeError::ToolExecution { .. })
                    );
                    if reportable && self.config.tool_error_policy == ToolErrorPolicy::Report {
                        warn!(outcome = "reported", "Tool call failed: {}", e);
                        Ok(self.render_result(serde_json::Value::Null, Some(e.to_string())))
                    } else {
                        warn!(outcome = "aborted", "Tool call failed: {}", e);
                        Err(e)
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    fn render_result(&self, value: serde_json::Value, error: Option<String>) -> String {
        let mut object = serde_json::Map::new();
        object.insert(self.config.result_key.clone(), value);
        if let Some(error) = error {
            object.insert("error".to_string(), serde_json::Value::String(error));
        }
        serde_json::Value::Object(object).to_string()
    }

    fn commit(&mut self, working: Conversation) {
        let new_messages = working
            .messages()
            .get(self.conversation.len()..)
            .map(<[Message]>::to_vec)
            .unwrap_or_default();

        if let Some(session) = self.session.as_mut() {
            session.add_items(&new_messages);
        }
        self.conversation = working;
    }

    /// Returns a reference to the committed conversation
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the history log
    pub fn history(&self) -> &EventLog {
        &self.history
    }

    /// Returns the agent configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Returns the number of registered tools
    pub fn num_tools(&self) -> usize {
        self.tools.len()
    }
}
