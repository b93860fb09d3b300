/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `chat`:    Interactive chat with the horoscope agent
- `ask`:     Answer a single question and exit
- `session`: Inspect or edit stored session files

These handlers are small and use the library components: providers, tools,
storage, and the agent.
*/

use crate::agent::{Agent, AgentEvent};
use crate::config::Config;
use crate::error::{HoroscopeError, Result};
use crate::providers::{create_provider, Message};
use crate::storage::{EntryKind, HistoryEntry, JsonlSession, PlainData, Session};
use crate::tools::ToolRegistry;

/// Build an agent with the horoscope tools from configuration
///
/// # Errors
///
/// Returns error if the provider or the agent cannot be created
pub fn build_agent(config: &Config, session_id: Option<&str>) -> Result<Agent> {
    let provider = create_provider(&config.provider)?;
    let agent = Agent::new_boxed(provider, ToolRegistry::horoscope(), config.agent.clone())?;
    tracing::debug!("Agent ready with {} tools", agent.num_tools());

    Ok(match session_id {
        Some(id) => {
            let session: JsonlSession<Message> =
                JsonlSession::new(id, config.agent.session_dir.clone());
            agent.with_session(Box::new(session))
        }
        None => agent,
    })
}

/// Print a turn failure the user can recover from
///
/// Returns the error back when it should end the program instead.
fn report_turn_failure(error: anyhow::Error) -> Result<()> {
    use colored::Colorize;

    match error.downcast_ref::<HoroscopeError>() {
        Some(e) if e.is_turn_failure() => {
            eprintln!("{}", format!("エラー: {}", e).red());
            if let HoroscopeError::LoopLimitExceeded { partial, .. } = e {
                if !partial.is_empty() {
                    eprintln!("{}", format!("途中までの応答: {}", partial).yellow());
                }
            }
            Ok(())
        }
        _ => Err(error),
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat handler.
    //!
    //! Reads lines with rustyline on a blocking thread, submits them to the
    //! agent, and prints either the final answer or every agent event.

    use super::*;
    use futures::StreamExt;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use tokio::sync::mpsc;

    const PROMPT: &str = "あなた: ";

    /// Whether the input ends the chat (`exit` or `quit`, any case)
    ///
    /// # Examples
    ///
    /// ```
    /// use horoscope_agent::commands::chat::is_exit_command;
    ///
    /// assert!(is_exit_command("EXIT"));
    /// assert!(is_exit_command(" quit "));
    /// assert!(!is_exit_command("exit now"));
    /// ```
    pub fn is_exit_command(input: &str) -> bool {
        matches!(input.trim().to_lowercase().as_str(), "exit" | "quit")
    }

    /// One result of reading a line
    #[derive(Debug)]
    enum Input {
        Line(String),
        Interrupted,
        Eof,
        Failed(String),
    }

    /// Line editor running on a blocking thread
    ///
    /// The editor is created and used only on that thread; prompts and lines
    /// travel over channels so the async runtime never blocks on stdin.
    struct LineReader {
        prompts: std::sync::mpsc::Sender<String>,
        lines: mpsc::Receiver<Input>,
    }

    impl LineReader {
        fn spawn() -> Self {
            let (prompt_tx, prompt_rx) = std::sync::mpsc::channel::<String>();
            let (line_tx, line_rx) = mpsc::channel(1);

            tokio::task::spawn_blocking(move || {
                let mut editor = match DefaultEditor::new() {
                    Ok(editor) => editor,
                    Err(e) => {
                        let _ = line_tx.blocking_send(Input::Failed(e.to_string()));
                        return;
                    }
                };

                while let Ok(prompt) = prompt_rx.recv() {
                    let input = match editor.readline(&prompt) {
                        Ok(line) => {
                            if !line.trim().is_empty() {
                                let _ = editor.add_history_entry(line.as_str());
                            }
                            Input::Line(line)
                        }
                        Err(ReadlineError::Interrupted) => Input::Interrupted,
                        Err(ReadlineError::Eof) => Input::Eof,
                        Err(e) => Input::Failed(e.to_string()),
                    };
                    if line_tx.blocking_send(input).is_err() {
                        break;
                    }
                }
            });

            Self {
                prompts: prompt_tx,
                lines: line_rx,
            }
        }

        async fn read_line(&mut self, prompt: &str) -> Input {
            if self.prompts.send(prompt.to_string()).is_err() {
                return Input::Eof;
            }
            self.lines.recv().await.unwrap_or(Input::Eof)
        }
    }

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `stream` - Print every agent event instead of only the answer
    /// * `session_id` - Persist and resume the conversation under this id
    ///
    /// # Errors
    ///
    /// Returns error if the agent cannot be built or a turn fails in a way
    /// that is not recoverable
    pub async fn run_chat(config: Config, stream: bool, session_id: Option<String>) -> Result<()> {
        use colored::Colorize;

        tracing::info!("Starting interactive chat mode");
        let mut agent = build_agent(&config, session_id.as_deref())?;
        let mut reader = LineReader::spawn();

        println!("{}", "=== 占いアシスタントを開始します ===".bold());
        println!("（例）こんにちは など自由に話しかけてください。'exit' で終了。");
        if let Some(id) = &session_id {
            println!("{}", format!("セッション: {}", id).dimmed());
        }

        loop {
            let line = match reader.read_line(PROMPT).await {
                Input::Line(line) => line,
                Input::Interrupted => {
                    println!("CTRL-C");
                    break;
                }
                Input::Eof => {
                    println!("CTRL-D");
                    break;
                }
                Input::Failed(e) => {
                    tracing::error!("Readline error: {}", e);
                    break;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if is_exit_command(trimmed) {
                println!("チャットを終了します。");
                break;
            }

            let outcome = if stream {
                stream_turn(&mut agent, trimmed).await
            } else {
                agent
                    .run(trimmed)
                    .await
                    .map(|answer| println!("AI: {}", answer))
            };

            if let Err(e) = outcome {
                report_turn_failure(e)?;
            }
        }

        Ok(())
    }

    async fn stream_turn(agent: &mut Agent, input: &str) -> Result<()> {
        let events = agent.run_streamed(input);
        futures::pin_mut!(events);

        while let Some(event) = events.next().await {
            print_event(&event?);
        }
        Ok(())
    }

    fn print_event(event: &AgentEvent) {
        use colored::Colorize;

        let entry = HistoryEntry::from_event(event);
        let text = entry.text.trim_end();
        match entry.kind {
            EntryKind::AgentUpdated => println!("{}", text.cyan()),
            EntryKind::ToolCall | EntryKind::ToolOutput => println!("{}", text.yellow()),
            EntryKind::MessageOutput => println!("{}", text),
            EntryKind::UserInput => {}
        }
    }
}

// Single question handler
pub mod ask {
    //! One-shot question handler.

    use super::*;

    /// Ask one question and print the answer
    ///
    /// # Errors
    ///
    /// Returns error if the agent cannot be built or the turn fails
    pub async fn run_ask(config: Config, message: &str) -> Result<()> {
        tracing::info!("Answering single question");
        let mut agent = build_agent(&config, None)?;
        let answer = agent.run(message).await?;
        println!("{}", answer);
        Ok(())
    }
}

// Session maintenance handlers
pub mod session {
    //! Session file maintenance.
    //!
    //! Operates directly on `{session_dir}/{id}.jsonl` without contacting
    //! the model endpoint.

    use super::*;

    fn open(config: &Config, id: &str) -> JsonlSession<Message> {
        JsonlSession::new(id, config.agent.session_dir.clone())
    }

    /// Print stored items, one JSON object per line
    pub fn show(config: &Config, id: &str, limit: Option<usize>) -> Result<()> {
        let mut session = open(config, id);
        for item in session.get_items(limit) {
            println!("{}", item.to_plain_data());
        }
        Ok(())
    }

    /// Remove the most recent item and print it
    pub fn pop(config: &Config, id: &str) -> Result<()> {
        let mut session = open(config, id);
        match session.pop_item() {
            Some(item) => println!("Removed: {}", item.to_plain_data()),
            None => println!("Session '{}' is empty", id),
        }
        Ok(())
    }

    /// Remove every item
    pub fn clear(config: &Config, id: &str) -> Result<()> {
        let mut session = open(config, id);
        let count = session.get_items(None).len();
        session.clear_session();
        println!("Cleared {} items from session '{}'", count, id);
        Ok(())
    }
}
