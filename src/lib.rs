//! Horoscope agent - tool-calling chat library
//!
//! This library provides an agent that answers horoscope questions by
//! letting an OpenAI-compatible chat model call a small set of fortune
//! tools until it produces a final answer.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `agent`: Run loop, conversation management, and agent events
//! - `providers`: Model endpoint abstraction and the chat-completions client
//! - `tools`: Tool definitions, registry, and the horoscope tools
//! - `storage`: Event history log and resumable JSONL sessions
//! - `prompts`: Instruction file loading
//! - `config`: Configuration management and validation
//! - `logging`: Tracing subscriber setup
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use horoscope_agent::{Agent, Config};
//! use horoscope_agent::providers::create_provider;
//! use horoscope_agent::tools::ToolRegistry;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let provider = create_provider(&config.provider)?;
//!     let mut agent = Agent::new_boxed(provider, ToolRegistry::horoscope(), config.agent)?;
//!     println!("{}", agent.run("私は水瓶座です。今日の運勢は？").await?);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod prompts;
pub mod providers;
pub mod storage;
pub mod tools;

// Re-export commonly used types
pub use agent::Agent;
pub use config::Config;
pub use error::{HoroscopeError, Result};

#[cfg(test)]
pub mod test_utils;
