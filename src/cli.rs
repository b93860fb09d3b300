//! Command-line interface definition
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, one-shot questions and
//! session file maintenance.

use clap::{Parser, Subcommand};

/// Horoscope agent - tool-calling chat against a local model endpoint
#[derive(Parser, Debug, Clone)]
#[command(name = "horoscope-agent")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat with the agent
    Chat {
        /// Print agent events (tool calls, tool output) as they happen
        #[arg(long)]
        stream: bool,

        /// Persist and resume the conversation under this session id
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Ask a single question and print the answer
    Ask {
        /// Message to send to the agent
        message: String,
    },

    /// Inspect or edit a stored session
    Session {
        /// Session subcommand
        #[command(subcommand)]
        command: SessionCommand,
    },
}

/// Session maintenance subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// Print the stored items of a session, one JSON object per line
    Show {
        /// Session id
        #[arg(short, long)]
        id: String,

        /// Only print the last N items
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Remove the most recent item from a session
    Pop {
        /// Session id
        #[arg(short, long)]
        id: String,
    },

    /// Remove every item from a session
    Clear {
        /// Session id
        #[arg(short, long)]
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            command: Commands::Chat {
                stream: false,
                session: None,
            },
        }
    }
}
