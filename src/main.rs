//! Horoscope agent - tool-calling chat CLI
//!
#![doc = "Horoscope agent - tool-calling chat CLI"]
#![doc = "Main entry point for the horoscope agent application."]

use anyhow::Result;

use horoscope_agent::cli::{Cli, Commands, SessionCommand};
use horoscope_agent::commands;
use horoscope_agent::config::Config;
use horoscope_agent::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    logging::init_logging(&config.logging)?;
    config.log_load_warnings();
    tracing::debug!("Loaded configuration from {}", config_path);

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { stream, session } => {
            if let Some(id) = &session {
                tracing::debug!("Using session: {}", id);
            }
            commands::chat::run_chat(config, stream, session).await?;
            Ok(())
        }
        Commands::Ask { message } => {
            commands::ask::run_ask(config, &message).await?;
            Ok(())
        }
        Commands::Session { command } => match command {
            SessionCommand::Show { id, limit } => commands::session::show(&config, &id, limit),
            SessionCommand::Pop { id } => commands::session::pop(&config, &id),
            SessionCommand::Clear { id } => commands::session::clear(&config, &id),
        },
    }
}
