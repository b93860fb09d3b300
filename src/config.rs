//! Configuration management for the horoscope agent
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{HoroscopeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// Every section is defaulted, so an empty YAML document (or a missing file)
/// yields a configuration pointing at a local LM Studio server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model endpoint configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Agent behavior configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Problems noticed while loading, logged once logging is up
    #[serde(skip)]
    load_warnings: Vec<String>,
}

/// OpenAI-compatible endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the chat-completions API (without `/chat/completions`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request; local servers ignore it
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Model identifier passed in the request body
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,

    /// Extra attempts after a transport failure; 0 disables retries
    #[serde(default)]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    "http://localhost:1234/v1".to_string()
}

fn default_api_key() -> String {
    "not-needed".to_string()
}

fn default_model() -> String {
    "openai/gpt-oss-20b".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: default_api_key(),
            model: default_model(),
            timeout_seconds: default_request_timeout(),
            max_retries: 0,
        }
    }
}

/// What the run loop does when a tool lookup or handler fails
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorPolicy {
    /// Send an error tool result back to the model and keep going
    #[default]
    Report,
    /// Fail the whole turn with the tool error
    Abort,
}

impl std::str::FromStr for ToolErrorPolicy {
    type Err = HoroscopeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "report" => Ok(Self::Report),
            "abort" => Ok(Self::Abort),
            other => Err(HoroscopeError::Config(format!(
                "Invalid tool error policy: {}. Must be one of: report, abort",
                other
            ))),
        }
    }
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Display name reported in `agent_updated` events
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Maximum tool-call rounds per turn
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Handling of tool lookup and execution failures
    #[serde(default)]
    pub tool_error_policy: ToolErrorPolicy,

    /// Key under which a tool result is wrapped in the tool message
    #[serde(default = "default_result_key")]
    pub result_key: String,

    /// Instruction file loaded once as the system message
    #[serde(default = "default_instructions_path")]
    pub instructions_path: Option<PathBuf>,

    /// JSONL file receiving one history entry per agent event
    #[serde(default = "default_history_path")]
    pub history_path: Option<PathBuf>,

    /// Directory holding `<session_id>.jsonl` session files
    #[serde(default = "default_session_dir")]
    pub session_dir: PathBuf,
}

fn default_agent_name() -> String {
    "Horoscope Agent".to_string()
}

fn default_max_rounds() -> usize {
    10
}

fn default_result_key() -> String {
    "horoscope".to_string()
}

fn default_instructions_path() -> Option<PathBuf> {
    Some(PathBuf::from("instruction.txt"))
}

fn default_history_path() -> Option<PathBuf> {
    Some(PathBuf::from("logs/session_history.jsonl"))
}

fn default_session_dir() -> PathBuf {
    PathBuf::from("logs/sessions")
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            max_rounds: default_max_rounds(),
            tool_error_policy: ToolErrorPolicy::default(),
            result_key: default_result_key(),
            instructions_path: default_instructions_path(),
            history_path: default_history_path(),
            session_dir: default_session_dir(),
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,

    /// Optional file receiving a copy of the log output (appended)
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "horoscope_agent=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            let mut config = Self::default();
            config
                .load_warnings
                .push(format!("Config file not found at {}, using defaults", path));
            config
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| HoroscopeError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| HoroscopeError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("HOROSCOPE_BASE_URL") {
            self.provider.base_url = base_url;
        }

        if let Ok(api_key) = std::env::var("HOROSCOPE_API_KEY") {
            self.provider.api_key = api_key;
        }

        if let Ok(model) = std::env::var("HOROSCOPE_MODEL") {
            self.provider.model = model;
        }

        if let Ok(max_rounds) = std::env::var("HOROSCOPE_MAX_ROUNDS") {
            if let Ok(value) = max_rounds.parse() {
                self.agent.max_rounds = value;
            } else {
                self.load_warnings
                    .push(format!("Invalid HOROSCOPE_MAX_ROUNDS: {}", max_rounds));
            }
        }

        if let Ok(policy) = std::env::var("HOROSCOPE_TOOL_ERROR_POLICY") {
            match policy.parse::<ToolErrorPolicy>() {
                Ok(value) => self.agent.tool_error_policy = value,
                Err(e) => self.load_warnings.push(format!(
                    "{}, keeping {:?}",
                    e, self.agent.tool_error_policy
                )),
            }
        }

        if let Ok(path) = std::env::var("HOROSCOPE_INSTRUCTIONS") {
            self.agent.instructions_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("HOROSCOPE_HISTORY_PATH") {
            self.agent.history_path = if path.is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }

        if let Ok(dir) = std::env::var("HOROSCOPE_SESSION_DIR") {
            self.agent.session_dir = PathBuf::from(dir);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            self.logging.level = "horoscope_agent=debug".to_string();
        }
    }

    /// Problems noticed by [`Config::load`] (missing file, ignored
    /// environment values)
    pub fn load_warnings(&self) -> &[String] {
        &self.load_warnings
    }

    /// Emit the load warnings through `tracing`
    ///
    /// `load` runs before the subscriber exists, so the warnings are kept
    /// until this is called after [`crate::logging::init_logging`].
    pub fn log_load_warnings(&self) {
        for warning in &self.load_warnings {
            tracing::warn!("{}", warning);
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `HoroscopeError::Config` describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.provider.model.trim().is_empty() {
            return Err(HoroscopeError::Config("provider.model cannot be empty".to_string()).into());
        }

        if let Err(e) = url::Url::parse(&self.provider.base_url) {
            return Err(HoroscopeError::Config(format!(
                "provider.base_url is not a valid URL ({}): {}",
                self.provider.base_url, e
            ))
            .into());
        }

        if self.provider.timeout_seconds == 0 {
            return Err(HoroscopeError::Config(
                "provider.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.agent.max_rounds == 0 {
            return Err(
                HoroscopeError::Config("max_rounds must be greater than 0".to_string()).into(),
            );
        }

        if self.agent.max_rounds > 1000 {
            return Err(HoroscopeError::Config(
                "max_rounds must be less than or equal to 1000".to_string(),
            )
            .into());
        }

        if self.agent.result_key.trim().is_empty() {
            return Err(
                HoroscopeError::Config("agent.result_key cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}
