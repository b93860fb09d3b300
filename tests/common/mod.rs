use async_trait::async_trait;
use horoscope_agent::config::AgentConfig;
use horoscope_agent::providers::{CompletionResponse, Message, Provider, ToolCall};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Provider replaying a fixed script of responses
///
/// Once the script is exhausted every request gets the fallback response.
#[derive(Clone)]
pub struct ScriptedProvider {
    script: Arc<Mutex<VecDeque<CompletionResponse>>>,
    fallback: CompletionResponse,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

#[allow(dead_code)]
impl ScriptedProvider {
    pub fn new(script: Vec<CompletionResponse>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            fallback: CompletionResponse::final_text("おしまい"),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn repeating(response: CompletionResponse) -> Self {
        Self {
            fallback: response,
            ..Self::new(vec![])
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[serde_json::Value],
    ) -> horoscope_agent::Result<CompletionResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let next = self.script.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    fn model(&self) -> String {
        "scripted".to_string()
    }
}

#[allow(dead_code)]
pub fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall::new(id, name, arguments)
}

/// Agent configuration that keeps every file inside `dir`
#[allow(dead_code)]
pub fn agent_config_in(dir: &TempDir) -> AgentConfig {
    AgentConfig {
        instructions_path: None,
        history_path: Some(dir.path().join("history.jsonl")),
        session_dir: dir.path().join("sessions"),
        ..AgentConfig::default()
    }
}

#[allow(dead_code)]
pub fn read_jsonl(path: &Path) -> Vec<serde_json::Value> {
    fs::read_to_string(path)
        .expect("failed to read jsonl file")
        .lines()
        .map(|line| serde_json::from_str(line).expect("invalid jsonl line"))
        .collect()
}
