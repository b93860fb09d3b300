//! Tools module for the horoscope agent
//!
//! This module contains the tool definition type, the executor trait that
//! tool implementations provide, and the registry the run loop dispatches
//! model tool calls through.

pub mod horoscope;

use crate::error::{HoroscopeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tool definition structure
///
/// Represents a tool that can be called by the model. Follows the OpenAI
/// function calling format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Name of the tool
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON schema for the tool's parameters
    pub parameters: serde_json::Value,
}

impl Tool {
    /// Create a new tool definition
    ///
    /// # Arguments
    ///
    /// * `name` - Tool name
    /// * `description` - Tool description
    /// * `parameters` - JSON schema for parameters
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Spec in the chat-completions wire format
    ///
    /// # Examples
    ///
    /// ```
    /// use horoscope_agent::tools::Tool;
    ///
    /// let tool = Tool::new("ping", "Answer pong", serde_json::json!({"type": "object"}));
    /// let spec = tool.to_spec();
    /// assert_eq!(spec["type"], "function");
    /// assert_eq!(spec["function"]["name"], "ping");
    /// ```
    pub fn to_spec(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// Tool executor trait for implementing tool execution logic
///
/// Each tool must implement this trait to provide execution logic
/// that can be called by the agent.
///
/// # Examples
///
/// ```no_run
/// use horoscope_agent::tools::{Tool, ToolExecutor};
/// use horoscope_agent::error::Result;
/// use async_trait::async_trait;
/// use serde_json::Value;
///
/// struct PingTool;
///
/// #[async_trait]
/// impl ToolExecutor for PingTool {
///     fn tool_definition(&self) -> Tool {
///         Tool::new("ping", "Answer pong", serde_json::json!({"type": "object", "properties": {}}))
///     }
///
///     async fn execute(&self, _args: Value) -> Result<Value> {
///         Ok(Value::String("pong".to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Returns the tool definition
    fn tool_definition(&self) -> Tool;

    /// Executes the tool with the given arguments
    ///
    /// # Arguments
    ///
    /// * `args` - Tool arguments, always a JSON object
    ///
    /// # Errors
    ///
    /// Returns error if execution fails
    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value>;
}

/// Read a required string argument
///
/// # Errors
///
/// Returns `HoroscopeError::ToolExecution` when the argument is missing or
/// not a string
pub fn required_str<'a>(args: &'a serde_json::Value, key: &str, tool: &str) -> Result<&'a str> {
    args.get(key).and_then(|v| v.as_str()).ok_or_else(|| {
        HoroscopeError::ToolExecution {
            tool: tool.to_string(),
            message: format!("missing required string argument '{}'", key),
        }
        .into()
    })
}

/// Tool registry for managing available tools
///
/// Tools are validated when registered and kept in name order, so the specs
/// sent to the model are the same on every request.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Registered>,
}

#[derive(Clone)]
struct Registered {
    definition: Tool,
    executor: Arc<dyn ToolExecutor>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the three horoscope tools
    ///
    /// # Examples
    ///
    /// ```
    /// use horoscope_agent::tools::ToolRegistry;
    ///
    /// let registry = ToolRegistry::horoscope();
    /// assert_eq!(registry.names(), vec!["get_horoscope", "get_lucky_item", "get_zodiac_sign"]);
    /// ```
    pub fn horoscope() -> Self {
        let mut registry = Self::new();
        for executor in horoscope::all_tools() {
            // Built-in definitions are static and distinct
            if let Err(e) = registry.register(executor) {
                tracing::error!("Failed to register built-in tool: {}", e);
            }
        }
        registry
    }

    /// Register a tool executor in the registry
    ///
    /// The name is taken from the executor's definition.
    ///
    /// # Errors
    ///
    /// Returns `HoroscopeError::Config` if the name is empty or already
    /// registered, or if the parameter schema is not a JSON object
    pub fn register(&mut self, executor: Arc<dyn ToolExecutor>) -> Result<()> {
        let definition = executor.tool_definition();

        if definition.name.trim().is_empty() {
            return Err(HoroscopeError::Config("tool name cannot be empty".to_string()).into());
        }

        if !definition.parameters.is_object() {
            return Err(HoroscopeError::Config(format!(
                "parameters of tool '{}' must be a JSON object",
                definition.name
            ))
            .into());
        }

        if self.tools.contains_key(&definition.name) {
            return Err(HoroscopeError::Config(format!(
                "tool '{}' is already registered",
                definition.name
            ))
            .into());
        }

        tracing::debug!("Registered tool: {}", definition.name);
        self.tools.insert(
            definition.name.clone(),
            Registered {
                definition,
                executor,
            },
        );
        Ok(())
    }

    /// Get a tool executor by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.tools.get(name).map(|r| Arc::clone(&r.executor))
    }

    /// Registered tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Tool specs in the chat-completions wire format, sorted by name
    pub fn specs(&self) -> Vec<serde_json::Value> {
        self.tools.values().map(|r| r.definition.to_spec()).collect()
    }

    /// Invoke a tool by name with JSON-encoded arguments
    ///
    /// Empty or whitespace-only arguments are treated as `{}`.
    ///
    /// # Errors
    ///
    /// Returns `HoroscopeError::ToolNotFound` for an unknown name and
    /// `HoroscopeError::ToolExecution` for unparsable arguments or a failing
    /// handler
    pub async fn invoke(&self, name: &str, arguments: &str) -> Result<serde_json::Value> {
        let executor = self
            .get(name)
            .ok_or_else(|| HoroscopeError::ToolNotFound(name.to_string()))?;

        let args = parse_arguments(name, arguments)?;

        executor
            .execute(args)
            .await
            .map_err(|e| -> anyhow::Error {
                if matches!(
                    e.downcast_ref::<HoroscopeError>(),
                    Some(HoroscopeError::ToolExecution { .. })
                ) {
                    return e;
                }
                HoroscopeError::ToolExecution {
                    tool: name.to_string(),
                    message: e.to_string(),
                }
                .into()
            })
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

fn parse_arguments(tool: &str, arguments: &str) -> Result<serde_json::Value> {
    if arguments.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }

    let value: serde_json::Value =
        serde_json::from_str(arguments).map_err(|e| HoroscopeError::ToolExecution {
            tool: tool.to_string(),
            message: format!("invalid arguments: {}", e),
        })?;

    if !value.is_object() {
        return Err(HoroscopeError::ToolExecution {
            tool: tool.to_string(),
            message: "arguments must be a JSON object".to_string(),
        }
        .into());
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool {
        name: String,
        parameters: serde_json::Value,
    }

    impl EchoTool {
        fn named(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            })
        }
    }

    #[async_trait]
    impl ToolExecutor for EchoTool {
        fn tool_definition(&self) -> Tool {
            Tool::new(self.name.clone(), "Echo arguments", self.parameters.clone())
        }

        async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value> {
            Ok(args)
        }
    }

    struct FailingTool;

    #[async_trait]
    impl ToolExecutor for FailingTool {
        fn tool_definition(&self) -> Tool {
            Tool::new("broken", "Always fails", json!({"type": "object"}))
        }

        async fn execute(&self, _args: serde_json::Value) -> Result<serde_json::Value> {
            Err(anyhow::anyhow!("disk on fire"))
        }
    }

    fn downcast(err: &anyhow::Error) -> &HoroscopeError {
        err.downcast_ref::<HoroscopeError>().unwrap()
    }

    #[test]
    fn test_tool_registry_new() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.len(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_duplicate_name_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool::named("echo")).unwrap();
        let err = registry.register(EchoTool::named("echo")).unwrap_err();
        assert!(matches!(downcast(&err), HoroscopeError::Config(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_empty_name_rejected() {
        let mut registry = ToolRegistry::new();
        assert!(registry.register(EchoTool::named("  ")).is_err());
    }

    #[test]
    fn test_register_non_object_schema_rejected() {
        let mut registry = ToolRegistry::new();
        let tool = Arc::new(EchoTool {
            name: "bad".to_string(),
            parameters: json!(["not", "an", "object"]),
        });
        let err = registry.register(tool).unwrap_err();
        assert!(matches!(downcast(&err), HoroscopeError::Config(_)));
    }

    #[test]
    fn test_specs_are_name_ordered_wire_format() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool::named("zeta")).unwrap();
        registry.register(EchoTool::named("alpha")).unwrap();

        let specs = registry.specs();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0]["function"]["name"], "alpha");
        assert_eq!(specs[1]["function"]["name"], "zeta");
        assert_eq!(specs[0]["type"], "function");
        assert!(specs[0]["function"]["parameters"].is_object());
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.invoke("missing", "{}").await.unwrap_err();
        assert!(matches!(downcast(&err), HoroscopeError::ToolNotFound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_invoke_empty_arguments_is_empty_object() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool::named("echo")).unwrap();
        let result = registry.invoke("echo", "  ").await.unwrap();
        assert_eq!(result, json!({}));
    }

    #[tokio::test]
    async fn test_invoke_invalid_json_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool::named("echo")).unwrap();

        let err = registry.invoke("echo", "{not json").await.unwrap_err();
        assert!(matches!(downcast(&err), HoroscopeError::ToolExecution { .. }));

        let err = registry.invoke("echo", "[1, 2]").await.unwrap_err();
        assert!(matches!(downcast(&err), HoroscopeError::ToolExecution { .. }));
    }

    #[tokio::test]
    async fn test_invoke_handler_failure_is_tool_execution() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool)).unwrap();
        let err = registry.invoke("broken", "{}").await.unwrap_err();
        match downcast(&err) {
            HoroscopeError::ToolExecution { tool, message } => {
                assert_eq!(tool, "broken");
                assert!(message.contains("disk on fire"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_required_str() {
        let args = json!({"sign": "水瓶座", "n": 3});
        assert_eq!(required_str(&args, "sign", "t").unwrap(), "水瓶座");
        assert!(required_str(&args, "n", "t").is_err());
        assert!(required_str(&args, "missing", "t").is_err());
    }
}
