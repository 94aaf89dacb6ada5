//! Tool implementations and registry

mod food;
mod weather;

pub use food::FoodTool;
pub use weather::WeatherTool;

use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Result from tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }
}

/// Uniform outcome of one tool call. Produced exactly once per call record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub ok: bool,
    pub content: String,
}

impl ToolResult {
    pub fn error(call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            ok: false,
            content: format!("Error: {}", message.into()),
        }
    }
}

/// Trait for named async operations the model may request.
///
/// Tools are stateless; the payload is whatever argument structure the model
/// produced. An inline occurrence delivers its argument as a bare JSON
/// string, the structured channel delivers an object, so handlers accept
/// both shapes.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as the model refers to it
    fn name(&self) -> &str;

    /// Tool description for the model
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool
    async fn run(&self, input: Value) -> ToolOutput;
}

/// Collection of tools available to an exchange.
///
/// Injected into the orchestrator at construction so tests can substitute
/// fakes; never a module-level singleton.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard demo tools
    pub fn standard() -> Self {
        Self::new()
            .with_tool(Arc::new(WeatherTool))
            .with_tool(Arc::new(FoodTool))
    }

    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Get all tool definitions for the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Look up a tool by name
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }
}

/// Pull a location out of either payload shape handlers see: a bare string
/// (inline call argument) or an object with a `location` field (structured
/// call arguments).
pub(crate) fn location_from(input: &Value) -> Option<&str> {
    input
        .as_str()
        .or_else(|| input.get("location").and_then(Value::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_registry_contents() {
        let registry = ToolRegistry::standard();
        let names: Vec<_> = registry
            .definitions()
            .iter()
            .map(|d| d.name.clone())
            .collect();
        assert_eq!(names, vec!["getWeather", "getFood"]);
        assert!(registry.contains("getWeather"));
        assert!(!registry.contains("doSomethingUnknown"));
        assert!(registry.lookup("getFood").is_some());
        assert!(registry.lookup("doSomethingUnknown").is_none());
    }

    #[test]
    fn test_location_from_both_shapes() {
        assert_eq!(location_from(&json!("Beijing")), Some("Beijing"));
        assert_eq!(location_from(&json!({"location": "Beijing"})), Some("Beijing"));
        assert_eq!(location_from(&json!({"city": "Beijing"})), None);
        assert_eq!(location_from(&Value::Null), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_weather_tool_requires_location() {
        let out = WeatherTool.run(Value::Null).await;
        assert!(!out.success);
        assert!(!out.output.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_weather_tool_reports_for_location() {
        let out = WeatherTool.run(json!({"location": "Beijing"})).await;
        assert!(out.success);
        assert!(out.output.contains("Beijing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_food_tool_reports_for_location() {
        let out = FoodTool.run(json!("Beijing")).await;
        assert!(out.success);
        assert!(out.output.contains("Beijing"));
    }
}
