//! Tool call execution
//!
//! Turns complete call records into [`ToolResult`]s. Executions are spawned
//! fire-and-forget so the round's text keeps flowing; the handles are
//! collected and joined later behind an all-complete barrier. Each spawned
//! task owns its record/result pair; nothing here shares mutable state with
//! the round buffer.

use crate::llm::ToolCallRecord;
use crate::orchestrator::ExchangeError;
use crate::stream::InlineCall;
use crate::tools::{ToolOutput, ToolRegistry, ToolResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Executes registered tools against call records.
#[derive(Clone)]
pub struct CallExecutor {
    registry: Arc<ToolRegistry>,
    /// Optional per-call deadline; on expiry the call manufactures an error
    /// result instead of hanging the join barrier.
    call_timeout: Option<Duration>,
}

/// Handle to one in-flight execution.
#[derive(Debug)]
pub struct CallHandle {
    pub call_id: String,
    handle: JoinHandle<ToolResult>,
}

impl CallExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            call_timeout: None,
        }
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Build a call record for an inline occurrence.
    ///
    /// Inline detection is strict: an unregistered name fails the round
    /// before anything is launched. The bare argument text is stored as a
    /// JSON string literal so execution-time decoding is uniform across
    /// both call channels.
    pub fn record_for_inline(&self, call: &InlineCall) -> Result<ToolCallRecord, ExchangeError> {
        if !self.registry.contains(&call.name) {
            return Err(ExchangeError::UnregisteredFunction {
                name: call.name.clone(),
            });
        }
        Ok(ToolCallRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: call.name.clone(),
            arguments: Value::String(call.argument.clone()).to_string(),
        })
    }

    /// Execute one call record to completion.
    ///
    /// Never fails the exchange: malformed arguments fall back to a default
    /// payload, an unregistered name or a failing handler degrades into a
    /// negative result.
    pub async fn execute(&self, record: &ToolCallRecord) -> ToolResult {
        let payload: Value = match serde_json::from_str(&record.arguments) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    call_id = %record.id,
                    tool = %record.name,
                    error = %e,
                    "Malformed call arguments, using default payload"
                );
                Value::Null
            }
        };

        let Some(tool) = self.registry.lookup(&record.name) else {
            return ToolResult::error(
                &record.id,
                format!("unregistered function: {}", record.name),
            );
        };

        let started = Instant::now();
        let output = match self.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, tool.run(payload)).await {
                Ok(output) => output,
                Err(_) => ToolOutput::error(format!(
                    "call timed out after {}ms",
                    limit.as_millis()
                )),
            },
            None => tool.run(payload).await,
        };

        tracing::info!(
            call_id = %record.id,
            tool = %record.name,
            duration_ms = %started.elapsed().as_millis(),
            ok = output.success,
            "Tool call finished"
        );

        if output.success {
            ToolResult {
                call_id: record.id.clone(),
                ok: true,
                content: output.output,
            }
        } else {
            ToolResult::error(&record.id, output.output)
        }
    }

    /// Launch an execution without awaiting it.
    pub fn spawn(&self, record: ToolCallRecord) -> CallHandle {
        let executor = self.clone();
        let call_id = record.id.clone();
        tracing::debug!(call_id = %call_id, tool = %record.name, "Launching tool call");
        let handle = tokio::spawn(async move { executor.execute(&record).await });
        CallHandle { call_id, handle }
    }
}

/// All-complete barrier over spawned executions.
///
/// Results come back slotted in spawn order. A panicked task degrades into
/// an error result so the barrier always completes with one result per
/// call; none may be abandoned.
pub async fn join_all(handles: Vec<CallHandle>) -> Vec<ToolResult> {
    let mut results = Vec::with_capacity(handles.len());
    for call in handles {
        match call.handle.await {
            Ok(result) => results.push(result),
            Err(e) => {
                tracing::error!(call_id = %call.call_id, error = %e, "Tool task failed");
                results.push(ToolResult::error(
                    call.call_id,
                    format!("tool task failed: {e}"),
                ));
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Tool, WeatherTool};
    use async_trait::async_trait;

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slowTool"
        }
        fn description(&self) -> String {
            "never finishes in time".to_string()
        }
        fn input_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        async fn run(&self, _input: Value) -> ToolOutput {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            ToolOutput::success("too late")
        }
    }

    fn record(name: &str, arguments: &str) -> ToolCallRecord {
        ToolCallRecord {
            id: "call-1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    fn executor() -> CallExecutor {
        CallExecutor::new(Arc::new(ToolRegistry::standard()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_decodes_object_arguments() {
        let result = executor()
            .execute(&record("getWeather", r#"{"location":"Beijing"}"#))
            .await;
        assert!(result.ok);
        assert!(result.content.contains("Beijing"));
        assert_eq!(result.call_id, "call-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_decodes_inline_string_arguments() {
        let result = executor().execute(&record("getWeather", "\"Beijing\"")).await;
        assert!(result.ok);
        assert!(result.content.contains("Beijing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_arguments_degrade_not_abort() {
        let result = executor().execute(&record("getWeather", "not-json")).await;
        assert!(!result.ok);
        assert!(!result.content.is_empty());
        assert!(result.content.starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_unregistered_name_becomes_error_result() {
        let result = executor().execute(&record("doSomethingUnknown", "{}")).await;
        assert!(!result.ok);
        assert!(result.content.contains("unregistered function"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout_manufactures_error_result() {
        let registry = Arc::new(ToolRegistry::new().with_tool(Arc::new(SlowTool)));
        let executor = CallExecutor::new(registry).with_call_timeout(Duration::from_secs(5));
        let result = executor.execute(&record("slowTool", "{}")).await;
        assert!(!result.ok);
        assert!(result.content.contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_all_preserves_spawn_order() {
        let registry = Arc::new(
            ToolRegistry::new()
                .with_tool(Arc::new(WeatherTool))
                .with_tool(Arc::new(crate::tools::FoodTool)),
        );
        let executor = CallExecutor::new(registry);
        let handles = vec![
            executor.spawn(ToolCallRecord {
                id: "call-a".to_string(),
                name: "getWeather".to_string(),
                arguments: r#"{"location":"Beijing"}"#.to_string(),
            }),
            executor.spawn(ToolCallRecord {
                id: "call-b".to_string(),
                name: "getFood".to_string(),
                arguments: r#"{"location":"Beijing"}"#.to_string(),
            }),
        ];
        let results = join_all(handles).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].call_id, "call-a");
        assert_eq!(results[1].call_id, "call-b");
        assert!(results.iter().all(|r| r.ok));
    }

    #[test]
    fn test_record_for_inline_rejects_unregistered() {
        let call = InlineCall {
            name: "doSomethingUnknown".to_string(),
            argument: "x".to_string(),
            span: 0..10,
        };
        let err = executor().record_for_inline(&call).unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::UnregisteredFunction { name } if name == "doSomethingUnknown"
        ));
    }

    #[test]
    fn test_record_for_inline_wraps_argument_as_json_string() {
        let call = InlineCall {
            name: "getWeather".to_string(),
            argument: "Beijing".to_string(),
            span: 0..10,
        };
        let record = executor().record_for_inline(&call).unwrap();
        assert_eq!(record.arguments, "\"Beijing\"");
        assert!(!record.id.is_empty());
    }
}
