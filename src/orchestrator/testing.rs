//! Scripted doubles for exchange tests.

use crate::llm::{
    ChatClient, ChatRequest, DeltaStream, LlmError, StreamDelta, ToolCallFragment,
};
use crate::stream::OutputSink;
use crate::tools::{Tool, ToolOutput};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Plays back pre-scripted rounds and records every request it saw.
pub struct ScriptedClient {
    rounds: Mutex<VecDeque<Vec<Result<StreamDelta, LlmError>>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    pub fn new(rounds: Vec<Vec<Result<StreamDelta, LlmError>>>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<DeltaStream, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let round = self
            .rounds
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::unknown("scripted client ran out of rounds"))?;
        Ok(Box::pin(futures::stream::iter(round)))
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

pub struct CollectSink(pub String);

impl OutputSink for CollectSink {
    fn write_text(&mut self, text: &str) {
        self.0.push_str(text);
    }
}

/// Counts invocations; handy for asserting a call never launched.
pub struct RecordingTool {
    name: String,
    pub invocations: Arc<AtomicUsize>,
}

impl RecordingTool {
    pub fn new(name: &str) -> (Self, Arc<AtomicUsize>) {
        let invocations = Arc::new(AtomicUsize::new(0));
        (
            Self {
                name: name.to_string(),
                invocations: invocations.clone(),
            },
            invocations,
        )
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        "records invocations".to_string()
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({"type": "object"})
    }

    async fn run(&self, _input: Value) -> ToolOutput {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        ToolOutput::success("recorded")
    }
}

pub fn text(s: &str) -> Result<StreamDelta, LlmError> {
    Ok(StreamDelta::Text(s.to_string()))
}

pub fn fragment(
    index: usize,
    id: Option<&str>,
    name: Option<&str>,
    arguments: Option<&str>,
) -> Result<StreamDelta, LlmError> {
    Ok(StreamDelta::ToolCall(ToolCallFragment {
        index,
        id: id.map(str::to_string),
        name: name.map(str::to_string),
        arguments: arguments.map(str::to_string),
    }))
}
