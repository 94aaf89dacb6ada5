//! OpenAI-compatible streaming provider implementation
//!
//! Speaks the chat completions wire format with `stream: true` and decodes
//! the SSE response into [`StreamDelta`]s. Works against any endpoint that
//! implements this protocol (OpenAI, DeepSeek, Fireworks, ...).

use super::types::{ChatMessage, ChatRequest, Role, StreamDelta, ToolCallFragment};
use super::{ChatClient, DeltaStream, LlmConfig, LlmError};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Streaming chat completions client
pub struct OpenAiChatService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiChatService {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().unwrap_or_default(),
            base_url: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.model.clone(),
        })
    }

    fn translate_request(&self, request: &ChatRequest) -> WireRequest {
        let messages = request.messages.iter().map(translate_message).collect();

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| WireTool {
                        r#type: "function".to_string(),
                        function: WireFunction {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.input_schema.clone(),
                        },
                    })
                    .collect(),
            )
        };

        WireRequest {
            model: self.model.clone(),
            messages,
            tools,
            stream: true,
        }
    }
}

fn translate_message(msg: &ChatMessage) -> WireMessage {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    let tool_calls = msg.tool_calls.as_ref().map(|calls| {
        calls
            .iter()
            .map(|c| WireToolCall {
                index: None,
                id: Some(c.id.clone()),
                r#type: Some("function".to_string()),
                function: Some(WireFunctionCall {
                    name: Some(c.name.clone()),
                    arguments: Some(c.arguments.clone()),
                }),
            })
            .collect()
    });

    WireMessage {
        role: role.to_string(),
        content: Some(msg.content.clone()),
        tool_calls,
        tool_call_id: msg.tool_call_id.clone(),
    }
}

/// Decode one SSE chunk into zero or more deltas.
fn convert_chunk(data: &str) -> Vec<Result<StreamDelta, LlmError>> {
    let chunk: ChunkResponse = match serde_json::from_str(data) {
        Ok(c) => c,
        Err(e) => {
            return vec![Err(LlmError::unknown(format!(
                "Failed to parse stream chunk: {e} - data: {data}"
            )))]
        }
    };

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Vec::new();
    };

    let mut deltas = Vec::new();

    if let Some(text) = choice.delta.content {
        if !text.is_empty() {
            deltas.push(Ok(StreamDelta::Text(text)));
        }
    }

    if let Some(tool_calls) = choice.delta.tool_calls {
        for tc in tool_calls {
            let (name, arguments) = match tc.function {
                Some(f) => (f.name, f.arguments),
                None => (None, None),
            };
            deltas.push(Ok(StreamDelta::ToolCall(ToolCallFragment {
                index: tc.index.unwrap_or(0),
                id: tc.id,
                name,
                arguments,
            })));
        }
    }

    deltas
}

fn classify_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<WireErrorResponse>(body)
        .map_or_else(|_| body.to_string(), |e| e.error.message);

    match status.as_u16() {
        401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
        429 => LlmError::rate_limit(format!("Rate limit exceeded: {message}")),
        400 => LlmError::invalid_request(format!("Invalid request: {message}")),
        500..=599 => LlmError::server_error(format!("Server error: {message}")),
        _ => LlmError::unknown(format!("HTTP {status}: {message}")),
    }
}

#[async_trait]
impl ChatClient for OpenAiChatService {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<DeltaStream, LlmError> {
        let wire_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &body));
        }

        let deltas = response
            .bytes_stream()
            .eventsource()
            .take_while(|event| {
                // "[DONE]" is the end-of-round marker
                let done = matches!(event, Ok(e) if e.data.trim() == "[DONE]");
                futures::future::ready(!done)
            })
            .map(|event| match event {
                Ok(e) => convert_chunk(&e.data),
                Err(e) => vec![Err(LlmError::network(format!("Stream broken: {e}")))],
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(deltas))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    r#type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    r#type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function: Option<WireFunctionCall>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkResponse {
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ChunkDelta {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireErrorResponse {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}
