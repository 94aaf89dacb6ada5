//! midstream - mid-stream tool call orchestration
//!
//! Streams a chat completion while watching for tool calls, runs them
//! concurrently as they are detected, and continues the conversation with
//! their results folded back in.

mod executor;
mod llm;
mod orchestrator;
mod stream;
mod tools;

use llm::{ChatClient, ChatMessage, LlmConfig, OpenAiChatService};
use orchestrator::{ContinuationStrategy, Orchestrator, OrchestratorConfig};
use std::sync::Arc;
use stream::StdoutSink;
use tools::ToolRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const INLINE_SYSTEM_PROMPT: &str = "You are a travel assistant. When you need live data, \
    emit a call in your answer text using exactly this syntax: [FunctionCall:name(argument)]. \
    Available: getWeather(city) for current weather, getFood(city) for local food \
    recommendations. Write the call where its result should appear and keep writing.";

const BRIDGE_SYSTEM_PROMPT: &str = "You are a travel assistant with access to getWeather and \
    getFood tools. While lookups run, keep the conversation going by introducing sights and \
    background about the place.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "midstream=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let llm_config = LlmConfig::from_env();
    if llm_config.api_key.is_none() {
        tracing::error!("No API key configured. Set MIDSTREAM_API_KEY.");
        return Err("MIDSTREAM_API_KEY is required".into());
    }

    let strategy = match std::env::var("MIDSTREAM_STRATEGY").as_deref() {
        Ok("inline") => ContinuationStrategy::InlinePlaceholder,
        Ok("bridge") | Err(_) => ContinuationStrategy::StructuredBridge,
        Ok(other) => {
            return Err(format!("unknown MIDSTREAM_STRATEGY: {other} (inline|bridge)").into());
        }
    };

    let client = Arc::new(OpenAiChatService::new(&llm_config)?);
    tracing::info!(
        model = client.model_id(),
        strategy = ?strategy,
        "Starting exchange"
    );

    let system_prompt = match strategy {
        ContinuationStrategy::InlinePlaceholder => INLINE_SYSTEM_PROMPT,
        ContinuationStrategy::StructuredBridge => BRIDGE_SYSTEM_PROMPT,
    };
    let history = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user("What's the weather in Beijing right now? And recommend something to eat there."),
    ];

    let config = OrchestratorConfig {
        strategy,
        ..OrchestratorConfig::default()
    };
    let orchestrator = Orchestrator::new(client, Arc::new(ToolRegistry::standard()), config);

    let mut sink = StdoutSink;
    let history = orchestrator.run(history, &mut sink).await?;
    println!();
    tracing::info!(messages = history.len(), "Exchange complete");

    Ok(())
}
