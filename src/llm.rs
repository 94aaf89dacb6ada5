//! Generator abstraction
//!
//! A [`ChatClient`] turns a message history into an incremental sequence of
//! deltas: text fragments forwarded to the user as they arrive, and tool-call
//! fragments assembled into complete call records. One client call is one
//! round of the conversation.

mod config;
mod error;
mod openai;
mod types;

pub use config::LlmConfig;
pub use error::{LlmError, LlmErrorKind};
pub use openai::OpenAiChatService;
pub use types::*;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Incremental delta sequence for one round
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<StreamDelta, LlmError>> + Send>>;

/// Common interface for streaming chat backends
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Start one generation round and return its delta stream.
    ///
    /// May be called multiple times per exchange (first round, bridge round,
    /// final round). The stream terminates when the backend signals the end
    /// of the round.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<DeltaStream, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}
