//! Conversation orchestration
//!
//! Drives one exchange through the round state machine:
//!
//! ```text
//! Generating -> Detecting -> (no calls: Done)
//!                         -> (calls: Bridging || Executing) -> Joining -> Finalizing -> Done
//! ```
//!
//! Detection runs continuously while a round streams and never stops the
//! round's output; executions launch fire-and-forget and are joined behind
//! an all-complete barrier before any continuation round sees their
//! results. Two continuation strategies implement the same contract: span
//! substitution for backends without a structured tool-call channel, and a
//! sanitized bridge round plus a final merge round for backends with one.

#[cfg(test)]
mod testing;

use crate::executor::{self, CallExecutor};
use crate::llm::{ChatClient, ChatMessage, ChatRequest, LlmError, ToolDefinition};
use crate::stream::{self, substitute_spans, InlineExecution, OutputSink, RoundOutput};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that terminate an exchange.
///
/// Everything else (malformed arguments, failing handlers, timed-out calls)
/// degrades into a negative tool result and the exchange keeps moving.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Inline detection hit a name with no registered handler; fatal to the
    /// round, never retried.
    #[error("unregistered function: {name}")]
    UnregisteredFunction { name: String },

    /// The generation backend failed; fatal to the whole exchange.
    #[error("generation failed: {0}")]
    Generator(#[from] LlmError),
}

/// How the conversation continues after calls are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationStrategy {
    /// Rewrite the round text in place (span substitution) and continue
    /// generation from the rewritten assistant message. For backends that
    /// only speak the inline `[FunctionCall:...]` syntax.
    InlinePlaceholder,
    /// Run a bridge round on a sanitized history while calls execute, then
    /// merge results and bridge content in a final round. For backends with
    /// a native tool-call channel.
    StructuredBridge,
}

/// Exchange configuration, injected at construction.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub strategy: ContinuationStrategy,
    /// Optional per-call deadline (see `CallExecutor`)
    pub call_timeout: Option<Duration>,
    /// Upper bound on placeholder-strategy rounds, in case the model keeps
    /// requesting calls
    pub max_rounds: usize,
    /// Appended to the substituted assistant message so the backend treats
    /// it as content to continue from, not a turn to re-answer
    pub continuation_marker: String,
    /// Stand-in assistant content when a tool-call-bearing message had no
    /// text of its own (the pending call schema must not be re-sent)
    pub bridge_stand_in: String,
    /// User prompt that elicits bridge content while calls run
    pub bridge_prompt: String,
    /// Final-round directive; `{bridge}` is replaced with the bridge text
    pub final_prompt_template: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            strategy: ContinuationStrategy::StructuredBridge,
            call_timeout: None,
            max_rounds: 8,
            continuation_marker: "\n(The requested lookups above have already been performed \
                                  and their results inlined; continue from here.)"
                .to_string(),
            bridge_stand_in: "I will look that up for you.".to_string(),
            bridge_prompt: "While the lookups are in progress, briefly share some related \
                            background worth knowing."
                .to_string(),
            final_prompt_template: "Combine the tool results above with the following \
                                    background into one complete answer:\n\n{bridge}"
                .to_string(),
        }
    }
}

/// State of one exchange, tracked for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExchangeState {
    Generating { round: u32 },
    Joining,
    Finalizing,
    Done,
}

/// Ties the generator, detectors and executor together for one exchange at
/// a time. Owns the message history for the duration of [`Orchestrator::run`].
pub struct Orchestrator<C: ChatClient> {
    client: Arc<C>,
    executor: CallExecutor,
    tools: Vec<ToolDefinition>,
    config: OrchestratorConfig,
}

impl<C: ChatClient> Orchestrator<C> {
    pub fn new(
        client: Arc<C>,
        registry: Arc<crate::tools::ToolRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        let mut executor = CallExecutor::new(registry.clone());
        if let Some(timeout) = config.call_timeout {
            executor = executor.with_call_timeout(timeout);
        }
        Self {
            client,
            executor,
            tools: registry.definitions(),
            config,
        }
    }

    /// Run one full exchange: stream every round's text to `sink`, execute
    /// detected calls, and return the final history.
    pub async fn run(
        &self,
        history: Vec<ChatMessage>,
        sink: &mut dyn OutputSink,
    ) -> Result<Vec<ChatMessage>, ExchangeError> {
        match self.config.strategy {
            ContinuationStrategy::InlinePlaceholder => self.run_inline(history, sink).await,
            ContinuationStrategy::StructuredBridge => self.run_bridge(history, sink).await,
        }
    }

    fn transition(&self, state: ExchangeState) {
        tracing::debug!(state = ?state, "Exchange state");
    }

    async fn run_round(
        &self,
        history: &[ChatMessage],
        with_tools: bool,
        detect_inline: bool,
        sink: &mut dyn OutputSink,
    ) -> Result<RoundOutput, ExchangeError> {
        let request = ChatRequest {
            messages: history.to_vec(),
            tools: if with_tools {
                self.tools.clone()
            } else {
                Vec::new()
            },
        };
        let deltas = self.client.stream_chat(&request).await?;
        stream::run_round(deltas, sink, &self.executor, detect_inline).await
    }

    /// Placeholder-substitution continuation (§ inline syntax).
    ///
    /// Each round streams to the sink while inline occurrences launch their
    /// executions. Once the round ends, the barrier joins all results, the
    /// matched spans are rewritten in place, and the rewritten text seeds
    /// the next round. Terminal when a round produces no occurrences.
    async fn run_inline(
        &self,
        mut history: Vec<ChatMessage>,
        sink: &mut dyn OutputSink,
    ) -> Result<Vec<ChatMessage>, ExchangeError> {
        for round in 1..=self.config.max_rounds {
            self.transition(ExchangeState::Generating {
                round: u32::try_from(round).unwrap_or(u32::MAX),
            });
            let output = self.run_round(&history, false, true, sink).await?;

            if output.inline_calls.is_empty() {
                self.transition(ExchangeState::Done);
                history.push(ChatMessage::assistant(output.content));
                return Ok(history);
            }

            self.transition(ExchangeState::Joining);
            let (calls, handles): (Vec<_>, Vec<_>) = output
                .inline_calls
                .into_iter()
                .map(|InlineExecution { call, handle }| (call, handle))
                .unzip();
            let results = executor::join_all(handles).await;

            self.transition(ExchangeState::Finalizing);
            let replacements: Vec<_> = calls
                .iter()
                .zip(&results)
                .map(|(call, result)| (call.span.clone(), result.content.as_str()))
                .collect();
            let rewritten = substitute_spans(&output.content, &replacements);
            tracing::info!(round, calls = results.len(), "Round rewritten with tool results");

            history.push(ChatMessage::assistant(format!(
                "{rewritten}{}",
                self.config.continuation_marker
            )));
        }

        tracing::warn!(
            max_rounds = self.config.max_rounds,
            "Exchange stopped at round limit"
        );
        Ok(history)
    }

    /// Structured bridging continuation (§ native tool-call channel).
    ///
    /// The first round collects structured call records. If any exist, all
    /// executions launch, a bridge round streams filler content on a
    /// sanitized history concurrently, and a join barrier waits for both.
    /// The final round sees the results as role-tagged messages plus a
    /// directive embedding the bridge content.
    async fn run_bridge(
        &self,
        mut history: Vec<ChatMessage>,
        sink: &mut dyn OutputSink,
    ) -> Result<Vec<ChatMessage>, ExchangeError> {
        self.transition(ExchangeState::Generating { round: 1 });
        let output = self.run_round(&history, true, false, sink).await?;

        if output.tool_calls.is_empty() {
            self.transition(ExchangeState::Done);
            history.push(ChatMessage::assistant(output.content));
            return Ok(history);
        }

        tracing::info!(calls = output.tool_calls.len(), "Structured calls collected");

        // Executing: launch everything before the bridge round starts
        let handles: Vec<_> = output
            .tool_calls
            .iter()
            .cloned()
            .map(|record| self.executor.spawn(record))
            .collect();

        // Bridging: the pending tool-call schema must not be re-sent, so
        // the bridge history carries a plain-content stand-in instead
        let mut bridge_history = history.clone();
        let stand_in = if output.content.is_empty() {
            self.config.bridge_stand_in.clone()
        } else {
            output.content.clone()
        };
        bridge_history.push(ChatMessage::assistant(stand_in));
        bridge_history.push(ChatMessage::user(&self.config.bridge_prompt));

        self.transition(ExchangeState::Generating { round: 2 });
        let (bridge_output, results) = tokio::join!(
            self.run_round(&bridge_history, false, false, sink),
            executor::join_all(handles),
        );
        self.transition(ExchangeState::Joining);
        let bridge_output = bridge_output?;

        self.transition(ExchangeState::Finalizing);
        history.push(ChatMessage::assistant_with_calls(
            output.content,
            output.tool_calls,
        ));
        for result in &results {
            history.push(ChatMessage::tool(&result.call_id, &result.content));
        }
        history.push(ChatMessage::user(
            self.config
                .final_prompt_template
                .replace("{bridge}", &bridge_output.content),
        ));

        self.transition(ExchangeState::Generating { round: 3 });
        let final_output = self.run_round(&history, false, false, sink).await?;
        history.push(ChatMessage::assistant(final_output.content));

        self.transition(ExchangeState::Done);
        Ok(history)
    }
}
