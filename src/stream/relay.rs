//! Round driver
//!
//! Consumes one round's delta stream. Text is forwarded to the sink before
//! any detection work so visible latency never depends on detector or
//! executor cost; the only suspension points are waiting for the next delta.
//! Inline occurrences launch their executions immediately (joined later by
//! the orchestrator); structured fragments are assembled and finalized when
//! the stream ends.

use super::assembler::ToolCallAssembler;
use super::detector::{InlineCall, InlineCallDetector};
use super::OutputSink;
use crate::executor::{CallExecutor, CallHandle};
use crate::llm::{DeltaStream, StreamDelta, ToolCallRecord};
use crate::orchestrator::ExchangeError;
use futures::StreamExt;

/// An inline occurrence paired with its in-flight execution.
#[derive(Debug)]
pub struct InlineExecution {
    pub call: InlineCall,
    pub handle: CallHandle,
}

/// Everything one round produced.
#[derive(Debug)]
pub struct RoundOutput {
    /// Full round text as received (placeholders included)
    pub content: String,
    /// Inline occurrences with executions already running
    pub inline_calls: Vec<InlineExecution>,
    /// Structured call records, complete only at stream end
    pub tool_calls: Vec<ToolCallRecord>,
}

impl RoundOutput {
    pub fn has_calls(&self) -> bool {
        !self.inline_calls.is_empty() || !self.tool_calls.is_empty()
    }
}

/// Per-round stream state, discarded at round end.
#[derive(Default)]
struct StreamState {
    buffer: String,
    emitted_len: usize,
}

/// Drive one round's delta stream to completion.
///
/// `detect_inline` is on for the placeholder strategy only; bridge and
/// final rounds must not reinterpret echoed placeholder text as new calls.
pub async fn run_round(
    mut deltas: DeltaStream,
    sink: &mut dyn OutputSink,
    executor: &CallExecutor,
    detect_inline: bool,
) -> Result<RoundOutput, ExchangeError> {
    let mut state = StreamState::default();
    let mut detector = InlineCallDetector::new();
    let mut assembler = ToolCallAssembler::new();
    let mut inline_calls = Vec::new();

    while let Some(delta) = deltas.next().await {
        match delta? {
            StreamDelta::Text(text) => {
                // forward before detection; each fragment is emitted once
                sink.write_text(&text);
                state.emitted_len += text.len();
                state.buffer.push_str(&text);
                debug_assert_eq!(state.emitted_len, state.buffer.len());

                if detect_inline {
                    for call in detector.scan(&state.buffer) {
                        let record = executor.record_for_inline(&call)?;
                        tracing::info!(
                            tool = %call.name,
                            argument = %call.argument,
                            "Inline call detected, launching execution"
                        );
                        let handle = executor.spawn(record);
                        inline_calls.push(InlineExecution { call, handle });
                    }
                }
            }
            StreamDelta::ToolCall(fragment) => {
                assembler.apply(&fragment);
            }
        }
    }

    Ok(RoundOutput {
        content: state.buffer,
        inline_calls,
        tool_calls: assembler.finish(),
    })
}
