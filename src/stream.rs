//! Incremental stream handling
//!
//! The relay consumes one round's delta sequence, forwarding text to the
//! output sink as it arrives while the detector and assembler watch for tool
//! call occurrences. Forwarding never waits on detection or execution.

mod assembler;
mod detector;
mod relay;

#[cfg(test)]
mod proptests;

pub use detector::{substitute_spans, InlineCall};
pub use relay::{run_round, InlineExecution, RoundOutput};

use std::io::Write;

/// Append-only, in-order sink for user-visible text.
///
/// Receives each fragment exactly once, in the order the generator produced
/// it. Implementations must not block on anything slower than the write
/// itself.
pub trait OutputSink: Send {
    fn write_text(&mut self, text: &str);
}

/// Sink that streams to stdout, flushing per fragment so partial lines
/// appear immediately.
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write_text(&mut self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}
