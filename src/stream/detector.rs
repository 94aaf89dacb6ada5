//! Inline call detection
//!
//! Scans the round buffer for textually delimited call occurrences of the
//! form `[FunctionCall:name(argument)]`, whitespace-tolerant around the
//! name. The scanner keeps a resume offset so each occurrence triggers
//! exactly once: an occurrence split across deltas fires only when its
//! closing `)]` arrives, and a completed match is never rescanned.

use std::ops::Range;

const OPEN: &str = "[FunctionCall:";

/// One inline call occurrence.
///
/// The span is the byte range of the full placeholder in the round buffer,
/// kept so substitution targets this occurrence and not any other match of
/// the same text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineCall {
    pub name: String,
    pub argument: String,
    pub span: Range<usize>,
}

/// Incremental scanner over a growing buffer.
#[derive(Debug, Default)]
pub struct InlineCallDetector {
    scan_from: usize,
}

enum Scan {
    Complete {
        name: String,
        argument: String,
        len: usize,
    },
    /// Could still complete once more deltas arrive
    Partial,
    /// Grammar violated; skip `skip` bytes and keep looking
    Malformed { skip: usize },
}

impl InlineCallDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan for occurrences that became complete since the last call.
    ///
    /// Must be invoked on the same monotonically growing buffer each time.
    /// Returns only newly completed occurrences; the resume offset advances
    /// past completed matches but parks at a partial occurrence so it can
    /// finish on a later delta.
    pub fn scan(&mut self, buffer: &str) -> Vec<InlineCall> {
        let mut found = Vec::new();
        let mut pos = self.scan_from;

        loop {
            let Some(rel) = buffer[pos..].find('[') else {
                pos = buffer.len();
                break;
            };
            let start = pos + rel;
            let rest = &buffer[start..];

            if rest.len() < OPEN.len() {
                if OPEN.as_bytes().starts_with(rest.as_bytes()) {
                    // opening marker may still be arriving
                    pos = start;
                    break;
                }
                pos = start + 1;
                continue;
            }
            if !rest.starts_with(OPEN) {
                pos = start + 1;
                continue;
            }

            match parse_occurrence(rest) {
                Scan::Complete {
                    name,
                    argument,
                    len,
                } => {
                    found.push(InlineCall {
                        name,
                        argument,
                        span: start..start + len,
                    });
                    pos = start + len;
                }
                Scan::Partial => {
                    pos = start;
                    break;
                }
                Scan::Malformed { skip } => {
                    pos = start + skip;
                }
            }
        }

        self.scan_from = pos;
        found
    }
}

/// Parse one occurrence starting at the opening marker.
fn parse_occurrence(rest: &str) -> Scan {
    let bytes = rest.as_bytes();
    let mut i = OPEN.len();

    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    let name_end = i;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    if i == bytes.len() {
        return Scan::Partial;
    }
    if name_end == name_start || bytes[i] != b'(' {
        return Scan::Malformed { skip: OPEN.len() };
    }

    let arg_start = i + 1;
    // the argument runs to the first `)]`; a newline before that means this
    // was never a call
    match rest[arg_start..].find(")]") {
        Some(rel) => {
            let arg_end = arg_start + rel;
            if rest[arg_start..arg_end].contains('\n') {
                return Scan::Malformed { skip: OPEN.len() };
            }
            Scan::Complete {
                name: rest[name_start..name_end].to_string(),
                argument: rest[arg_start..arg_end].to_string(),
                len: arg_end + 2,
            }
        }
        None => {
            if rest[arg_start..].contains('\n') {
                Scan::Malformed { skip: OPEN.len() }
            } else {
                Scan::Partial
            }
        }
    }
}

/// Replace each span with its replacement text, by occurrence.
///
/// Spans must be non-overlapping and sorted ascending (scan order).
/// Rewrites right-to-left so earlier spans stay valid, which is also what
/// keeps two textually identical placeholders independent.
pub fn substitute_spans(content: &str, replacements: &[(Range<usize>, &str)]) -> String {
    let mut out = content.to_string();
    for (span, text) in replacements.iter().rev() {
        out.replace_range(span.clone(), text);
    }
    out
}
