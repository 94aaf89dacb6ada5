//! Structured call assembly
//!
//! Backends with a native tool-call channel deliver partial call descriptors
//! addressed by a stable index within the round. Fragments for one index
//! accumulate into one record; unlike the inline syntax there is no closing
//! delimiter, so nothing is complete until the round's stream ends.

use crate::llm::{ToolCallFragment, ToolCallRecord};

/// Reassembles index-addressed call fragments into complete records.
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    calls: Vec<ToolCallRecord>,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fragment into the record at its index, creating empty
    /// records up to that index on first contact.
    pub fn apply(&mut self, fragment: &ToolCallFragment) {
        while self.calls.len() <= fragment.index {
            self.calls.push(ToolCallRecord {
                id: String::new(),
                name: String::new(),
                arguments: String::new(),
            });
        }

        let call = &mut self.calls[fragment.index];
        if let Some(id) = &fragment.id {
            // ids are assigned once and never change
            if call.id.is_empty() {
                call.id.clone_from(id);
            }
        }
        if let Some(name) = &fragment.name {
            call.name.push_str(name);
        }
        if let Some(arguments) = &fragment.arguments {
            call.arguments.push_str(arguments);
        }
    }

    /// Finalize at end of stream.
    ///
    /// Records that never received a name are dropped; records without a
    /// backend id get a synthesized one so every call can be keyed to its
    /// result.
    pub fn finish(self) -> Vec<ToolCallRecord> {
        self.calls
            .into_iter()
            .filter(|c| !c.name.is_empty())
            .map(|mut c| {
                if c.id.is_empty() {
                    c.id = uuid::Uuid::new_v4().to_string();
                }
                c
            })
            .collect()
    }
}
