//! Folds normalized stream chunks into one assistant turn.
//!
//! ```rust
//! use nchat::StreamReassembler;
//! use nprovider::{NormalizedStreamChunk, StreamDelta, StreamPayload, ToolCallFragment};
//!
//! let fragment = |id: Option<&str>, name: Option<&str>, args: &str| StreamPayload::Delta(StreamDelta {
//!     choices: vec![NormalizedStreamChunk {
//!         tool_call_fragments: vec![ToolCallFragment {
//!             index: Some(0),
//!             id: id.map(str::to_string),
//!             name: name.map(str::to_string),
//!             arguments: Some(args.to_string()),
//!         }],
//!         ..NormalizedStreamChunk::default()
//!     }],
//!     usage: None,
//! });
//!
//! let mut reassembler = StreamReassembler::new();
//! reassembler.push(fragment(Some("call_1"), Some("lookup"), "{\"a\"")).expect("first fragment");
//! reassembler.push(fragment(None, None, ":1}")).expect("second fragment");
//!
//! let turn = reassembler.finish();
//! assert_eq!(turn.tool_calls[0].arguments_text(), "{\"a\":1}");
//! ```

use std::collections::BTreeMap;

use nprovider::{FinishReason, StreamPayload, ToolCall, ToolCallFragment, Usage};
use serde_json::Value;

use crate::ChatError;

#[derive(Debug, Clone, Default)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

/// The frozen result of a reassembled stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReassembledTurn {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Default)]
pub struct StreamReassembler {
    text: String,
    calls: BTreeMap<u32, PendingCall>,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
    terminal: bool,
    done: bool,
}

impl StreamReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one payload in order and returns the text it added, if any.
    pub fn push(&mut self, payload: StreamPayload) -> Result<Option<String>, ChatError> {
        let delta = match payload {
            StreamPayload::Done => {
                self.terminal = true;
                self.done = true;
                return Ok(None);
            }
            StreamPayload::Delta(delta) => delta,
        };

        if delta.usage.is_some() {
            self.usage = delta.usage;
        }

        // After a terminal finish only trailing usage is taken.
        if self.terminal {
            return Ok(None);
        }

        let mut added = String::new();
        for chunk in delta.choices {
            for fragment in chunk.tool_call_fragments {
                self.apply_fragment(fragment)?;
            }

            // Other choices may carry calls but never text.
            if chunk.index != 0 {
                continue;
            }

            if let Some(text) = chunk.text_delta {
                added.push_str(&text);
            }

            if let Some(reason) = chunk.finish_reason {
                self.finish_reason = Some(reason);
                if reason.is_terminal() {
                    self.terminal = true;
                }
            }
        }

        if added.is_empty() {
            return Ok(None);
        }

        self.text.push_str(&added);
        Ok(Some(added))
    }

    fn apply_fragment(&mut self, fragment: ToolCallFragment) -> Result<(), ChatError> {
        let slot = match fragment.index {
            Some(index) => index,
            None => self
                .calls
                .keys()
                .next_back()
                .map(|last| last + 1)
                .unwrap_or_default(),
        };

        match self.calls.get_mut(&slot) {
            Some(call) => {
                if let Some(arguments) = fragment.arguments {
                    call.arguments.push_str(&arguments);
                }
            }
            None => {
                let (Some(id), Some(name)) = (fragment.id, fragment.name) else {
                    return Err(ChatError::malformed_chunk(format!(
                        "tool call {slot} started without an id and name"
                    )));
                };

                self.calls.insert(
                    slot,
                    PendingCall {
                        id,
                        name,
                        arguments: fragment.arguments.unwrap_or_default(),
                    },
                );
            }
        }

        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Whether the explicit end-of-stream sentinel arrived.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn finish(self) -> ReassembledTurn {
        ReassembledTurn {
            text: self.text.trim_end().to_string(),
            tool_calls: self
                .calls
                .into_values()
                .map(|call| ToolCall::new(call.id, call.name, Value::String(call.arguments)))
                .collect(),
            finish_reason: self.finish_reason,
            usage: self.usage,
        }
    }
}
