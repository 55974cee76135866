//! Backend-agnostic shapes produced by adapters from raw wire data.

use serde::{Deserialize, Serialize};

use crate::message::{FinishReason, Role, ToolCall};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// One piece of a tool call. `index: None` marks a complete call that takes the
/// next free slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolCallFragment {
    pub index: Option<u32>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedStreamChunk {
    pub index: u32,
    pub role: Option<Role>,
    pub text_delta: Option<String>,
    pub tool_call_fragments: Vec<ToolCallFragment>,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamDelta {
    pub choices: Vec<NormalizedStreamChunk>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPayload {
    Delta(StreamDelta),
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    pub role: Role,
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedChoice {
    pub index: u32,
    pub message: NormalizedMessage,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedResponse {
    pub model: Option<String>,
    pub choices: Vec<NormalizedChoice>,
    pub usage: Option<Usage>,
}

impl NormalizedResponse {
    pub fn text(&self) -> &str {
        self.choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .unwrap_or_default()
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.choices.first().and_then(|choice| choice.finish_reason)
    }

    /// Tool calls across every choice, in choice order.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.choices
            .iter()
            .flat_map(|choice| choice.message.tool_calls.iter().cloned())
            .collect()
    }
}
