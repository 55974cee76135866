//! Logical conversation model shared by every backend.
//!
//! ```rust
//! use nprovider::{ContentPart, Message, Role};
//!
//! let message = Message::new(Role::User, Some(vec![
//!     ContentPart::text("first line"),
//!     ContentPart::text("second line"),
//! ]));
//!
//! assert_eq!(message.text(), "first line\nsecond line");
//! assert!(message.id.is_none());
//! ```

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use ncommon::{MessageId, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-backend token cost, keyed by backend name.
pub type TokenMap = BTreeMap<String, u32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Function,
    Tool,
}

impl Role {
    /// Accepts wire role names, including Gemini's `model`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" | "model" => Some(Self::Assistant),
            "system" => Some(Self::System),
            "function" => Some(Self::Function),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Function => "function",
            Self::Tool => "tool",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    #[default]
    Auto,
    Low,
    High,
}

impl ImageDetail {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Low => "low",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageContent {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub detail: ImageDetail,
}

impl ImageContent {
    pub fn new(url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            url: url.into(),
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_inline(mut self, base64: impl Into<String>, mime: impl Into<String>) -> Self {
        self.base64 = Some(base64.into());
        self.mime = Some(mime.into());
        self
    }

    pub fn with_detail(mut self, detail: ImageDetail) -> Self {
        self.detail = detail;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    Text { text: String },
    Image { image: ImageContent },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(image: ImageContent) -> Self {
        Self::Image { image }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Image { .. } => None,
        }
    }
}

/// A call the backend asked for. `arguments` is either a JSON object or the raw
/// argument text as a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    pub fn arguments_text(&self) -> String {
        match &self.arguments {
            Value::String(text) => text.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Parsed arguments; unparseable argument text yields `Value::Null`.
    pub fn arguments_json(&self) -> Value {
        match &self.arguments {
            Value::String(text) => serde_json::from_str(text).unwrap_or(Value::Null),
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    FunctionCall,
    ContentFilter,
    Safety,
    Other,
}

impl FinishReason {
    /// Case-insensitive parse covering both backends' vocabularies.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "stop" => Self::Stop,
            "length" | "max_tokens" => Self::Length,
            "tool_calls" => Self::ToolCalls,
            "function_call" => Self::FunctionCall,
            "content_filter" => Self::ContentFilter,
            "safety" | "recitation" | "blocklist" | "prohibited_content" | "spii" => Self::Safety,
            _ => Self::Other,
        }
    }

    /// Whether a streamed chunk carrying this reason ends the reply.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stop | Self::ToolCalls | Self::FunctionCall)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ToolCalls => "tool_calls",
            Self::FunctionCall => "function_call",
            Self::ContentFilter => "content_filter",
            Self::Safety => "safety",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: Option<MessageId>,
    #[serde(default)]
    pub parent_id: Option<MessageId>,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
    /// `None` means "no new content, continue the thread", distinct from empty.
    #[serde(default)]
    pub contents: Option<Vec<ContentPart>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub tokens: TokenMap,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
    #[serde(default)]
    pub created_time: u64,
}

impl Message {
    pub fn new(role: Role, contents: Option<Vec<ContentPart>>) -> Self {
        Self {
            id: None,
            parent_id: None,
            session_id: None,
            name: None,
            role,
            contents,
            tool_calls: Vec::new(),
            tool_call_id: None,
            tokens: TokenMap::new(),
            finish_reason: None,
            created_time: 0,
        }
    }

    pub fn text_message(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, Some(vec![ContentPart::text(text)]))
    }

    pub fn with_id(mut self, id: impl Into<MessageId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<MessageId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<SessionId>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_tool_call_id(mut self, tool_call_id: impl Into<String>) -> Self {
        self.tool_call_id = Some(tool_call_id.into());
        self
    }

    pub fn with_tokens(mut self, backend: impl Into<String>, tokens: u32) -> Self {
        self.tokens.insert(backend.into(), tokens);
        self
    }

    pub fn with_created_time(mut self, created_time: u64) -> Self {
        self.created_time = created_time;
        self
    }

    /// Text parts joined with newlines.
    pub fn text(&self) -> String {
        self.contents
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Replaces all content with a single text part.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.contents = Some(vec![ContentPart::text(text)]);
    }

    pub fn tokens_for(&self, backend: &str) -> Option<u32> {
        self.tokens.get(backend).copied()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn answers_call(&self, tool_call_id: &str) -> bool {
        self.tool_calls.iter().any(|call| call.id == tool_call_id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn finish_reason_parse_is_case_insensitive() {
        assert_eq!(FinishReason::parse("STOP"), FinishReason::Stop);
        assert_eq!(FinishReason::parse("MAX_TOKENS"), FinishReason::Length);
        assert_eq!(FinishReason::parse("tool_calls"), FinishReason::ToolCalls);
        assert_eq!(FinishReason::parse("SAFETY"), FinishReason::Safety);
        assert_eq!(FinishReason::parse("weird"), FinishReason::Other);

        assert!(FinishReason::FunctionCall.is_terminal());
        assert!(!FinishReason::Length.is_terminal());
    }

    #[test]
    fn tool_call_arguments_accept_object_or_text() {
        let text = ToolCall::new("call_1", "lookup", json!("{\"id\":1}"));
        assert_eq!(text.arguments_json(), json!({"id": 1}));
        assert_eq!(text.arguments_text(), "{\"id\":1}");

        let object = ToolCall::new("call_2", "lookup", json!({"id": 2}));
        assert_eq!(object.arguments_text(), "{\"id\":2}");

        let broken = ToolCall::new("call_3", "lookup", json!("{\"id\""));
        assert_eq!(broken.arguments_json(), Value::Null);
    }

    #[test]
    fn message_serializes_with_tagged_content_parts() {
        let message = Message::text_message(Role::User, "hello")
            .with_id("m1")
            .with_tokens("openai", 3);

        let value = serde_json::to_value(&message).expect("serialize message");
        assert_eq!(value["role"], "user");
        assert_eq!(value["contents"][0], json!({"type": "text", "text": "hello"}));
        assert_eq!(value["tokens"]["openai"], 3);

        let restored: Message = serde_json::from_value(value).expect("deserialize message");
        assert_eq!(restored, message);
    }

    #[test]
    fn absent_contents_are_distinct_from_empty() {
        let continuation = Message::new(Role::User, None);
        let empty = Message::new(Role::User, Some(Vec::new()));

        assert_eq!(continuation.text(), "");
        assert_ne!(continuation, empty);
    }
}
