//! The per-backend translation seam used by the chat engine.

use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ResolvedConfig;
use crate::error::ProviderError;
use crate::estimator::TokenEstimator;
use crate::message::{Message, ToolCall};
use crate::normalized::{NormalizedResponse, StreamPayload};
use crate::request::{RequestOptions, ToolSchema, WireRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendId {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "gemini")]
    Gemini,
}

impl BackendId {
    /// Key under which message token costs are cached.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

impl Display for BackendId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendId {
    type Err = ProviderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(ProviderError::invalid_request(format!(
                "unknown backend '{other}'"
            ))),
        }
    }
}

pub trait ProviderAdapter: Send + Sync + Debug {
    fn backend(&self) -> BackendId;

    fn estimator(&self) -> &dyn TokenEstimator;

    /// Translates the retained window into wire messages. The system prompt is
    /// placed by `build_request`, not here.
    fn convert_messages(
        &self,
        messages: &[Message],
        config: &ResolvedConfig,
    ) -> Result<Vec<Value>, ProviderError>;

    fn build_request(
        &self,
        wire_messages: Vec<Value>,
        system: Option<&str>,
        options: &RequestOptions,
        config: &ResolvedConfig,
        stream: bool,
    ) -> Result<WireRequest, ProviderError>;

    fn parse_stream_chunk(&self, payload: &str) -> Result<StreamPayload, ProviderError>;

    fn parse_final_response(&self, body: &str) -> Result<NormalizedResponse, ProviderError>;

    fn convert_tool(&self, tool: &ToolSchema) -> Value;

    /// Whether a reassembled call should be kept on the assistant message.
    fn keeps_tool_call(&self, _call: &ToolCall) -> bool {
        true
    }

    /// Whether a complete stream always closes with an explicit end sentinel.
    /// When it does, a stream that ends early without a terminal finish reason
    /// is a dropped connection rather than a finished answer.
    fn ends_with_sentinel(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_id_parses_case_insensitively() {
        assert_eq!("OpenAI".parse::<BackendId>(), Ok(BackendId::OpenAi));
        assert_eq!(" gemini ".parse::<BackendId>(), Ok(BackendId::Gemini));
        assert!("claude".parse::<BackendId>().is_err());
        assert_eq!(BackendId::Gemini.to_string(), "gemini");
    }
}
