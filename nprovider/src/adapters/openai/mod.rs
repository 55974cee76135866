//! OpenAI chat-completions adapter.
//!
//! ```rust
//! use nprovider::{ProviderAdapter, RequestOptions, ResolvedConfig};
//! use nprovider::adapters::openai::OpenAiAdapter;
//!
//! let adapter = OpenAiAdapter::new();
//! let config = ResolvedConfig::new("sk-test", "https://api.openai.com/v1/", "gpt-4o-mini");
//! let request = adapter
//!     .build_request(Vec::new(), Some("be brief"), &RequestOptions::default(), &config, true)
//!     .expect("request should build");
//!
//! assert_eq!(request.url, "https://api.openai.com/v1/chat/completions");
//! assert_eq!(request.body["messages"][0]["role"], "system");
//! assert_eq!(request.body["stream"], true);
//! ```

mod serde_api;
mod tests;

use serde_json::Value;

use crate::adapter::{BackendId, ProviderAdapter};
use crate::config::ResolvedConfig;
use crate::error::ProviderError;
use crate::estimator::{EstimatorProfile, ProfileEstimator, TokenEstimator};
use crate::message::{Message, ToolCall};
use crate::normalized::{NormalizedResponse, StreamPayload};
use crate::request::{RequestOptions, ToolSchema, WireRequest};

use self::serde_api::{
    OpenAiApiRequest, OpenAiApiResponse, OpenAiApiStreamResponse, normalize_response,
    normalize_stream, system_message, to_api_message,
};

const DONE_SENTINEL: &str = "[DONE]";
/// Pseudo tool some models emit to fan out calls; it is never dispatched.
const PARALLEL_WRAPPER_TOOL: &str = "multi_tool_use.parallel";

#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    estimator: ProfileEstimator,
}

impl Default for OpenAiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAiAdapter {
    pub fn new() -> Self {
        Self {
            estimator: ProfileEstimator::new(EstimatorProfile::openai()),
        }
    }

    pub fn with_estimator(mut self, estimator: ProfileEstimator) -> Self {
        self.estimator = estimator;
        self
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn backend(&self) -> BackendId {
        BackendId::OpenAi
    }

    fn estimator(&self) -> &dyn TokenEstimator {
        &self.estimator
    }

    fn convert_messages(
        &self,
        messages: &[Message],
        config: &ResolvedConfig,
    ) -> Result<Vec<Value>, ProviderError> {
        messages
            .iter()
            .map(|message| {
                serde_json::to_value(to_api_message(message, config)).map_err(ProviderError::from)
            })
            .collect()
    }

    fn build_request(
        &self,
        wire_messages: Vec<Value>,
        system: Option<&str>,
        options: &RequestOptions,
        config: &ResolvedConfig,
        stream: bool,
    ) -> Result<WireRequest, ProviderError> {
        let mut messages = Vec::with_capacity(wire_messages.len() + 1);
        if let Some(system) = system.filter(|system| !system.is_empty()) {
            messages.push(serde_json::to_value(system_message(system))?);
        }
        messages.extend(wire_messages);

        let sampling = &options.sampling;
        let body = OpenAiApiRequest {
            model: config.model.clone(),
            messages,
            temperature: sampling.temperature_or(0.8),
            top_p: sampling.top_p_or(1.0),
            presence_penalty: sampling.presence_penalty_or(1.0),
            stream,
            top_k: sampling.top_k.filter(|top_k| *top_k > 0),
            tool_choice: options.tool_choice.clone(),
            tools: (!options.tools.is_empty())
                .then(|| options.tools.iter().map(|tool| self.convert_tool(tool)).collect()),
        };

        let url = format!("{}/chat/completions", config.endpoint_base());
        let mut request = WireRequest::new(url, serde_json::to_value(body)?, stream)
            .with_header("authorization", format!("Bearer {}", config.key));

        if let Some(org) = config.options.org.as_deref().filter(|org| !org.is_empty()) {
            request = request.with_header("openai-organization", org);
        }

        Ok(request)
    }

    fn parse_stream_chunk(&self, payload: &str) -> Result<StreamPayload, ProviderError> {
        let payload = payload.trim();
        if payload == DONE_SENTINEL {
            return Ok(StreamPayload::Done);
        }

        let parsed = serde_json::from_str::<OpenAiApiStreamResponse>(payload)?;
        normalize_stream(parsed).map(StreamPayload::Delta)
    }

    fn parse_final_response(&self, body: &str) -> Result<NormalizedResponse, ProviderError> {
        let parsed = serde_json::from_str::<OpenAiApiResponse>(body)?;
        normalize_response(parsed)
    }

    fn convert_tool(&self, tool: &ToolSchema) -> Value {
        serde_json::to_value(tool).unwrap_or(Value::Null)
    }

    fn keeps_tool_call(&self, call: &ToolCall) -> bool {
        call.name != PARALLEL_WRAPPER_TOOL
    }

    fn ends_with_sentinel(&self) -> bool {
        true
    }
}
