//! Gemini generateContent adapter.
//!
//! ```rust
//! use nprovider::{ProviderAdapter, RequestOptions, ResolvedConfig};
//! use nprovider::adapters::gemini::GeminiAdapter;
//!
//! let adapter = GeminiAdapter::new();
//! let config = ResolvedConfig::new("g-key", "https://generativelanguage.googleapis.com", "gemini-1.5-pro");
//! let request = adapter
//!     .build_request(Vec::new(), None, &RequestOptions::default(), &config, true)
//!     .expect("request should build");
//!
//! assert_eq!(
//!     request.url,
//!     "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:streamGenerateContent?alt=sse"
//! );
//! assert_eq!(request.header("x-goog-api-key"), Some("g-key"));
//! ```

mod schema;
mod serde_api;

use serde_json::{Value, json};

use crate::adapter::{BackendId, ProviderAdapter};
use crate::config::ResolvedConfig;
use crate::error::ProviderError;
use crate::estimator::{EstimatorProfile, ProfileEstimator, TokenEstimator};
use crate::message::Message;
use crate::normalized::{NormalizedResponse, StreamPayload};
use crate::request::{RequestOptions, ToolSchema, WireRequest};

use self::schema::sanitize_schema;
use self::serde_api::{
    GeminiApiRequest, GeminiApiResponse, GeminiGenerationConfig, GeminiToolConfig,
    normalize_response, normalize_stream, permissive_safety_settings, system_instruction,
    to_api_content,
};

const CLIENT_HEADER: &str = concat!("nexus-rs/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    estimator: ProfileEstimator,
}

impl Default for GeminiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiAdapter {
    pub fn new() -> Self {
        Self {
            estimator: ProfileEstimator::new(EstimatorProfile::gemini()),
        }
    }

    pub fn with_estimator(mut self, estimator: ProfileEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// 1.5-series models are only served from the beta surface.
    fn api_version(model: &str) -> &'static str {
        if model.contains("1.5") { "v1beta" } else { "v1" }
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn backend(&self) -> BackendId {
        BackendId::Gemini
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
                serde_json::to_value(to_api_content(message, config)).map_err(ProviderError::from)
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
        let sampling = &options.sampling;
        let has_tools = !options.tools.is_empty();

        let body = GeminiApiRequest {
            safety_settings: permissive_safety_settings(),
            generation_config: GeminiGenerationConfig {
                temperature: sampling.temperature_or(0.8),
                top_p: sampling.top_p_or(1.0),
                top_k: sampling.top_k.filter(|top_k| *top_k > 0),
            },
            system_instruction: system
                .filter(|system| !system.is_empty())
                .map(system_instruction),
            contents: wire_messages,
            tools: has_tools
                .then(|| options.tools.iter().map(|tool| self.convert_tool(tool)).collect()),
            tool_config: has_tools.then(GeminiToolConfig::auto),
        };

        let method = if stream {
            "streamGenerateContent?alt=sse"
        } else {
            "generateContent"
        };
        let url = format!(
            "{}/{}/models/{}:{method}",
            config.endpoint_base(),
            Self::api_version(&config.model),
            config.model
        );

        Ok(WireRequest::new(url, serde_json::to_value(body)?, stream)
            .with_header("x-goog-api-client", CLIENT_HEADER)
            .with_header("x-goog-api-key", config.key.clone()))
    }

    fn parse_stream_chunk(&self, payload: &str) -> Result<StreamPayload, ProviderError> {
        let parsed = serde_json::from_str::<GeminiApiResponse>(payload)?;
        normalize_stream(parsed).map(StreamPayload::Delta)
    }

    fn parse_final_response(&self, body: &str) -> Result<NormalizedResponse, ProviderError> {
        let parsed = serde_json::from_str::<GeminiApiResponse>(body)?;
        normalize_response(parsed)
    }

    fn convert_tool(&self, tool: &ToolSchema) -> Value {
        let mut parameters = tool.function.parameters.clone();
        sanitize_schema(&mut parameters);

        json!({
            "functionDeclarations": [{
                "name": tool.function.name,
                "description": tool.function.description,
                "parameters": parameters,
            }]
        })
    }
}
