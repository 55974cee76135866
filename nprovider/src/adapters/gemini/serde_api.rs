//! Gemini generateContent payload serde models and conversion helpers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::config::ResolvedConfig;
use crate::error::ProviderError;
use crate::message::{ContentPart, FinishReason, Message, Role, ToolCall};
use crate::normalized::{
    NormalizedChoice, NormalizedMessage, NormalizedResponse, NormalizedStreamChunk, StreamDelta,
    ToolCallFragment, Usage,
};

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiApiRequest {
    pub safety_settings: Vec<GeminiSafetySetting>,
    pub generation_config: GeminiGenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    pub contents: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<GeminiToolConfig>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiSafetySetting {
    pub category: &'static str,
    pub threshold: &'static str,
}

pub(crate) fn permissive_safety_settings() -> Vec<GeminiSafetySetting> {
    HARM_CATEGORIES
        .into_iter()
        .map(|category| GeminiSafetySetting {
            category,
            threshold: "BLOCK_NONE",
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiGenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiToolConfig {
    pub function_calling_config: GeminiFunctionCallingConfig,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiFunctionCallingConfig {
    pub mode: &'static str,
}

impl GeminiToolConfig {
    pub(crate) fn auto() -> Self {
        Self {
            function_calling_config: GeminiFunctionCallingConfig { mode: "AUTO" },
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<GeminiInlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<GeminiFunctionResponse>,
}

impl GeminiPart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiInlineData {
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GeminiFunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GeminiFunctionResponse {
    pub name: String,
    pub response: GeminiFunctionResponseBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GeminiFunctionResponseBody {
    pub name: String,
    pub content: String,
}

pub(crate) fn system_instruction(system: &str) -> GeminiContent {
    GeminiContent {
        role: Some(Role::System.as_str().to_string()),
        parts: vec![GeminiPart::text(system)],
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::Assistant => "model",
        Role::Tool => "function",
        other => other.as_str(),
    }
}

pub(crate) fn to_api_content(message: &Message, config: &ResolvedConfig) -> GeminiContent {
    let mut parts = message
        .tool_calls
        .iter()
        .map(|call| GeminiPart {
            function_call: Some(GeminiFunctionCall {
                name: call.name.clone(),
                args: call.arguments_json(),
            }),
            ..GeminiPart::default()
        })
        .collect::<Vec<_>>();

    let contents = message.contents.as_deref().unwrap_or_default();

    if message.tool_call_id.is_some() {
        let name = message.name.clone().unwrap_or_default();
        parts.extend(contents.iter().map(|part| GeminiPart {
            function_response: Some(GeminiFunctionResponse {
                name: name.clone(),
                response: GeminiFunctionResponseBody {
                    name: name.clone(),
                    content: part.as_text().unwrap_or_default().to_string(),
                },
            }),
            ..GeminiPart::default()
        }));
    } else {
        parts.extend(contents.iter().map(|part| match part {
            ContentPart::Text { text } => GeminiPart::text(text.clone()),
            ContentPart::Image { image } => match image.base64.as_ref() {
                Some(data) if config.accepts_images() => GeminiPart {
                    inline_data: Some(GeminiInlineData {
                        data: data.clone(),
                        mime_type: image.mime.clone(),
                    }),
                    ..GeminiPart::default()
                },
                _ => GeminiPart::text(image.url.clone()),
            },
        }));
    }

    GeminiContent {
        role: Some(wire_role(message.role).to_string()),
        parts,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiApiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(default)]
    pub usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub error: Option<GeminiApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiCandidate {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub content: GeminiContent,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GeminiCandidate {
    fn role(&self) -> Option<Role> {
        self.content.role.as_deref().and_then(Role::parse)
    }

    /// Text parts joined with newlines; `None` when the candidate has no text.
    fn text(&self) -> Option<String> {
        let texts = self
            .content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>();

        (!texts.is_empty()).then(|| texts.join("\n"))
    }

    fn function_calls(&self) -> impl Iterator<Item = &GeminiFunctionCall> {
        self.content
            .parts
            .iter()
            .filter_map(|part| part.function_call.as_ref())
    }

    fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason.as_deref().map(FinishReason::parse)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiPromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiUsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}

impl From<GeminiUsageMetadata> for Usage {
    fn from(value: GeminiUsageMetadata) -> Self {
        Self {
            prompt_tokens: value.prompt_token_count,
            completion_tokens: value.candidates_token_count,
            total_tokens: value.total_token_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeminiApiError {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl GeminiApiError {
    fn into_provider_error(self) -> ProviderError {
        let mut error = ProviderError::protocol(format!("Gemini error: {}", self.message));
        error.status_code = self.code;
        error.status_text = self.status;
        error
    }
}

fn generated_call_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn args_text(args: &Value) -> String {
    match args {
        Value::Null => "{}".to_string(),
        other => other.to_string(),
    }
}

pub(crate) fn normalize_stream(response: GeminiApiResponse) -> Result<StreamDelta, ProviderError> {
    if let Some(error) = response.error {
        return Err(error.into_provider_error());
    }

    let choices = response
        .candidates
        .iter()
        .map(|candidate| NormalizedStreamChunk {
            index: candidate.index,
            role: candidate.role(),
            text_delta: candidate.text().filter(|text| !text.is_empty()),
            tool_call_fragments: candidate
                .function_calls()
                .map(|call| ToolCallFragment {
                    index: None,
                    id: Some(generated_call_id()),
                    name: Some(call.name.clone()),
                    arguments: Some(args_text(&call.args)),
                })
                .collect(),
            finish_reason: candidate.finish_reason(),
        })
        .collect();

    Ok(StreamDelta {
        choices,
        usage: response.usage_metadata.map(Usage::from),
    })
}

pub(crate) fn normalize_response(
    response: GeminiApiResponse,
) -> Result<NormalizedResponse, ProviderError> {
    if let Some(error) = response.error {
        return Err(error.into_provider_error());
    }

    if response.candidates.is_empty() {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .map(|reason| format!("prompt blocked ({reason})"))
            .unwrap_or_else(|| "unknown".to_string());
        return Err(ProviderError::protocol(format!("Gemini error: {reason}")));
    }

    let choices = response
        .candidates
        .iter()
        .map(|candidate| NormalizedChoice {
            index: candidate.index,
            message: NormalizedMessage {
                role: candidate.role().unwrap_or(Role::Assistant),
                content: candidate.text().unwrap_or_default(),
                tool_calls: candidate
                    .function_calls()
                    .map(|call| {
                        ToolCall::new(
                            generated_call_id(),
                            call.name.clone(),
                            Value::String(args_text(&call.args)),
                        )
                    })
                    .collect(),
            },
            finish_reason: candidate.finish_reason(),
        })
        .collect();

    Ok(NormalizedResponse {
        model: response.model_version,
        choices,
        usage: response.usage_metadata.map(Usage::from),
    })
}
