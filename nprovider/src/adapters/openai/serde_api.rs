//! OpenAI chat-completions payload serde models and conversion helpers.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::ResolvedConfig;
use crate::error::ProviderError;
use crate::message::{ContentPart, FinishReason, Message, Role, ToolCall};
use crate::normalized::{
    NormalizedChoice, NormalizedMessage, NormalizedResponse, NormalizedStreamChunk, StreamDelta,
    ToolCallFragment, Usage,
};

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiRequest {
    pub model: String,
    pub messages: Vec<Value>,
    pub temperature: f32,
    pub top_p: f32,
    pub presence_penalty: f32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiMessage {
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<OpenAiApiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<OpenAiApiToolCallOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum OpenAiApiContent {
    Text(String),
    Parts(Vec<OpenAiApiContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub(crate) enum OpenAiApiContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: OpenAiApiImageUrl },
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiImageUrl {
    pub url: String,
    pub detail: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiToolCallOut {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: OpenAiApiFunctionOut,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiFunctionOut {
    pub name: String,
    pub arguments: String,
}

pub(crate) fn system_message(system: &str) -> OpenAiApiMessage {
    OpenAiApiMessage {
        role: Role::System.as_str(),
        content: Some(OpenAiApiContent::Text(system.to_string())),
        tool_calls: Vec::new(),
        tool_call_id: None,
    }
}

pub(crate) fn to_api_message(message: &Message, config: &ResolvedConfig) -> OpenAiApiMessage {
    let content = message.contents.as_ref().map(|contents| {
        OpenAiApiContent::Parts(
            contents
                .iter()
                .map(|part| to_api_content_part(part, config))
                .collect(),
        )
    });

    OpenAiApiMessage {
        role: message.role.as_str(),
        content,
        tool_calls: message
            .tool_calls
            .iter()
            .map(|call| OpenAiApiToolCallOut {
                id: call.id.clone(),
                kind: "function",
                function: OpenAiApiFunctionOut {
                    name: call.name.clone(),
                    arguments: call.arguments_text(),
                },
            })
            .collect(),
        tool_call_id: message.tool_call_id.clone(),
    }
}

fn to_api_content_part(part: &ContentPart, config: &ResolvedConfig) -> OpenAiApiContentPart {
    match part {
        ContentPart::Text { text } => OpenAiApiContentPart::Text { text: text.clone() },
        ContentPart::Image { image } if config.accepts_images() => OpenAiApiContentPart::ImageUrl {
            image_url: OpenAiApiImageUrl {
                url: image.url.clone(),
                detail: image.detail.as_str(),
            },
        },
        ContentPart::Image { image } => OpenAiApiContentPart::Text {
            text: image.url.clone(),
        },
    }
}

/// Compatible servers send `null` where OpenAI omits the field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenAiApiResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<OpenAiApiChoice>,
    #[serde(default)]
    pub usage: Option<OpenAiApiUsage>,
    #[serde(default)]
    pub error: Option<OpenAiApiError>,
    #[serde(default)]
    pub detail: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub index: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: OpenAiApiResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenAiApiResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_calls: Vec<OpenAiApiToolCallIn>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiToolCallIn {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub function: OpenAiApiFunctionIn,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenAiApiFunctionIn {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct OpenAiApiUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl From<OpenAiApiUsage> for Usage {
    fn from(value: OpenAiApiUsage) -> Self {
        Self {
            prompt_tokens: value.prompt_tokens,
            completion_tokens: value.completion_tokens,
            total_tokens: value.total_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
}

impl OpenAiApiError {
    pub(crate) fn into_provider_error(self) -> ProviderError {
        let mut error = ProviderError::protocol(format!("OpenAI error: {}", self.message));
        let code = match &self.code {
            Some(Value::Number(code)) => code.as_u64().and_then(|code| u16::try_from(code).ok()),
            Some(Value::String(code)) => code.parse::<u16>().ok(),
            _ => None,
        };
        error.status_code = code;
        error.status_text = self.kind.or_else(|| {
            self.code
                .as_ref()
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        error
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<OpenAiApiStreamChoice>,
    #[serde(default)]
    pub usage: Option<OpenAiApiUsage>,
    #[serde(default)]
    pub error: Option<OpenAiApiError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub index: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub delta: OpenAiApiDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenAiApiDelta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_calls: Vec<OpenAiApiToolCallDelta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiToolCallDelta {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<OpenAiApiFunctionDelta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiFunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

pub(crate) fn normalize_response(
    response: OpenAiApiResponse,
) -> Result<NormalizedResponse, ProviderError> {
    if let Some(error) = response.error {
        return Err(error.into_provider_error());
    }

    if response.choices.is_empty() {
        let detail = match &response.detail {
            Some(Value::String(detail)) => detail.clone(),
            Some(detail) => detail
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| detail.to_string()),
            None => "unknown".to_string(),
        };
        return Err(ProviderError::protocol(format!("OpenAI error: {detail}")));
    }

    let choices = response
        .choices
        .into_iter()
        .map(|choice| NormalizedChoice {
            index: choice.index,
            message: NormalizedMessage {
                role: choice
                    .message
                    .role
                    .as_deref()
                    .and_then(Role::parse)
                    .unwrap_or(Role::Assistant),
                content: choice.message.content.unwrap_or_default(),
                tool_calls: choice
                    .message
                    .tool_calls
                    .into_iter()
                    .map(|call| ToolCall::new(call.id, call.function.name, call.function.arguments))
                    .collect(),
            },
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::parse),
        })
        .collect();

    Ok(NormalizedResponse {
        model: response.model,
        choices,
        usage: response.usage.map(Usage::from),
    })
}

pub(crate) fn normalize_stream(
    response: OpenAiApiStreamResponse,
) -> Result<StreamDelta, ProviderError> {
    if let Some(error) = response.error {
        return Err(error.into_provider_error());
    }

    let choices = response
        .choices
        .into_iter()
        .map(|choice| NormalizedStreamChunk {
            index: choice.index,
            role: choice.delta.role.as_deref().and_then(Role::parse),
            text_delta: choice.delta.content.filter(|content| !content.is_empty()),
            tool_call_fragments: choice
                .delta
                .tool_calls
                .into_iter()
                .filter_map(|call| {
                    let function = call.function?;
                    Some(ToolCallFragment {
                        index: Some(call.index.unwrap_or(0)),
                        id: call.id,
                        name: function.name,
                        arguments: function.arguments,
                    })
                })
                .collect(),
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::parse),
        })
        .collect();

    Ok(StreamDelta {
        choices,
        usage: response.usage.map(Usage::from),
    })
}
