//! Small convenience constructors for common types.

use serde_json::Value;

use crate::{BackendId, ContentPart, ImageContent, Message, Role, ToolSchema};

pub fn text(text: impl Into<String>) -> ContentPart {
    ContentPart::text(text)
}

pub fn image(url: impl Into<String>, width: u32, height: u32) -> ContentPart {
    ContentPart::image(ImageContent::new(url, width, height))
}

pub fn user_message(content: impl Into<String>) -> Message {
    Message::text_message(Role::User, content)
}

pub fn tool(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> ToolSchema {
    ToolSchema::function(name, description, parameters)
}

pub fn parse_backend_id(value: &str) -> Option<BackendId> {
    match value.trim().to_ascii_lowercase().as_str() {
        "openai" | "open-ai" | "gpt" | "chatgpt" => Some(BackendId::OpenAi),
        "gemini" | "google" | "vertex" => Some(BackendId::Gemini),
        _ => None,
    }
}
