//! Resolved per-attempt configuration supplied by the caller.
//!
//! ```rust
//! use nprovider::{ContentType, ResolvedConfig};
//!
//! let config = ResolvedConfig::new("sk-test", "https://api.openai.com/v1", "gpt-4o-mini")
//!     .with_limits(8192, 1024)
//!     .with_content_types(vec![ContentType::Text, ContentType::Image]);
//!
//! assert_eq!(config.input_budget(), 7168);
//! assert!(config.accepts_images());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_MAX_RESPONSE_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigOptions {
    /// Sent as `OpenAI-Organization` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolvedConfig {
    pub key: String,
    pub base_url: String,
    pub model: String,
    pub system_message: Option<String>,
    pub content_types: Vec<ContentType>,
    /// Age cutoff for context ancestors in milliseconds; zero disables it.
    pub max_time: u64,
    /// Maximum retained user turns; zero disables it.
    pub max_count: u32,
    pub max_tokens: u32,
    pub max_response_tokens: u32,
    pub options: ConfigOptions,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            base_url: String::new(),
            model: String::new(),
            system_message: None,
            content_types: vec![ContentType::Text],
            max_time: 0,
            max_count: 0,
            max_tokens: DEFAULT_MAX_TOKENS,
            max_response_tokens: DEFAULT_MAX_RESPONSE_TOKENS,
            options: ConfigOptions::default(),
        }
    }
}

impl ResolvedConfig {
    pub fn new(
        key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            base_url: base_url.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = Some(system_message.into());
        self
    }

    pub fn with_content_types(mut self, content_types: Vec<ContentType>) -> Self {
        self.content_types = content_types;
        self
    }

    pub fn with_limits(mut self, max_tokens: u32, max_response_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self.max_response_tokens = max_response_tokens;
        self
    }

    pub fn with_max_time(mut self, max_time: u64) -> Self {
        self.max_time = max_time;
        self
    }

    pub fn with_max_count(mut self, max_count: u32) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn with_org(mut self, org: impl Into<String>) -> Self {
        self.options.org = Some(org.into());
        self
    }

    pub fn accepts_images(&self) -> bool {
        self.content_types.contains(&ContentType::Image)
    }

    /// Tokens left for input before system prompt and tools are charged.
    pub fn input_budget(&self) -> i64 {
        i64::from(self.max_tokens) - i64::from(self.max_response_tokens)
    }

    pub(crate) fn endpoint_base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn deserialize_fills_missing_fields_with_defaults() {
        let config: ResolvedConfig = serde_json::from_value(json!({
            "key": "k",
            "base_url": "https://example.test/",
            "model": "gemini-1.5-pro",
            "options": {"org": "org-1", "region": "eu"}
        }))
        .expect("config should deserialize");

        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.content_types, vec![ContentType::Text]);
        assert_eq!(config.options.org.as_deref(), Some("org-1"));
        assert_eq!(config.options.extra.get("region"), Some(&json!("eu")));
        assert_eq!(config.endpoint_base(), "https://example.test");
        assert!(!config.accepts_images());
    }

    #[test]
    fn input_budget_may_go_negative() {
        let config = ResolvedConfig::default().with_limits(100, 400);
        assert_eq!(config.input_budget(), -300);
    }
}
