//! Deterministic token cost estimation for text, images, messages, and tools.
//!
//! The real tokenizer is pluggable; the default counts roughly four characters
//! per token. Each backend applies its own scale on top of it.
//!
//! ```rust
//! use nprovider::{EstimatorProfile, ImageDetail, ProfileEstimator, TokenEstimator};
//!
//! let openai = ProfileEstimator::new(EstimatorProfile::openai());
//! assert_eq!(openai.estimate_image(1024, 1024, ImageDetail::High), 765);
//! assert_eq!(openai.estimate_image(4096, 4096, ImageDetail::Low), 85);
//!
//! let gemini = ProfileEstimator::new(EstimatorProfile::gemini());
//! assert_eq!(gemini.estimate_image(1024, 1024, ImageDetail::Auto), 259);
//! ```

use std::fmt::Debug;
use std::sync::Arc;

use serde_json::Value;

use crate::message::{ContentPart, ImageDetail, Message};
use crate::request::ToolSchema;

const END_OF_TEXT: &str = "<|endoftext|>";

pub trait Tokenizer: Send + Sync + Debug {
    fn count(&self, text: &str) -> usize;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenizer;

impl Tokenizer for HeuristicTokenizer {
    fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImagePricing {
    Flat(u32),
    /// 512px tiles at 170 tokens each plus an 85 token base.
    Tiled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorProfile {
    pub scale: f64,
    pub long_text_threshold: usize,
    pub long_text_factor: f64,
    pub image_pricing: ImagePricing,
}

impl EstimatorProfile {
    pub fn openai() -> Self {
        Self {
            scale: 1.0,
            long_text_threshold: 60_000,
            long_text_factor: 0.5,
            image_pricing: ImagePricing::Tiled,
        }
    }

    pub fn gemini() -> Self {
        Self {
            scale: 0.8,
            long_text_threshold: 60_000,
            long_text_factor: 0.6,
            image_pricing: ImagePricing::Flat(259),
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_long_text(mut self, threshold: usize, factor: f64) -> Self {
        self.long_text_threshold = threshold;
        self.long_text_factor = factor;
        self
    }
}

pub trait TokenEstimator: Send + Sync + Debug {
    fn estimate_text(&self, parts: &[&str]) -> u32;

    fn estimate_image(&self, width: u32, height: u32, detail: ImageDetail) -> u32;

    fn estimate_contents(&self, contents: &[ContentPart]) -> u32 {
        contents
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => self.estimate_text(&[text.as_str()]),
                ContentPart::Image { image } => {
                    self.estimate_image(image.width, image.height, image.detail)
                }
            })
            .sum()
    }

    /// Serialized tool calls plus every content part.
    fn estimate_message(&self, message: &Message) -> u32 {
        let mut tokens = 0;
        if !message.tool_calls.is_empty() {
            let calls = serde_json::to_string(&message.tool_calls).unwrap_or_default();
            tokens += self.estimate_text(&[calls.as_str()]);
        }

        tokens + self.estimate_contents(message.contents.as_deref().unwrap_or_default())
    }

    /// Tools are charged for their flattened leaf values only.
    fn estimate_tools(&self, tools: &[ToolSchema]) -> u32 {
        if tools.is_empty() {
            return 0;
        }

        let flattened = tools
            .iter()
            .map(|tool| {
                let mut text = String::new();
                if let Ok(value) = serde_json::to_value(tool) {
                    flatten_leaves(&value, &mut text);
                }
                text
            })
            .collect::<Vec<_>>();
        let parts = flattened.iter().map(String::as_str).collect::<Vec<_>>();
        self.estimate_text(&parts)
    }
}

fn flatten_leaves(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => map.values().for_each(|value| flatten_leaves(value, out)),
        Value::Array(items) => items.iter().for_each(|value| flatten_leaves(value, out)),
        Value::String(text) => out.push_str(text),
        Value::Null => out.push_str("null"),
        other => out.push_str(&other.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct ProfileEstimator {
    profile: EstimatorProfile,
    tokenizer: Arc<dyn Tokenizer>,
}

impl ProfileEstimator {
    pub fn new(profile: EstimatorProfile) -> Self {
        Self {
            profile,
            tokenizer: Arc::new(HeuristicTokenizer),
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn profile(&self) -> &EstimatorProfile {
        &self.profile
    }
}

impl TokenEstimator for ProfileEstimator {
    fn estimate_text(&self, parts: &[&str]) -> u32 {
        if parts.is_empty() {
            return 0;
        }

        let text = parts
            .iter()
            .map(|part| part.replace(END_OF_TEXT, ""))
            .collect::<Vec<_>>()
            .join("\n");
        let length = text.chars().count();

        if length > self.profile.long_text_threshold {
            return (length as f64 * self.profile.long_text_factor).ceil() as u32;
        }

        (self.tokenizer.count(&text) as f64 * self.profile.scale).ceil() as u32
    }

    fn estimate_image(&self, width: u32, height: u32, detail: ImageDetail) -> u32 {
        match self.profile.image_pricing {
            ImagePricing::Flat(tokens) => tokens,
            ImagePricing::Tiled => tiled_image_tokens(width, height, detail),
        }
    }
}

fn tiled_image_tokens(width: u32, height: u32, detail: ImageDetail) -> u32 {
    if detail == ImageDetail::Low {
        return 85;
    }

    let (mut width, mut height) = (f64::from(width), f64::from(height));

    let longest = width.max(height);
    if longest > 2048.0 {
        let scale = 2048.0 / longest;
        width *= scale;
        height *= scale;
    }

    let shortest = width.min(height);
    if shortest > 768.0 {
        let scale = 768.0 / shortest;
        width *= scale;
        height *= scale;
    }

    let tiles = (width / 512.0).ceil() * (height / 512.0).ceil();
    tiles as u32 * 170 + 85
}
