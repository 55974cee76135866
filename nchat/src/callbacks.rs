//! Caller-supplied capability set consulted during a send.

use nprovider::{Message, ResolvedConfig, Usage};
use serde_json::Value;

use crate::{ChatError, ChatFuture};

/// One call handed to [`ChatCallbacks::on_calling`], arguments already parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub args: Value,
}

/// The caller's answer to one [`ToolInvocation`], matched by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub id: String,
    pub name: String,
    pub result: String,
}

impl ToolOutcome {
    pub fn new(id: impl Into<String>, name: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            result: result.into(),
        }
    }
}

/// `on_config` is awaited once per attempt. `on_progress` runs inline for every
/// text delta and must stay cheap. `on_calling` runs once per tool round with
/// the whole batch.
pub trait ChatCallbacks: Send + Sync {
    fn on_config<'a>(&'a self) -> ChatFuture<'a, Result<ResolvedConfig, ChatError>>;

    fn on_progress(&self, _message: &Message, _delta: &str, _config: &ResolvedConfig) {}

    fn on_usage(&self, _usage: &Usage, _config: &ResolvedConfig, _message: &Message) {}

    fn on_calling<'a>(
        &'a self,
        _user: &'a Message,
        _assistant: &'a Message,
        _config: &'a ResolvedConfig,
        calls: Vec<ToolInvocation>,
    ) -> ChatFuture<'a, Result<Vec<ToolOutcome>, ChatError>> {
        Box::pin(async move {
            Err(ChatError::tooling(format!(
                "no tool handler installed for {} call(s)",
                calls.len()
            )))
        })
    }

    /// Decides whether a failed attempt is retried. `reply_count` is the number
    /// of attempts already retried.
    fn on_error<'a>(
        &'a self,
        _config: &'a ResolvedConfig,
        _error: &'a ChatError,
        _reply_count: u32,
    ) -> ChatFuture<'a, bool> {
        Box::pin(async { false })
    }
}
