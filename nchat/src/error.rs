//! Chat-layer errors and classification.
//!
//! ```rust
//! use nchat::{BudgetOverflow, ChatError, ChatErrorKind};
//!
//! let budget = ChatError::budget(BudgetOverflow {
//!     system_tokens: 10,
//!     tools_tokens: 5,
//!     message_tokens: 4000,
//!     budget: 3000,
//! });
//!
//! assert_eq!(budget.kind, ChatErrorKind::Budget);
//! assert!(!budget.is_recoverable());
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use nprovider::{ProviderError, ProviderErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    /// The leaf message alone does not fit the input budget.
    Budget,
    Provider,
    Protocol,
    MalformedChunk,
    /// The tool handler answered a call id that was never issued.
    ToolResultMissing,
    Tooling,
    Store,
    Cancelled,
    Config,
}

/// Component costs reported when the leaf message cannot fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetOverflow {
    pub system_tokens: u32,
    pub tools_tokens: u32,
    pub message_tokens: u32,
    pub budget: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    pub retryable: bool,
    pub status_code: Option<u16>,
    pub status_text: Option<String>,
    pub budget: Option<BudgetOverflow>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: false,
            status_code: None,
            status_text: None,
            budget: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn budget(overflow: BudgetOverflow) -> Self {
        let mut error = Self::new(
            ChatErrorKind::Budget,
            format!(
                "message is too long for the context window, try shortening it \
                 (systemTokens: {}, toolTokens: {}, textTokens: {})",
                overflow.system_tokens, overflow.tools_tokens, overflow.message_tokens
            ),
        );
        error.budget = Some(overflow);
        error
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Provider, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Protocol, message)
    }

    pub fn malformed_chunk(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::MalformedChunk, message)
    }

    pub fn tool_result_missing(call_id: impl Display) -> Self {
        Self::new(
            ChatErrorKind::ToolResultMissing,
            format!("tool result references unknown call '{call_id}'"),
        )
    }

    pub fn tooling(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Tooling, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Store, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Cancelled, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Config, message)
    }

    /// Errors the retry shell may hand to the caller's error policy.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self.kind,
            ChatErrorKind::Budget | ChatErrorKind::ToolResultMissing | ChatErrorKind::Cancelled
        )
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{:?} ({code}): {}", self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ChatError {}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        let kind = match value.kind {
            ProviderErrorKind::Protocol => ChatErrorKind::Protocol,
            ProviderErrorKind::MalformedChunk => ChatErrorKind::MalformedChunk,
            ProviderErrorKind::Cancelled => ChatErrorKind::Cancelled,
            ProviderErrorKind::InvalidRequest => ChatErrorKind::InvalidRequest,
            _ => ChatErrorKind::Provider,
        };

        Self {
            kind,
            message: value.message,
            retryable: value.retryable,
            status_code: value.status_code,
            status_text: value.status_text,
            budget: None,
        }
    }
}
