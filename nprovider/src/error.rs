//! Shared provider error kinds and error value helpers.
//!
//! ```rust
//! use nprovider::{ProviderError, ProviderErrorKind};
//!
//! let auth = ProviderError::from_status(401, "Unauthorized", "bad key");
//! assert_eq!(auth.kind, ProviderErrorKind::Authentication);
//! assert_eq!(auth.status_code, Some(401));
//! assert!(!auth.retryable);
//!
//! let timeout = ProviderError::timeout("temporary timeout");
//! assert!(timeout.retryable);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Authentication,
    RateLimited,
    InvalidRequest,
    Timeout,
    Transport,
    Unavailable,
    /// The backend answered, but with an error envelope or no choices.
    Protocol,
    MalformedChunk,
    Cancelled,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
    pub status_code: Option<u16>,
    pub status_text: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            status_code: None,
            status_text: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Authentication, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message, true)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message, false)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message, true)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message, true)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unavailable, message, true)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Protocol, message, true)
    }

    pub fn malformed_chunk(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::MalformedChunk, message, true)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Cancelled, message, false)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Other, message, false)
    }

    /// Classifies an HTTP failure by status and keeps the status pair for callers.
    pub fn from_status(
        status_code: u16,
        status_text: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let error = match status_code {
            401 | 403 => Self::authentication(message),
            429 => Self::rate_limited(message),
            408 | 504 => Self::timeout(message),
            400 | 422 => Self::invalid_request(message),
            502 | 503 => Self::unavailable(message),
            _ => Self::transport(message),
        };

        error.with_status(status_code, status_text)
    }

    pub fn with_status(mut self, status_code: u16, status_text: impl Into<String>) -> Self {
        self.status_code = Some(status_code);
        self.status_text = Some(status_text.into());
        self
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = Some(status_text.into());
        self
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{:?} ({code}): {}", self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ProviderError {}

impl From<serde_json::Error> for ProviderError {
    fn from(value: serde_json::Error) -> Self {
        ProviderError::malformed_chunk(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_kinds_and_retryability() {
        let cases = [
            (401, ProviderErrorKind::Authentication, false),
            (403, ProviderErrorKind::Authentication, false),
            (429, ProviderErrorKind::RateLimited, true),
            (408, ProviderErrorKind::Timeout, true),
            (400, ProviderErrorKind::InvalidRequest, false),
            (503, ProviderErrorKind::Unavailable, true),
            (500, ProviderErrorKind::Transport, true),
        ];

        for (code, kind, retryable) in cases {
            let error = ProviderError::from_status(code, "status", "failed");
            assert_eq!(error.kind, kind, "status {code}");
            assert_eq!(error.retryable, retryable, "status {code}");
            assert_eq!(error.status_code, Some(code));
            assert_eq!(error.status_text.as_deref(), Some("status"));
        }
    }

    #[test]
    fn display_includes_status_when_present() {
        let error = ProviderError::from_status(429, "Too Many Requests", "slow down");
        assert_eq!(error.to_string(), "RateLimited (429): slow down");

        let error = ProviderError::protocol("no choices");
        assert_eq!(error.to_string(), "Protocol: no choices");
    }
}
