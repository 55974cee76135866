//! Backoff helper for `ChatCallbacks::on_error` and the continuation policy
//! applied when a retry is approved.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use nchat::{ChatError, RetryPolicy};
//! use nprovider::ProviderError;
//!
//! let policy = RetryPolicy::new(2).with_initial_backoff(Duration::ZERO);
//! let transient = ChatError::from(ProviderError::from_status(503, "Service Unavailable", "busy"));
//!
//! assert!(policy.should_retry(0, &transient));
//! assert!(!policy.should_retry(1, &transient));
//! ```

use std::time::Duration;

use futures_timer::Delay;

use crate::ChatError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// `reply_count` is the number of retries already made for this send.
    pub fn should_retry(&self, reply_count: u32, error: &ChatError) -> bool {
        error.retryable && error.is_recoverable() && reply_count.saturating_add(1) < self.max_attempts
    }

    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let unbounded = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(unbounded.min(self.max_backoff.as_secs_f64()))
    }

    /// Waits out the backoff when a retry is allowed, then reports the decision.
    pub async fn approve(&self, reply_count: u32, error: &ChatError) -> bool {
        if !self.should_retry(reply_count, error) {
            return false;
        }

        let delay = self.backoff_for_attempt(reply_count.saturating_add(1));
        if !delay.is_zero() {
            Delay::new(delay).await;
        }
        true
    }
}

/// How an approved retry treats the assistant output produced before failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryContinuation {
    /// Continue without new user content, parented at the partial assistant
    /// message so its text stays in the thread.
    #[default]
    ContinueFromPartial,
    /// Resend the original contents from the original parent.
    Restart,
}
