//! Structured `tracing` events for every engine lifecycle hook.
//!
//! ```rust
//! use nchat::TurnObserver;
//! use nobserve::TracingTurnObserver;
//!
//! fn accepts_observer(_observer: &dyn TurnObserver) {}
//!
//! accepts_observer(&TracingTurnObserver);
//! ```

use std::time::Duration;

use nchat::{ChatError, ContextWindow, TurnObserver};
use nprovider::{BackendId, Message, Usage};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTurnObserver;

impl TurnObserver for TracingTurnObserver {
    fn on_turn_start(&self, backend: BackendId, round: u32, reply_count: u32) {
        tracing::info!(
            phase = "turn",
            event = "start",
            backend = %backend,
            round,
            reply_count
        );
    }

    fn on_context_built(&self, backend: BackendId, window: &ContextWindow) {
        tracing::info!(
            phase = "context",
            event = "built",
            backend = %backend,
            messages = window.messages.len(),
            total_tokens = window.total_tokens,
            system_tokens = window.system_tokens,
            tools_tokens = window.tools_tokens
        );
    }

    fn on_turn_complete(
        &self,
        backend: BackendId,
        assistant: &Message,
        usage: &Usage,
        elapsed: Duration,
    ) {
        tracing::info!(
            phase = "turn",
            event = "complete",
            backend = %backend,
            message_id = assistant.id.as_ref().map(|id| id.as_str()),
            finish_reason = assistant.finish_reason.map(|reason| reason.as_str()),
            tool_calls = assistant.tool_calls.len(),
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_tool_round(&self, backend: BackendId, round: u32, calls: usize) {
        tracing::info!(
            phase = "tool",
            event = "round",
            backend = %backend,
            round,
            calls
        );
    }

    fn on_retry_scheduled(&self, backend: BackendId, reply_count: u32, error: &ChatError) {
        tracing::warn!(
            phase = "turn",
            event = "retry_scheduled",
            backend = %backend,
            reply_count,
            error_kind = ?error.kind,
            status_code = error.status_code,
            retryable = error.retryable,
            error = %error
        );
    }

    fn on_failure(&self, backend: BackendId, error: &ChatError, elapsed: Duration) {
        tracing::error!(
            phase = "turn",
            event = "failure",
            backend = %backend,
            error_kind = ?error.kind,
            status_code = error.status_code,
            retryable = error.retryable,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error
        );
    }
}
