//! `metrics` counters and histograms for engine turns, labelled by backend.

use std::time::Duration;

use nchat::{ChatError, ContextWindow, TurnObserver};
use nprovider::{BackendId, Message, Usage};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsTurnObserver;

impl TurnObserver for MetricsTurnObserver {
    fn on_turn_start(&self, backend: BackendId, _round: u32, _reply_count: u32) {
        metrics::counter!("nexus_turn_start_total", "backend" => backend.as_str()).increment(1);
    }

    fn on_context_built(&self, backend: BackendId, window: &ContextWindow) {
        metrics::histogram!("nexus_context_tokens", "backend" => backend.as_str())
            .record(f64::from(window.total_tokens));
        metrics::histogram!("nexus_context_messages", "backend" => backend.as_str())
            .record(window.messages.len() as f64);
    }

    fn on_turn_complete(
        &self,
        backend: BackendId,
        assistant: &Message,
        usage: &Usage,
        elapsed: Duration,
    ) {
        let finish_reason = assistant
            .finish_reason
            .map(|reason| reason.as_str())
            .unwrap_or("none");

        metrics::counter!(
            "nexus_turn_complete_total",
            "backend" => backend.as_str(),
            "finish_reason" => finish_reason
        )
        .increment(1);
        metrics::counter!("nexus_prompt_tokens_total", "backend" => backend.as_str())
            .increment(u64::from(usage.prompt_tokens));
        metrics::counter!("nexus_completion_tokens_total", "backend" => backend.as_str())
            .increment(u64::from(usage.completion_tokens));
        metrics::histogram!("nexus_turn_duration_seconds", "backend" => backend.as_str())
            .record(elapsed.as_secs_f64());
    }

    fn on_tool_round(&self, backend: BackendId, _round: u32, calls: usize) {
        metrics::counter!("nexus_tool_round_total", "backend" => backend.as_str()).increment(1);
        metrics::histogram!("nexus_tool_calls_per_round", "backend" => backend.as_str())
            .record(calls as f64);
    }

    fn on_retry_scheduled(&self, backend: BackendId, _reply_count: u32, error: &ChatError) {
        metrics::counter!(
            "nexus_retry_scheduled_total",
            "backend" => backend.as_str(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }

    fn on_failure(&self, backend: BackendId, error: &ChatError, elapsed: Duration) {
        metrics::counter!(
            "nexus_turn_failure_total",
            "backend" => backend.as_str(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!("nexus_failed_turn_duration_seconds", "backend" => backend.as_str())
            .record(elapsed.as_secs_f64());
    }
}
