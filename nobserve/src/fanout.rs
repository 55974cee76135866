use std::sync::Arc;
use std::time::Duration;

use nchat::{ChatError, ContextWindow, TurnObserver};
use nprovider::{BackendId, Message, Usage};

/// Forwards every hook to each observer in registration order.
#[derive(Clone, Default)]
pub struct FanoutTurnObserver {
    observers: Vec<Arc<dyn TurnObserver>>,
}

impl FanoutTurnObserver {
    pub fn new(observers: Vec<Arc<dyn TurnObserver>>) -> Self {
        Self { observers }
    }

    pub fn with(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl TurnObserver for FanoutTurnObserver {
    fn on_turn_start(&self, backend: BackendId, round: u32, reply_count: u32) {
        for observer in &self.observers {
            observer.on_turn_start(backend, round, reply_count);
        }
    }

    fn on_context_built(&self, backend: BackendId, window: &ContextWindow) {
        for observer in &self.observers {
            observer.on_context_built(backend, window);
        }
    }

    fn on_turn_complete(
        &self,
        backend: BackendId,
        assistant: &Message,
        usage: &Usage,
        elapsed: Duration,
    ) {
        for observer in &self.observers {
            observer.on_turn_complete(backend, assistant, usage, elapsed);
        }
    }

    fn on_tool_round(&self, backend: BackendId, round: u32, calls: usize) {
        for observer in &self.observers {
            observer.on_tool_round(backend, round, calls);
        }
    }

    fn on_retry_scheduled(&self, backend: BackendId, reply_count: u32, error: &ChatError) {
        for observer in &self.observers {
            observer.on_retry_scheduled(backend, reply_count, error);
        }
    }

    fn on_failure(&self, backend: BackendId, error: &ChatError, elapsed: Duration) {
        for observer in &self.observers {
            observer.on_failure(backend, error, elapsed);
        }
    }
}
