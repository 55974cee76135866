use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use nchat::{ChatError, ContextWindow, TurnObserver};
use nprovider::{BackendId, Message, Usage};

/// Runs the wrapped observer with panics caught, so a faulty observer cannot
/// abort a turn.
pub struct SafeTurnObserver<O> {
    inner: O,
}

impl<O> SafeTurnObserver<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

impl<O> TurnObserver for SafeTurnObserver<O>
where
    O: TurnObserver,
{
    fn on_turn_start(&self, backend: BackendId, round: u32, reply_count: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_start(backend, round, reply_count)
        }));
    }

    fn on_context_built(&self, backend: BackendId, window: &ContextWindow) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_context_built(backend, window)
        }));
    }

    fn on_turn_complete(
        &self,
        backend: BackendId,
        assistant: &Message,
        usage: &Usage,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_turn_complete(backend, assistant, usage, elapsed)
        }));
    }

    fn on_tool_round(&self, backend: BackendId, round: u32, calls: usize) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_tool_round(backend, round, calls)
        }));
    }

    fn on_retry_scheduled(&self, backend: BackendId, reply_count: u32, error: &ChatError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_retry_scheduled(backend, reply_count, error)
        }));
    }

    fn on_failure(&self, backend: BackendId, error: &ChatError, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(backend, error, elapsed)
        }));
    }
}
