//! Lifecycle hooks for observing engine turns.
//!
//! ```rust
//! use nchat::{NoopTurnObserver, TurnObserver};
//!
//! fn accepts_observer(_observer: &dyn TurnObserver) {}
//!
//! accepts_observer(&NoopTurnObserver);
//! ```

use std::time::Duration;

use nprovider::{BackendId, Message, Usage};

use crate::{ChatError, ContextWindow};

pub trait TurnObserver: Send + Sync {
    fn on_turn_start(&self, _backend: BackendId, _round: u32, _reply_count: u32) {}

    fn on_context_built(&self, _backend: BackendId, _window: &ContextWindow) {}

    fn on_turn_complete(
        &self,
        _backend: BackendId,
        _assistant: &Message,
        _usage: &Usage,
        _elapsed: Duration,
    ) {
    }

    fn on_tool_round(&self, _backend: BackendId, _round: u32, _calls: usize) {}

    fn on_retry_scheduled(&self, _backend: BackendId, _reply_count: u32, _error: &ChatError) {}

    fn on_failure(&self, _backend: BackendId, _error: &ChatError, _elapsed: Duration) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTurnObserver;

impl TurnObserver for NoopTurnObserver {}
