//! Transport contract: send a built request, get a body or a sequence of events.
//!
//! ```rust
//! use nprovider::{EventStream, VecEventStream};
//!
//! let events = VecEventStream::new(vec![Ok("{\"choices\":[]}".into()), Ok("[DONE]".into())]);
//! let _boxed: EventStream<'static> = Box::pin(events);
//! ```

use std::collections::VecDeque;
use std::fmt::Debug;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use ncommon::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::request::WireRequest;

pub type ProviderFuture<'a, T> = BoxFuture<'a, T>;

/// Server-sent event payloads in arrival order. Each item is one event's data.
pub type EventStream<'a> = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send + 'a>>;

pub trait Transport: Send + Sync + Debug {
    /// Sends once and returns the raw response body of a successful call.
    fn send<'a>(
        &'a self,
        request: WireRequest,
        cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<String, ProviderError>>;

    fn open_stream<'a>(
        &'a self,
        request: WireRequest,
        cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<EventStream<'a>, ProviderError>>;
}

#[derive(Debug, Default)]
pub struct VecEventStream {
    events: VecDeque<Result<String, ProviderError>>,
}

impl VecEventStream {
    pub fn new(events: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

impl Stream for VecEventStream {
    type Item = Result<String, ProviderError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<String, ProviderError>>> {
        Poll::Ready(self.events.pop_front())
    }
}
