//! Turn orchestration: context, request, stream or batch, tool rounds, retries.

use std::sync::Arc;
use std::time::Instant;

use futures_util::{FutureExt, StreamExt};
use ncommon::now_millis;
use nprovider::{
    BackendId, CancellationToken, ContentPart, Message, MessageId, ProviderAdapter,
    ProviderError, RequestOptions, ResolvedConfig, Role, SessionId, Transport, Usage, WireRequest,
};
use uuid::Uuid;

use crate::{
    ChatCallbacks, ChatError, ContextBuilder, ContextParams, ContextWindow, MessageStore,
    NoopTurnObserver, NullMessageStore, ReassembledTurn, RetryContinuation, StreamReassembler,
    ToolInvocation, TurnObserver, persist,
};

/// Text stored on a tool message until its result arrives.
pub const TOOL_PLACEHOLDER_TEXT: &str = "calling...";

#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub stream: bool,
    /// Overrides the configured system message for this send.
    pub system_message: Option<String>,
    pub session_id: Option<SessionId>,
    pub parent_message_id: Option<MessageId>,
    /// Id for the new user message; generated when absent.
    pub message_id: Option<MessageId>,
    pub request: RequestOptions,
    pub cancel: Option<CancellationToken>,
    pub reply_count: u32,
    /// Tool rounds allowed after the first turn. `None` is unbounded.
    pub max_tool_rounds: Option<u32>,
    pub retry_continuation: RetryContinuation,
}

impl SendOptions {
    pub fn streaming() -> Self {
        Self {
            stream: true,
            ..Self::default()
        }
    }

    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = Some(system_message.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<SessionId>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_parent(mut self, parent_message_id: impl Into<MessageId>) -> Self {
        self.parent_message_id = Some(parent_message_id.into());
        self
    }

    pub fn with_message_id(mut self, message_id: impl Into<MessageId>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_request(mut self, request: RequestOptions) -> Self {
        self.request = request;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_max_tool_rounds(mut self, max_tool_rounds: u32) -> Self {
        self.max_tool_rounds = Some(max_tool_rounds);
        self
    }

    pub fn with_retry_continuation(mut self, retry_continuation: RetryContinuation) -> Self {
        self.retry_continuation = retry_continuation;
        self
    }
}

/// Where one attempt got to before it returned.
#[derive(Debug, Clone, Default)]
struct AttemptProgress {
    user_id: Option<MessageId>,
    assistant_id: Option<MessageId>,
}

/// Where the next attempt starts.
#[derive(Debug, Clone)]
struct AttemptStart {
    contents: Option<Vec<ContentPart>>,
    parent_id: Option<MessageId>,
    message_id: Option<MessageId>,
}

#[derive(Clone)]
pub struct ChatEngine {
    adapter: Arc<dyn ProviderAdapter>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn MessageStore>,
    observer: Arc<dyn TurnObserver>,
}

impl ChatEngine {
    pub fn new(adapter: Arc<dyn ProviderAdapter>, transport: Arc<dyn Transport>) -> Self {
        Self {
            adapter,
            transport,
            store: Arc::new(NullMessageStore),
            observer: Arc::new(NoopTurnObserver),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn backend(&self) -> BackendId {
        self.adapter.backend()
    }

    pub fn adapter(&self) -> &dyn ProviderAdapter {
        self.adapter.as_ref()
    }

    pub fn store(&self) -> &dyn MessageStore {
        self.store.as_ref()
    }

    /// Runs a send with the retry shell around it. Configuration is resolved
    /// again for every attempt, and `on_error` decides whether a recoverable
    /// failure is retried.
    pub async fn send_message(
        &self,
        contents: Option<Vec<ContentPart>>,
        options: SendOptions,
        callbacks: &dyn ChatCallbacks,
    ) -> Result<Message, ChatError> {
        let backend = self.backend();
        let started = Instant::now();
        let mut reply_count = options.reply_count;
        let mut start = AttemptStart {
            contents,
            parent_id: options.parent_message_id.clone(),
            message_id: options.message_id.clone(),
        };

        loop {
            let config = callbacks.on_config().await?;
            let mut progress = AttemptProgress::default();

            let error = match self
                .run_attempt(start.clone(), &options, &config, callbacks, reply_count, &mut progress)
                .await
            {
                Ok(message) => return Ok(message),
                Err(error) => error,
            };

            if !error.is_recoverable() || !callbacks.on_error(&config, &error, reply_count).await {
                self.observer.on_failure(backend, &error, started.elapsed());
                return Err(error);
            }

            self.observer.on_retry_scheduled(backend, reply_count, &error);
            start = next_attempt_start(start, progress, options.retry_continuation);
            reply_count += 1;
        }
    }

    /// One attempt without the retry shell.
    pub async fn send_message_body(
        &self,
        contents: Option<Vec<ContentPart>>,
        options: &SendOptions,
        config: &ResolvedConfig,
        callbacks: &dyn ChatCallbacks,
    ) -> Result<Message, ChatError> {
        let start = AttemptStart {
            contents,
            parent_id: options.parent_message_id.clone(),
            message_id: options.message_id.clone(),
        };
        let mut progress = AttemptProgress::default();

        self.run_attempt(start, options, config, callbacks, options.reply_count, &mut progress)
            .await
    }

    async fn run_attempt(
        &self,
        start: AttemptStart,
        options: &SendOptions,
        config: &ResolvedConfig,
        callbacks: &dyn ChatCallbacks,
        reply_count: u32,
        progress: &mut AttemptProgress,
    ) -> Result<Message, ChatError> {
        let backend = self.backend();
        let store = self.store.as_ref();
        let cancel = options.cancel.clone().unwrap_or_default();
        let system_message = options
            .system_message
            .as_deref()
            .or(config.system_message.as_deref());

        let mut leaf = Message::new(Role::User, start.contents);
        leaf.parent_id = start.parent_id;
        leaf.session_id = options.session_id.clone();
        leaf.created_time = now_millis();
        if leaf.contents.is_some() {
            leaf.id = Some(start.message_id.unwrap_or_else(new_message_id));
            leaf = persist(store, leaf).await?;
            progress.user_id = leaf.id.clone();
        }
        let user = leaf.clone();

        let mut round = 0_u32;
        loop {
            if cancel.is_cancelled() {
                return Err(ChatError::cancelled("send cancelled"));
            }

            self.observer.on_turn_start(backend, round, reply_count);
            let turn_started = Instant::now();

            let mut assistant = Message::text_message(Role::Assistant, "")
                .with_id(new_message_id())
                .with_tokens(backend.as_str(), 0)
                .with_created_time(now_millis());
            assistant.parent_id = leaf.id.clone().or_else(|| leaf.parent_id.clone());
            assistant.session_id = options.session_id.clone();
            let mut assistant = persist(store, assistant).await?;
            progress.assistant_id = assistant.id.clone();

            let window = ContextBuilder::new(self.adapter.as_ref(), store)
                .build(
                    &leaf,
                    ContextParams {
                        system_message,
                        tools: &options.request.tools,
                        config,
                        now_millis: now_millis(),
                    },
                )
                .await?;
            self.observer.on_context_built(backend, &window);

            let request = self.adapter.build_request(
                window.wire_messages.clone(),
                system_message,
                &options.request,
                config,
                options.stream,
            )?;

            let turn = if options.stream {
                self.stream_turn(request, &cancel, &mut assistant, config, callbacks)
                    .await?
            } else {
                self.batch_turn(request, &cancel).await?
            };

            let usage = self
                .finalize_assistant(&mut assistant, turn, &window, config, callbacks, options.stream)
                .await?;
            self.observer
                .on_turn_complete(backend, &assistant, &usage, turn_started.elapsed());

            if assistant.tool_calls.is_empty() {
                return Ok(assistant);
            }

            round += 1;
            if let Some(max) = options.max_tool_rounds
                && round > max
            {
                return Err(ChatError::tooling(format!(
                    "tool round limit of {max} exceeded"
                )));
            }

            let last_result = self
                .run_tool_round(&user, &assistant, options, config, callbacks, round)
                .await?;

            leaf = Message::new(Role::User, None);
            leaf.parent_id = last_result;
            leaf.session_id = options.session_id.clone();
        }
    }

    async fn stream_turn(
        &self,
        request: WireRequest,
        cancel: &CancellationToken,
        assistant: &mut Message,
        config: &ResolvedConfig,
        callbacks: &dyn ChatCallbacks,
    ) -> Result<ReassembledTurn, ChatError> {
        let mut events = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::cancelled("send cancelled")),
            opened = self.transport.open_stream(request, cancel.clone()) => opened?,
        };

        let mut reassembler = StreamReassembler::new();
        while !reassembler.is_terminal() {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ChatError::cancelled("send cancelled")),
                event = events.next() => event,
            };
            let Some(event) = event else {
                break;
            };

            let payload = self.adapter.parse_stream_chunk(&event?)?;
            if let Some(delta) = reassembler.push(payload)? {
                assistant.set_text(reassembler.text());
                *assistant = persist(self.store.as_ref(), assistant.clone()).await?;
                callbacks.on_progress(assistant, &delta, config);
            }
        }

        // Trailing usage may follow the finishing chunk. Only take what has
        // already arrived so a connection left open cannot stall the turn.
        while !reassembler.is_done() {
            let Some(Some(event)) = events.next().now_or_never() else {
                break;
            };
            reassembler.push(self.adapter.parse_stream_chunk(&event?)?)?;
        }

        if !reassembler.is_terminal() && self.adapter.ends_with_sentinel() {
            return Err(ProviderError::transport("stream ended before completion").into());
        }

        Ok(reassembler.finish())
    }

    async fn batch_turn(
        &self,
        request: WireRequest,
        cancel: &CancellationToken,
    ) -> Result<ReassembledTurn, ChatError> {
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::cancelled("send cancelled")),
            body = self.transport.send(request, cancel.clone()) => body?,
        };
        let response = self.adapter.parse_final_response(&body)?;

        Ok(ReassembledTurn {
            text: response.text().to_string(),
            tool_calls: response.tool_calls(),
            finish_reason: response.finish_reason(),
            usage: response.usage,
        })
    }

    /// Writes the final text, calls, and token cost, then reports usage.
    async fn finalize_assistant(
        &self,
        assistant: &mut Message,
        turn: ReassembledTurn,
        window: &ContextWindow,
        config: &ResolvedConfig,
        callbacks: &dyn ChatCallbacks,
        streamed: bool,
    ) -> Result<Usage, ChatError> {
        let backend = self.backend();
        let estimator = self.adapter.estimator();
        let ReassembledTurn {
            text,
            tool_calls,
            finish_reason,
            usage,
        } = turn;

        assistant.set_text(text.as_str());
        assistant.tool_calls = tool_calls
            .into_iter()
            .filter(|call| self.adapter.keeps_tool_call(call))
            .collect();
        assistant.finish_reason = finish_reason;
        let tokens = estimator.estimate_message(assistant);
        assistant.tokens.insert(backend.as_str().to_string(), tokens);
        *assistant = persist(self.store.as_ref(), assistant.clone()).await?;

        let delta = if streamed { "" } else { text.as_str() };
        callbacks.on_progress(assistant, delta, config);

        let usage = usage.unwrap_or_else(|| {
            Usage::new(window.total_tokens, estimator.estimate_text(&[text.as_str()]))
        });
        callbacks.on_usage(&usage, config, assistant);
        Ok(usage)
    }

    /// Persists one chained placeholder per call, hands the batch to the
    /// caller, and writes results back. Returns the id of the last placeholder.
    async fn run_tool_round(
        &self,
        user: &Message,
        assistant: &Message,
        options: &SendOptions,
        config: &ResolvedConfig,
        callbacks: &dyn ChatCallbacks,
        round: u32,
    ) -> Result<Option<MessageId>, ChatError> {
        let backend = self.backend();
        let store = self.store.as_ref();
        let estimator = self.adapter.estimator();

        let mut placeholders = Vec::with_capacity(assistant.tool_calls.len());
        let mut previous = assistant.id.clone();
        for call in &assistant.tool_calls {
            let mut placeholder = Message::text_message(Role::Tool, TOOL_PLACEHOLDER_TEXT)
                .with_id(new_message_id())
                .with_name(call.name.as_str())
                .with_tool_call_id(call.id.as_str())
                .with_created_time(now_millis());
            placeholder.parent_id = previous.take();
            placeholder.session_id = options.session_id.clone();

            let placeholder = persist(store, placeholder).await?;
            previous = placeholder.id.clone();
            placeholders.push(placeholder);
        }

        self.observer
            .on_tool_round(backend, round, placeholders.len());
        if let Some(last) = placeholders.last() {
            callbacks.on_progress(last, "", config);
        }

        let invocations = assistant
            .tool_calls
            .iter()
            .map(|call| ToolInvocation {
                id: call.id.clone(),
                name: call.name.clone(),
                args: call.arguments_json(),
            })
            .collect();
        let outcomes = callbacks
            .on_calling(user, assistant, config, invocations)
            .await?;

        for outcome in outcomes {
            let Some(placeholder) = placeholders
                .iter_mut()
                .find(|message| message.tool_call_id.as_deref() == Some(outcome.id.as_str()))
            else {
                return Err(ChatError::tool_result_missing(&outcome.id));
            };

            placeholder.set_text(outcome.result);
            let tokens = estimator.estimate_message(placeholder);
            placeholder.tokens.insert(backend.as_str().to_string(), tokens);
            *placeholder = persist(store, placeholder.clone()).await?;
        }

        Ok(previous)
    }
}

fn next_attempt_start(
    start: AttemptStart,
    progress: AttemptProgress,
    continuation: RetryContinuation,
) -> AttemptStart {
    match (continuation, progress.assistant_id) {
        (RetryContinuation::ContinueFromPartial, Some(assistant_id)) => AttemptStart {
            contents: None,
            parent_id: Some(assistant_id),
            message_id: None,
        },
        _ => AttemptStart {
            message_id: progress.user_id.or(start.message_id),
            ..start
        },
    }
}

fn new_message_id() -> MessageId {
    MessageId::new(Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> AttemptStart {
        AttemptStart {
            contents: Some(vec![ContentPart::text("hello")]),
            parent_id: Some(MessageId::from("root")),
            message_id: None,
        }
    }

    #[test]
    fn continue_from_partial_parents_at_the_produced_assistant() {
        let progress = AttemptProgress {
            user_id: Some(MessageId::from("u1")),
            assistant_id: Some(MessageId::from("a1")),
        };

        let next = next_attempt_start(start(), progress, RetryContinuation::ContinueFromPartial);

        assert_eq!(next.contents, None);
        assert_eq!(next.parent_id, Some(MessageId::from("a1")));
    }

    #[test]
    fn continue_without_assistant_resends_contents() {
        let progress = AttemptProgress {
            user_id: Some(MessageId::from("u1")),
            assistant_id: None,
        };

        let next = next_attempt_start(start(), progress, RetryContinuation::ContinueFromPartial);

        assert_eq!(next.contents, Some(vec![ContentPart::text("hello")]));
        assert_eq!(next.parent_id, Some(MessageId::from("root")));
        assert_eq!(next.message_id, Some(MessageId::from("u1")));
    }

    #[test]
    fn restart_reuses_the_user_message() {
        let progress = AttemptProgress {
            user_id: Some(MessageId::from("u1")),
            assistant_id: Some(MessageId::from("a1")),
        };

        let next = next_attempt_start(start(), progress, RetryContinuation::Restart);

        assert_eq!(next.parent_id, Some(MessageId::from("root")));
        assert_eq!(next.message_id, Some(MessageId::from("u1")));
    }
}
