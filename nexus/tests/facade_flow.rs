use std::sync::{Arc, Mutex};

use nexus::nprovider::{EventStream, ProviderFuture, VecEventStream, WireRequest};
use nexus::prelude::*;
use nexus::{ContentType, FanoutTurnObserver, MetricsTurnObserver, ProviderError, TracingTurnObserver, Transport};
use serde_json::json;

#[derive(Debug)]
struct CannedTransport {
    body: String,
    seen: Mutex<Vec<WireRequest>>,
}

impl CannedTransport {
    fn new(body: serde_json::Value) -> Self {
        Self {
            body: body.to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl Transport for CannedTransport {
    fn send<'a>(
        &'a self,
        request: WireRequest,
        _cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move {
            self.seen.lock().expect("seen lock").push(request);
            Ok(self.body.clone())
        })
    }

    fn open_stream<'a>(
        &'a self,
        request: WireRequest,
        _cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<EventStream<'a>, ProviderError>> {
        Box::pin(async move {
            self.seen.lock().expect("seen lock").push(request);
            // One event, then the stream ends without a sentinel.
            Ok(Box::pin(VecEventStream::new(vec![Ok(self.body.clone())])) as EventStream<'a>)
        })
    }
}

struct StaticConfig(ResolvedConfig);

impl ChatCallbacks for StaticConfig {
    fn on_config<'a>(&'a self) -> ChatFuture<'a, Result<ResolvedConfig, ChatError>> {
        Box::pin(async move { Ok(self.0.clone()) })
    }
}

fn observed_engine(backend: BackendId, transport: Arc<CannedTransport>) -> ChatEngine {
    let observer = FanoutTurnObserver::new(vec![Arc::new(TracingTurnObserver)])
        .with(Arc::new(MetricsTurnObserver));

    ChatEngine::new(build_adapter(backend).expect("adapter"), transport)
        .with_store(Arc::new(InMemoryMessageStore::new()))
        .with_observer(Arc::new(observer))
}

#[tokio::test]
async fn facade_helpers_drive_an_openai_batch_turn() {
    let transport = Arc::new(CannedTransport::new(json!({
        "choices": [{"message": {"role": "assistant", "content": "a cat"}, "finish_reason": "stop"}]
    })));
    let callbacks = StaticConfig(ResolvedConfig::new(
        "sk-test",
        "https://backend.test/v1",
        "gpt-4o-mini",
    )
    .with_content_types(vec![ContentType::Text, ContentType::Image]));

    let reply = observed_engine(BackendId::OpenAi, transport.clone())
        .send_message(
            nx_contents![
                text => "what is this?",
                image => ("https://img.test/cat.png", 256, 256),
            ],
            SendOptions::default().with_system_message("Be brief."),
            &callbacks,
        )
        .await
        .expect("send should succeed");

    assert_eq!(reply.text(), "a cat");
    assert_eq!(reply.role, Role::Assistant);

    let seen = transport.seen.lock().expect("seen lock");
    let messages = seen[0].body["messages"].as_array().expect("messages");
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[1]["content"][1]["type"], "image_url");
}

#[tokio::test]
async fn facade_streams_a_gemini_turn() {
    let transport = Arc::new(CannedTransport::new(json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": "hello there"}]}, "finishReason": "STOP"}],
        "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 2, "totalTokenCount": 5}
    })));
    let callbacks = StaticConfig(ResolvedConfig::new(
        "g-test",
        "https://gemini.test/v1beta",
        "gemini-1.5-flash",
    ));

    let reply = observed_engine(BackendId::Gemini, transport)
        .send_message(nx_text!("hi"), SendOptions::streaming(), &callbacks)
        .await
        .expect("stream should succeed");

    assert_eq!(reply.text(), "hello there");
    assert_eq!(reply.finish_reason, Some(FinishReason::Stop));
}
