#![cfg(all(feature = "provider-openai", feature = "provider-gemini"))]

use std::sync::Mutex;

use futures_util::StreamExt;
use nprovider::adapters::gemini::GeminiAdapter;
use nprovider::adapters::openai::OpenAiAdapter;
use nprovider::{
    CancellationToken, EventStream, FinishReason, Message, ProviderAdapter, ProviderError,
    ProviderFuture, RequestOptions, ResolvedConfig, Role, StreamPayload, Transport,
    VecEventStream, WireRequest,
};
use serde_json::json;

#[derive(Debug)]
struct MockTransport {
    body: String,
    events: Vec<String>,
    seen: Mutex<Vec<WireRequest>>,
}

impl MockTransport {
    fn new(body: serde_json::Value, events: Vec<&str>) -> Self {
        Self {
            body: body.to_string(),
            events: events.into_iter().map(str::to_string).collect(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl Transport for MockTransport {
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
            let events = self.events.iter().cloned().map(Ok).collect();
            Ok(Box::pin(VecEventStream::new(events)) as EventStream<'a>)
        })
    }
}

async fn round_trip(adapter: &dyn ProviderAdapter, transport: &MockTransport, model: &str) -> String {
    let config = ResolvedConfig::new("key", "https://backend.test", model);
    let wire = adapter
        .convert_messages(&[Message::text_message(Role::User, "hello")], &config)
        .expect("messages should convert");
    let request = adapter
        .build_request(wire, Some("system"), &RequestOptions::default(), &config, false)
        .expect("request should build");
    let body = transport
        .send(request, CancellationToken::new())
        .await
        .expect("send should succeed");

    adapter
        .parse_final_response(&body)
        .expect("response should parse")
        .text()
        .to_string()
}

#[tokio::test]
async fn openai_round_trip_preserves_mock_text() {
    let transport = MockTransport::new(
        json!({"choices": [{"message": {"role": "assistant", "content": "hi there"}, "finish_reason": "stop"}]}),
        Vec::new(),
    );

    let text = round_trip(&OpenAiAdapter::new(), &transport, "gpt-4o-mini").await;

    assert_eq!(text, "hi there");
    let seen = transport.seen.lock().expect("seen lock");
    assert_eq!(seen[0].body["messages"][0]["role"], "system");
    assert_eq!(seen[0].body["messages"][1]["content"][0]["text"], "hello");
}

#[tokio::test]
async fn gemini_round_trip_preserves_mock_text() {
    let transport = MockTransport::new(
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "bonjour"}]}, "finishReason": "STOP"}]}),
        Vec::new(),
    );

    let text = round_trip(&GeminiAdapter::new(), &transport, "gemini-pro").await;

    assert_eq!(text, "bonjour");
    let seen = transport.seen.lock().expect("seen lock");
    assert_eq!(seen[0].body["contents"][0]["role"], "user");
    assert_eq!(seen[0].body["systemInstruction"]["parts"][0]["text"], "system");
}

#[tokio::test]
async fn openai_stream_events_normalize_in_order() {
    let transport = MockTransport::new(
        json!({}),
        vec![
            r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":"Hel"}}]}"#,
            r#"{"choices":[{"index":0,"delta":{"content":"lo"},"finish_reason":"stop"}]}"#,
            "[DONE]",
        ],
    );
    let adapter = OpenAiAdapter::new();
    let config = ResolvedConfig::new("key", "https://backend.test", "gpt-4o-mini");
    let request = adapter
        .build_request(Vec::new(), None, &RequestOptions::default(), &config, true)
        .expect("request should build");

    let mut stream = transport
        .open_stream(request, CancellationToken::new())
        .await
        .expect("stream should open");

    let mut text = String::new();
    let mut finish = None;
    let mut done = false;
    while let Some(event) = stream.next().await {
        match adapter.parse_stream_chunk(&event.expect("event")).expect("chunk parses") {
            StreamPayload::Delta(delta) => {
                for chunk in delta.choices {
                    text.push_str(chunk.text_delta.as_deref().unwrap_or_default());
                    finish = chunk.finish_reason.or(finish);
                }
            }
            StreamPayload::Done => done = true,
        }
    }

    assert_eq!(text, "Hello");
    assert_eq!(finish, Some(FinishReason::Stop));
    assert!(done);
}
