//! Focused unit tests for OpenAI adapter internals.

#![cfg(test)]

use serde_json::json;

use crate::adapter::ProviderAdapter;
use crate::config::{ContentType, ResolvedConfig};
use crate::error::ProviderErrorKind;
use crate::message::{ContentPart, FinishReason, ImageContent, ImageDetail, Message, Role, ToolCall};
use crate::normalized::StreamPayload;
use crate::request::{RequestOptions, ToolSchema};
use ncommon::SamplingOptions;

use super::OpenAiAdapter;

fn config() -> ResolvedConfig {
    ResolvedConfig::new("sk-test", "https://api.openai.com/v1", "gpt-4o-mini")
}

#[test]
fn build_request_applies_sampling_defaults_and_optional_fields() {
    let adapter = OpenAiAdapter::new();
    let options = RequestOptions::default()
        .with_sampling(SamplingOptions::default().with_temperature(0.0).with_top_k(5))
        .with_tools(vec![ToolSchema::function("lookup", "find", json!({"type": "object"}))])
        .with_tool_choice(json!("auto"));
    let request = adapter
        .build_request(Vec::new(), None, &options, &config().with_org("org-9"), false)
        .expect("request should build");

    assert_eq!(request.body["temperature"], json!(0.8f32));
    assert_eq!(request.body["top_p"], json!(1.0f32));
    assert_eq!(request.body["presence_penalty"], json!(1.0f32));
    assert_eq!(request.body["top_k"], 5);
    assert_eq!(request.body["tool_choice"], "auto");
    assert_eq!(request.body["tools"][0]["function"]["name"], "lookup");
    assert_eq!(request.body["messages"], json!([]));
    assert_eq!(request.header("Authorization"), Some("Bearer sk-test"));
    assert_eq!(request.header("OpenAI-Organization"), Some("org-9"));
}

#[test]
fn convert_messages_sends_images_as_text_unless_enabled() {
    let adapter = OpenAiAdapter::new();
    let message = Message::new(
        Role::User,
        Some(vec![
            ContentPart::text("look"),
            ContentPart::image(
                ImageContent::new("https://img.test/cat.png", 100, 100).with_detail(ImageDetail::Low),
            ),
        ]),
    );

    let plain = adapter
        .convert_messages(std::slice::from_ref(&message), &config())
        .expect("messages should convert");
    assert_eq!(
        plain[0]["content"][1],
        json!({"type": "text", "text": "https://img.test/cat.png"})
    );

    let vision = config().with_content_types(vec![ContentType::Text, ContentType::Image]);
    let rich = adapter
        .convert_messages(&[message], &vision)
        .expect("messages should convert");
    assert_eq!(
        rich[0]["content"][1],
        json!({"type": "image_url", "image_url": {"url": "https://img.test/cat.png", "detail": "low"}})
    );
}

#[test]
fn convert_messages_carries_tool_calls_and_results() {
    let adapter = OpenAiAdapter::new();
    let assistant = Message::text_message(Role::Assistant, "")
        .with_tool_calls(vec![ToolCall::new("call_1", "lookup", json!({"id": 1}))]);
    let tool = Message::text_message(Role::Tool, "found").with_tool_call_id("call_1");

    let wire = adapter
        .convert_messages(&[assistant, tool], &config())
        .expect("messages should convert");

    assert_eq!(wire[0]["tool_calls"][0]["type"], "function");
    assert_eq!(wire[0]["tool_calls"][0]["function"]["arguments"], "{\"id\":1}");
    assert_eq!(wire[1]["role"], "tool");
    assert_eq!(wire[1]["tool_call_id"], "call_1");
}

#[test]
fn parse_stream_chunk_handles_sentinel_fragments_and_usage() {
    let adapter = OpenAiAdapter::new();
    assert_eq!(
        adapter.parse_stream_chunk("[DONE]").expect("sentinel parses"),
        StreamPayload::Done
    );

    let payload = json!({
        "choices": [{
            "index": 0,
            "delta": {"content": "", "tool_calls": [
                {"index": 1, "id": "call_2", "function": {"name": "lookup", "arguments": "{\"a\""}},
                {"index": 1}
            ]},
            "finish_reason": null
        }],
        "usage": {"prompt_tokens": 4, "completion_tokens": 2, "total_tokens": 6}
    });
    let StreamPayload::Delta(delta) = adapter
        .parse_stream_chunk(&payload.to_string())
        .expect("chunk parses")
    else {
        panic!("expected a delta");
    };

    let chunk = &delta.choices[0];
    assert_eq!(chunk.text_delta, None);
    assert_eq!(chunk.tool_call_fragments.len(), 1);
    assert_eq!(chunk.tool_call_fragments[0].index, Some(1));
    assert_eq!(chunk.tool_call_fragments[0].arguments.as_deref(), Some("{\"a\""));
    assert_eq!(delta.usage.map(|usage| usage.total_tokens), Some(6));
}

#[test]
fn parse_stream_chunk_surfaces_error_objects() {
    let adapter = OpenAiAdapter::new();
    let error = adapter
        .parse_stream_chunk(r#"{"error":{"message":"overloaded","type":"server_error","code":503}}"#)
        .expect_err("error object must fail");

    assert_eq!(error.kind, ProviderErrorKind::Protocol);
    assert_eq!(error.status_code, Some(503));
    assert_eq!(error.status_text.as_deref(), Some("server_error"));

    let malformed = adapter
        .parse_stream_chunk("{not json")
        .expect_err("malformed chunk must fail");
    assert_eq!(malformed.kind, ProviderErrorKind::MalformedChunk);
}

#[test]
fn parse_final_response_rejects_empty_choices() {
    let adapter = OpenAiAdapter::new();
    let error = adapter
        .parse_final_response(r#"{"choices":[],"detail":{"message":"quota exceeded"}}"#)
        .expect_err("zero choices must fail");

    assert_eq!(error.kind, ProviderErrorKind::Protocol);
    assert!(error.message.contains("quota exceeded"));
}

#[test]
fn parse_final_response_collects_tool_calls_across_choices() {
    let adapter = OpenAiAdapter::new();
    let body = json!({
        "model": "gpt-4o-mini",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": null, "tool_calls": [
                {"id": "call_1", "type": "function", "function": {"name": "a", "arguments": "{}"}}
            ]}, "finish_reason": "tool_calls"},
            {"index": 1, "message": {"role": "assistant", "tool_calls": [
                {"id": "call_2", "type": "function", "function": {"name": "b", "arguments": "{}"}}
            ]}, "finish_reason": "tool_calls"}
        ]
    });

    let response = adapter
        .parse_final_response(&body.to_string())
        .expect("response parses");

    assert_eq!(response.text(), "");
    assert_eq!(response.finish_reason(), Some(FinishReason::ToolCalls));
    let ids = response
        .tool_calls()
        .into_iter()
        .map(|call| call.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["call_1", "call_2"]);
}

#[test]
fn parallel_wrapper_tool_is_dropped() {
    let adapter = OpenAiAdapter::new();
    assert!(!adapter.keeps_tool_call(&ToolCall::new("c", "multi_tool_use.parallel", json!({}))));
    assert!(adapter.keeps_tool_call(&ToolCall::new("c", "lookup", json!({}))));
}

#[test]
fn explicit_null_fields_read_as_empty() {
    let adapter = OpenAiAdapter::new();

    let StreamPayload::Delta(delta) = adapter
        .parse_stream_chunk(r#"{"choices":[{"index":0,"delta":{"content":"hi","tool_calls":null}}]}"#)
        .expect("null tool calls parse")
    else {
        panic!("expected a delta");
    };
    assert_eq!(delta.choices[0].text_delta.as_deref(), Some("hi"));
    assert!(delta.choices[0].tool_call_fragments.is_empty());

    let StreamPayload::Delta(trailer) = adapter
        .parse_stream_chunk(r#"{"choices":null,"usage":{"prompt_tokens":3,"completion_tokens":1,"total_tokens":4}}"#)
        .expect("null choices parse")
    else {
        panic!("expected a delta");
    };
    assert!(trailer.choices.is_empty());
    assert_eq!(trailer.usage.map(|usage| usage.total_tokens), Some(4));

    let response = adapter
        .parse_final_response(
            r#"{"choices":[{"index":null,"message":{"role":"assistant","content":"hi","tool_calls":null},"finish_reason":"stop"}]}"#,
        )
        .expect("null tool calls parse");
    assert_eq!(response.text(), "hi");
    assert!(response.tool_calls().is_empty());
}

#[test]
fn stream_completion_requires_sentinel() {
    assert!(OpenAiAdapter::new().ends_with_sentinel());
}
