use nchat::{
    ChatErrorKind, ContextBuilder, ContextParams, ContextWindow, INSUFFICIENT_TOKENS_NOTICE,
    InMemoryMessageStore,
};
use nprovider::adapters::openai::OpenAiAdapter;
use nprovider::{Message, MessageId, ResolvedConfig, Role, ToolCall};
use serde_json::json;

const NOW: u64 = 1_000_000;

/// Forty characters, ten tokens under the default OpenAI profile.
fn ten_tokens(tag: char) -> String {
    tag.to_string().repeat(40)
}

fn chain(specs: &[(&str, Role, String)]) -> Vec<Message> {
    let mut parent: Option<&str> = None;
    specs
        .iter()
        .map(|(id, role, text)| {
            let mut message = Message::text_message(*role, text.clone()).with_id(*id);
            if let Some(parent) = parent {
                message = message.with_parent(parent);
            }
            parent = Some(*id);
            message
        })
        .collect()
}

async fn build(
    store: &InMemoryMessageStore,
    leaf: &Message,
    config: &ResolvedConfig,
) -> Result<ContextWindow, nchat::ChatError> {
    let adapter = OpenAiAdapter::new();
    ContextBuilder::new(&adapter, store)
        .build(
            leaf,
            ContextParams {
                system_message: None,
                tools: &[],
                config,
                now_millis: NOW,
            },
        )
        .await
}

fn config() -> ResolvedConfig {
    ResolvedConfig::new("sk-test", "https://backend.test/v1", "gpt-4o-mini")
}

fn texts(window: &ContextWindow) -> Vec<String> {
    window.messages.iter().map(Message::text).collect()
}

#[tokio::test]
async fn walk_keeps_at_most_max_count_user_turns() {
    let mut messages = chain(&[
        ("u1", Role::User, "first".into()),
        ("a1", Role::Assistant, "one".into()),
        ("u2", Role::User, "second".into()),
        ("a2", Role::Assistant, "two".into()),
    ]);
    let leaf = Message::text_message(Role::User, "third").with_id("u3").with_parent("a2");
    messages.push(leaf.clone());
    let store = InMemoryMessageStore::with_messages(messages);

    let window = build(&store, &leaf, &config().with_max_count(2))
        .await
        .expect("context should build");

    assert_eq!(texts(&window), vec!["one", "second", "two", "third"]);
    let users = window
        .messages
        .iter()
        .filter(|message| message.role == Role::User)
        .count();
    assert_eq!(users, 2);
}

#[tokio::test]
async fn walk_skips_ancestors_older_than_max_time() {
    let store = InMemoryMessageStore::with_messages(vec![
        Message::text_message(Role::User, "stale")
            .with_id("old")
            .with_created_time(NOW - 5_000),
        Message::text_message(Role::Assistant, "fresh")
            .with_id("recent")
            .with_parent("old")
            .with_created_time(NOW - 500),
    ]);
    let leaf = Message::text_message(Role::User, "now")
        .with_id("leaf")
        .with_parent("recent")
        .with_created_time(NOW);

    let window = build(&store, &leaf, &config().with_max_time(1_000))
        .await
        .expect("context should build");

    assert_eq!(texts(&window), vec!["fresh", "now"]);
}

#[tokio::test]
async fn total_tokens_never_exceed_the_input_budget() {
    let specs = (0..10)
        .map(|index| {
            let role = if index % 2 == 0 { Role::User } else { Role::Assistant };
            (format!("m{index}"), role, ten_tokens('a'))
        })
        .collect::<Vec<_>>();
    let borrowed = specs
        .iter()
        .map(|(id, role, text)| (id.as_str(), *role, text.clone()))
        .collect::<Vec<_>>();
    let store = InMemoryMessageStore::with_messages(chain(&borrowed));
    let leaf = Message::text_message(Role::User, ten_tokens('b')).with_parent("m9");
    let config = config().with_limits(100, 50);

    let window = build(&store, &leaf, &config)
        .await
        .expect("context should build");

    assert!(i64::from(window.total_tokens) <= config.input_budget());
    assert_eq!(window.total_tokens, 50);
    assert_eq!(window.messages.len(), 5);
    assert_eq!(window.wire_messages.len(), 5);
    assert_eq!(window.messages[0].id, Some(MessageId::from("m6")));
}

#[tokio::test]
async fn oversized_leaf_reports_component_costs() {
    let store = InMemoryMessageStore::new();
    let leaf = Message::text_message(Role::User, "x".repeat(400)).with_id("big");

    let error = build(&store, &leaf, &config().with_limits(100, 50))
        .await
        .expect_err("leaf should not fit");

    assert_eq!(error.kind, ChatErrorKind::Budget);
    let overflow = error.budget.expect("overflow details");
    assert_eq!(overflow.message_tokens, 100);
    assert_eq!(overflow.system_tokens, 0);
    assert_eq!(overflow.budget, 50);
}

#[tokio::test]
async fn oversized_tool_result_is_replaced_and_orphan_is_demoted() {
    let store = InMemoryMessageStore::with_messages(vec![
        Message::text_message(Role::User, "hi").with_id("u1"),
        Message::text_message(Role::Assistant, "z".repeat(200))
            .with_id("a1")
            .with_parent("u1")
            .with_tool_calls(vec![ToolCall::new("call_1", "lookup", json!({}))]),
        Message::text_message(Role::Tool, "r".repeat(400))
            .with_id("t1")
            .with_parent("a1")
            .with_name("lookup")
            .with_tool_call_id("call_1"),
    ]);
    let leaf = Message::text_message(Role::User, ten_tokens('q')).with_parent("t1");

    let window = build(&store, &leaf, &config().with_limits(100, 50))
        .await
        .expect("context should build");

    assert_eq!(window.messages.len(), 2);
    let notice = &window.messages[0];
    assert_eq!(notice.text(), INSUFFICIENT_TOKENS_NOTICE);
    assert_eq!(notice.role, Role::Assistant);
    assert_eq!(notice.tool_call_id, None);
    assert!(i64::from(window.total_tokens) <= 50);

    let stored = store.get(&MessageId::from("t1")).expect("tool message");
    assert_eq!(stored.text(), "r".repeat(400));
    assert_eq!(stored.tokens_for("openai"), Some(100));
}

#[tokio::test]
async fn missing_ancestor_costs_are_persisted() {
    let store = InMemoryMessageStore::with_messages(vec![
        Message::text_message(Role::Assistant, ten_tokens('c')).with_id("a1"),
    ]);
    let leaf = Message::text_message(Role::User, "next").with_parent("a1");

    build(&store, &leaf, &config())
        .await
        .expect("context should build");

    let stored = store.get(&MessageId::from("a1")).expect("ancestor");
    assert_eq!(stored.tokens_for("openai"), Some(10));
}

#[tokio::test]
async fn continuation_leaf_sends_only_its_ancestors() {
    let store = InMemoryMessageStore::with_messages(chain(&[
        ("u1", Role::User, "question".into()),
        ("a1", Role::Assistant, "partial answer".into()),
    ]));
    let leaf = Message::new(Role::User, None).with_parent("a1");

    let window = build(&store, &leaf, &config())
        .await
        .expect("context should build");

    assert_eq!(texts(&window), vec!["question", "partial answer"]);
    assert_eq!(window.wire_messages[1]["role"], "assistant");
}
