//! Message store port, merge-on-persist helper, and in-memory implementations.
//!
//! ```rust
//! use nchat::{InMemoryMessageStore, MessageStore, persist};
//! use nprovider::{Message, MessageId, Role};
//!
//! # tokio_test_block_on(async {
//! let store = InMemoryMessageStore::new();
//! persist(&store, Message::text_message(Role::User, "hi").with_id("m1").with_tokens("openai", 2))
//!     .await
//!     .expect("first persist");
//! let merged = persist(&store, Message::text_message(Role::User, "hi").with_id("m1").with_tokens("gemini", 3))
//!     .await
//!     .expect("second persist");
//!
//! assert_eq!(merged.tokens_for("openai"), Some(2));
//! assert_eq!(merged.tokens_for("gemini"), Some(3));
//! assert!(store.get(&MessageId::from("m1")).is_some());
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(future: F) -> F::Output {
//! #     futures_util::FutureExt::now_or_never(future).expect("store futures complete immediately")
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Mutex;

use ncommon::BoxFuture;
use nprovider::{Message, MessageId};

use crate::ChatError;

pub type ChatFuture<'a, T> = BoxFuture<'a, T>;

pub trait MessageStore: Send + Sync {
    fn load<'a>(&'a self, id: &'a MessageId)
    -> ChatFuture<'a, Result<Option<Message>, ChatError>>;

    fn upsert<'a>(&'a self, message: Message) -> ChatFuture<'a, Result<(), ChatError>>;
}

/// Persists `message`, merging its token map over the stored one. Every other
/// field takes the new value. Messages without an id are returned untouched.
pub async fn persist(store: &dyn MessageStore, mut message: Message) -> Result<Message, ChatError> {
    let Some(id) = message.id.clone() else {
        return Ok(message);
    };

    if let Some(current) = store.load(&id).await? {
        let mut tokens = current.tokens;
        tokens.extend(std::mem::take(&mut message.tokens));
        message.tokens = tokens;
    }

    store.upsert(message.clone()).await?;
    Ok(message)
}

#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: Mutex<HashMap<MessageId, Message>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        let store = Self::new();
        if let Ok(mut stored) = store.messages.lock() {
            for message in messages {
                if let Some(id) = message.id.clone() {
                    stored.insert(id, message);
                }
            }
        }
        store
    }

    pub fn get(&self, id: &MessageId) -> Option<Message> {
        self.messages.lock().ok()?.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map(|messages| messages.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MessageStore for InMemoryMessageStore {
    fn load<'a>(
        &'a self,
        id: &'a MessageId,
    ) -> ChatFuture<'a, Result<Option<Message>, ChatError>> {
        Box::pin(async move {
            let messages = self
                .messages
                .lock()
                .map_err(|_| ChatError::store("message store lock poisoned"))?;

            Ok(messages.get(id).cloned())
        })
    }

    fn upsert<'a>(&'a self, message: Message) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let Some(id) = message.id.clone() else {
                return Err(ChatError::store("cannot store a message without an id"));
            };

            let mut messages = self
                .messages
                .lock()
                .map_err(|_| ChatError::store("message store lock poisoned"))?;

            messages.insert(id, message);
            Ok(())
        })
    }
}

/// Store used when the caller supplies none: loads find nothing and writes are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMessageStore;

impl MessageStore for NullMessageStore {
    fn load<'a>(
        &'a self,
        _id: &'a MessageId,
    ) -> ChatFuture<'a, Result<Option<Message>, ChatError>> {
        Box::pin(async { Ok(None) })
    }

    fn upsert<'a>(&'a self, _message: Message) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use nprovider::Role;

    use super::*;

    #[tokio::test]
    async fn persist_replaces_fields_but_merges_tokens() {
        let store = InMemoryMessageStore::new();
        persist(
            &store,
            Message::text_message(Role::Assistant, "draft")
                .with_id("a1")
                .with_tokens("openai", 10)
                .with_tokens("gemini", 8),
        )
        .await
        .expect("persist draft");

        let updated = persist(
            &store,
            Message::text_message(Role::Assistant, "final")
                .with_id("a1")
                .with_tokens("openai", 12),
        )
        .await
        .expect("persist final");

        assert_eq!(updated.text(), "final");
        assert_eq!(updated.tokens_for("openai"), Some(12));
        assert_eq!(updated.tokens_for("gemini"), Some(8));
        assert_eq!(store.get(&MessageId::from("a1")), Some(updated));
    }

    #[tokio::test]
    async fn persist_skips_messages_without_id() {
        let store = InMemoryMessageStore::new();
        let transient = Message::new(Role::User, None);

        let returned = persist(&store, transient.clone()).await.expect("persist");

        assert_eq!(returned, transient);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn null_store_discards_writes() {
        let store = NullMessageStore;
        persist(&store, Message::text_message(Role::User, "hi").with_id("u1"))
            .await
            .expect("persist");

        assert_eq!(store.load(&MessageId::from("u1")).await.expect("load"), None);
    }
}
