//! Conversation orchestration over a provider adapter: context windows, stream
//! reassembly, tool-call rounds, and the retry shell.

mod callbacks;
mod context;
mod engine;
mod error;
mod observer;
mod reassembler;
mod retry;
mod store;

pub mod prelude {
    pub use crate::{
        ChatCallbacks, ChatEngine, ChatError, ChatErrorKind, ChatFuture, ContextBuilder,
        ContextWindow, InMemoryMessageStore, MessageStore, NoopTurnObserver, NullMessageStore,
        RetryContinuation, RetryPolicy, SendOptions, ToolInvocation, ToolOutcome, TurnObserver,
    };
    pub use nprovider::{
        BackendId, CancellationToken, ContentPart, Message, MessageId, RequestOptions,
        ResolvedConfig, Role, SessionId, ToolSchema, Usage,
    };
}

pub use callbacks::{ChatCallbacks, ToolInvocation, ToolOutcome};
pub use context::{
    ContextBuilder, ContextParams, ContextWindow, INSUFFICIENT_TOKENS_NOTICE,
    demote_orphaned_tool_results,
};
pub use engine::{ChatEngine, SendOptions, TOOL_PLACEHOLDER_TEXT};
pub use error::{BudgetOverflow, ChatError, ChatErrorKind};
pub use observer::{NoopTurnObserver, TurnObserver};
pub use reassembler::{ReassembledTurn, StreamReassembler};
pub use retry::{RetryContinuation, RetryPolicy};
pub use store::{ChatFuture, InMemoryMessageStore, MessageStore, NullMessageStore, persist};
