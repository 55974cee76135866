//! Common imports for most nexus applications.

pub use crate::{
    BackendId, CancellationToken, ChatCallbacks, ChatEngine, ChatError, ChatErrorKind, ChatFuture,
    ContentPart, FinishReason, InMemoryMessageStore, Message, MessageId, MessageStore,
    RequestOptions, ResolvedConfig, RetryPolicy, Role, SamplingOptions, SendOptions, SessionId,
    ToolInvocation, ToolOutcome, ToolSchema, TransportConfig, TurnObserver, Usage,
};
pub use crate::{build_adapter, build_engine, image, parse_backend_id, text, tool, user_message};
pub use crate::{nx_contents, nx_text};
