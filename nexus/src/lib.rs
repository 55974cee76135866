//! Unified facade over the nexus workspace crates.
//!
//! Most applications depend on this crate alone. It re-exports the workspace
//! crates and adds constructors, content helpers, and macros for the common
//! setup path.

mod macros;

pub mod engine;
pub mod prelude;
pub mod util;

pub use nchat;
pub use ncommon;
pub use nobserve;
pub use nprovider;

pub use nchat::{
    BudgetOverflow, ChatCallbacks, ChatEngine, ChatError, ChatErrorKind, ChatFuture,
    ContextBuilder, ContextParams, ContextWindow, InMemoryMessageStore, MessageStore,
    NoopTurnObserver, NullMessageStore, ReassembledTurn, RetryContinuation, RetryPolicy,
    SendOptions, StreamReassembler, ToolInvocation, ToolOutcome, TurnObserver, persist,
};
pub use ncommon::{BoxFuture, MessageId, SamplingOptions, SessionId, now_millis};
pub use nobserve::{FanoutTurnObserver, MetricsTurnObserver, SafeTurnObserver, TracingTurnObserver};
pub use nprovider::{
    BackendId, CancellationToken, ConfigOptions, ContentPart, ContentType, EstimatorProfile,
    FinishReason, HttpTransport, ImageContent, ImageDetail, Message, ProviderAdapter,
    ProviderError, ProviderErrorKind, RequestOptions, ResolvedConfig, Role, TokenEstimator,
    ToolCall, ToolSchema, Transport, Usage,
};

pub use engine::{TransportConfig, build_adapter, build_adapter_with_profile, build_engine};
pub use util::{image, parse_backend_id, text, tool, user_message};
