//! Common `nprovider` imports for downstream crates.

pub use crate::{
    BackendId, CancellationToken, ContentPart, ContentType, EventStream, FinishReason,
    ImageContent, ImageDetail, Message, NormalizedResponse, ProviderAdapter, ProviderError,
    ProviderErrorKind, ProviderFuture, RequestOptions, ResolvedConfig, Role, StreamPayload,
    TokenEstimator, ToolCall, ToolSchema, Transport, Usage, WireRequest,
};
pub use ncommon::{BoxFuture, MessageId, SamplingOptions, SessionId};
