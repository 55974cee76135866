//! Provider layer: conversation model, token estimation, backend adapters, and transport.
//!
//! ```rust
//! use nprovider::{BackendId, Message, ProviderAdapter, ResolvedConfig, Role};
//! use nprovider::adapters::openai::OpenAiAdapter;
//!
//! let adapter = OpenAiAdapter::new();
//! let config = ResolvedConfig::new("sk-test", "https://api.openai.com/v1", "gpt-4o-mini");
//! let wire = adapter
//!     .convert_messages(&[Message::text_message(Role::User, "hello")], &config)
//!     .expect("messages should convert");
//!
//! assert_eq!(adapter.backend(), BackendId::OpenAi);
//! assert_eq!(wire[0]["content"][0]["text"], "hello");
//! ```

pub mod adapter;
pub mod adapters;
pub mod config;
pub mod error;
pub mod estimator;
#[cfg(feature = "http")]
pub mod http;
pub mod message;
pub mod normalized;
pub mod prelude;
pub mod request;
pub mod sse;
pub mod transport;

pub use adapter::{BackendId, ProviderAdapter};
pub use config::{ConfigOptions, ContentType, ResolvedConfig};
pub use error::{ProviderError, ProviderErrorKind};
pub use estimator::{
    EstimatorProfile, HeuristicTokenizer, ImagePricing, ProfileEstimator, TokenEstimator, Tokenizer,
};
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use message::{
    ContentPart, FinishReason, ImageContent, ImageDetail, Message, Role, TokenMap, ToolCall,
};
pub use ncommon::{BoxFuture, MessageId, SamplingOptions, SessionId};
pub use normalized::{
    NormalizedChoice, NormalizedMessage, NormalizedResponse, NormalizedStreamChunk, StreamDelta,
    StreamPayload, ToolCallFragment, Usage,
};
pub use request::{RequestOptions, ToolFunction, ToolSchema, WireRequest};
pub use sse::SseDecoder;
pub use transport::{EventStream, ProviderFuture, Transport, VecEventStream};
pub use tokio_util::sync::CancellationToken;
