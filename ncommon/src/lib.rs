//! Shared primitives and strongly-typed identifiers for workspace crates.
//!
//! ```rust
//! use ncommon::{MessageId, SamplingOptions, SessionId};
//!
//! let session = SessionId::from("session-1");
//! let message = MessageId::new("msg-1");
//! let options = SamplingOptions::default().with_temperature(0.3).with_top_k(40);
//!
//! assert_eq!(session.as_str(), "session-1");
//! assert_eq!(message.to_string(), "msg-1");
//! assert_eq!(options.top_k, Some(40));
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use ncommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Identifier newtypes shared across crates.

    use std::fmt::{Display, Formatter};

    macro_rules! string_id {
        ($name:ident) => {
            #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
            #[cfg_attr(
                feature = "serde",
                derive(serde::Serialize, serde::Deserialize),
                serde(transparent)
            )]
            pub struct $name(String);

            impl $name {
                pub fn new(value: impl Into<String>) -> Self {
                    Self(value.into())
                }

                pub fn as_str(&self) -> &str {
                    self.0.as_str()
                }

                pub fn into_inner(self) -> String {
                    self.0
                }
            }

            impl Display for $name {
                fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<String> for $name {
                fn from(value: String) -> Self {
                    Self(value)
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }
        };
    }

    string_id!(SessionId);
    string_id!(MessageId);
}

pub mod model {
    //! Sampling parameters shared by request types.
    //!
    //! ```rust
    //! use ncommon::SamplingOptions;
    //!
    //! let options = SamplingOptions::default()
    //!     .with_temperature(0.2)
    //!     .with_top_p(0.9);
    //!
    //! assert_eq!(options.temperature_or(0.8), 0.2);
    //! assert_eq!(options.presence_penalty_or(1.0), 1.0);
    //! ```

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct SamplingOptions {
        pub temperature: Option<f32>,
        pub top_p: Option<f32>,
        pub top_k: Option<u32>,
        pub presence_penalty: Option<f32>,
    }

    impl SamplingOptions {
        pub fn with_temperature(mut self, temperature: f32) -> Self {
            self.temperature = Some(temperature);
            self
        }

        pub fn with_top_p(mut self, top_p: f32) -> Self {
            self.top_p = Some(top_p);
            self
        }

        pub fn with_top_k(mut self, top_k: u32) -> Self {
            self.top_k = Some(top_k);
            self
        }

        pub fn with_presence_penalty(mut self, presence_penalty: f32) -> Self {
            self.presence_penalty = Some(presence_penalty);
            self
        }

        /// Zero counts as unset, so a caller passing `0.0` gets the backend default.
        pub fn temperature_or(&self, default: f32) -> f32 {
            non_zero(self.temperature).unwrap_or(default)
        }

        pub fn top_p_or(&self, default: f32) -> f32 {
            non_zero(self.top_p).unwrap_or(default)
        }

        pub fn presence_penalty_or(&self, default: f32) -> f32 {
            non_zero(self.presence_penalty).unwrap_or(default)
        }
    }

    fn non_zero(value: Option<f32>) -> Option<f32> {
        value.filter(|value| *value != 0.0)
    }
}

pub mod clock {
    //! Wall clock in epoch milliseconds.

    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default()
    }
}

pub use clock::now_millis;
pub use context::{MessageId, SessionId};
pub use future::BoxFuture;
pub use model::SamplingOptions;
