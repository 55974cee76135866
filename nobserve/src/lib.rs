//! Production observers for chat engine turns.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use nchat::TurnObserver;
//! use nobserve::{MetricsTurnObserver, SafeTurnObserver, TracingTurnObserver};
//!
//! let _tracing: Arc<dyn TurnObserver> = Arc::new(SafeTurnObserver::new(TracingTurnObserver));
//! let _metrics = MetricsTurnObserver;
//! ```

mod fanout;
mod metrics_observer;
mod safe_observer;
mod tracing_observer;

pub use fanout::FanoutTurnObserver;
pub use metrics_observer::MetricsTurnObserver;
pub use safe_observer::SafeTurnObserver;
pub use tracing_observer::TracingTurnObserver;

pub mod prelude {
    pub use crate::{
        FanoutTurnObserver, MetricsTurnObserver, SafeTurnObserver, TracingTurnObserver,
    };
}
