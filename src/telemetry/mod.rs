//! Telemetry for rate limiters.
//!
//! A limiter reports admissions, cancellations, timeouts, releases and pool returns as
//! [`LimiterEvent`]s. Events flow through `TelemetrySink` implementations, which are plain
//! `tower::Service<LimiterEvent>`s, so sinks compose with ordinary tower combinators.
//! Each event is emitted on its own task, and a sink that is not ready drops it, so a slow
//! sink never delays admission.
//!
//! ```rust
//! use paceline::telemetry::{LimiterEvent, MemorySink};
//! use paceline::RateLimiter;
//! use std::time::Duration;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let sink = MemorySink::new();
//! let limiter = RateLimiter::builder()
//!     .capacity(2)
//!     .window(Duration::from_millis(100))
//!     .sink(sink.clone())
//!     .build()
//!     .unwrap();
//!
//! let _permit = limiter.acquire().await.unwrap();
//! // Events are delivered off the admission path.
//! tokio::task::yield_now().await;
//! assert!(matches!(sink.events()[0], LimiterEvent::Acquired { available: 1, .. }));
//! # });
//! ```

pub mod events;
pub mod sinks;

pub use events::{event_to_json, LimiterEvent};
pub use sinks::{emit_best_effort, LogSink, MemorySink, NullSink, TelemetrySink};
