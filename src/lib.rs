#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # paceline
//!
//! Fair, sliding-window admission control for async Rust.
//!
//! ## Features
//!
//! - **Rate limiter** admitting at most `capacity` operations per `window`
//! - **FIFO fairness**: queued callers are admitted strictly in arrival order
//! - **Sliding window**: each permit returns to the pool one window after it was granted,
//!   independent of how long the guarded work takes
//! - **Deadlines and cancellation** that never leak a permit
//! - **Tower middleware** and **telemetry sinks** built on `tower::Service`
//! - **Throttled document client** and a bounded worker pool on top of the limiter
//!
//! ## Quick Start
//!
//! ```rust
//! use paceline::{RateLimiter, RateLimitError};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), RateLimitError> {
//!     // At most five admissions in any one-second interval.
//!     let limiter = RateLimiter::new(5, Duration::from_secs(1))?;
//!
//!     let mut permit = limiter.acquire_timeout(Duration::from_secs(2)).await?;
//!     // Call the throttled resource here.
//!     permit.release();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod prelude;
pub mod rate_limit;
pub mod submit;
pub mod telemetry;

// Re-exports
pub use config::{RateLimiterConfig, ReleaseMode};
pub use dispatch::{DispatchPool, JobHandle};
pub use document::{Description, Document, Product};
pub use error::{ConfigError, RateLimitError, SubmitError};
pub use rate_limit::{Permit, RateLimitLayer, RateLimitService, RateLimiter, RateLimiterBuilder};
pub use submit::{DocumentClient, DocumentSubmitter, RecordingSubmitter, StatusCode, Submission};
