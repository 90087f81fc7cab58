//! Convenient re-exports for common paceline types.
pub use crate::{
    config::{RateLimiterConfig, ReleaseMode},
    error::{ConfigError, RateLimitError, SubmitError},
    rate_limit::{Permit, RateLimitLayer, RateLimiter},
    submit::{DocumentClient, DocumentSubmitter, StatusCode},
    telemetry::{LimiterEvent, LogSink, MemorySink, NullSink, TelemetrySink},
};
