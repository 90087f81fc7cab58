//! Error types for admission control and throttled submission
use std::fmt;
use std::time::Duration;

/// Largest capacity a limiter accepts; bounded by the underlying semaphore.
pub const MAX_CAPACITY: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Rejected limiter parameters.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Capacity must admit at least one operation per window.
    #[error("capacity must be > 0")]
    ZeroCapacity,
    /// Window must be a positive duration.
    #[error("window must be > 0")]
    ZeroWindow,
    /// Capacity exceeds what the permit pool can represent.
    #[error("capacity {requested} exceeds the maximum of {max}")]
    CapacityTooLarge { requested: usize, max: usize },
}

/// Failures of the admission operation itself.
///
/// The limiter never fails because of contention; waiting callers are only delayed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    /// The limiter was constructed with invalid parameters.
    #[error("invalid rate limiter config: {0}")]
    InvalidConfig(#[from] ConfigError),
    /// The caller abandoned the wait before a permit became available.
    #[error("acquire cancelled while waiting for a permit")]
    Cancelled,
    /// The caller's deadline passed before a permit became available.
    #[error("no permit within {limit:?} (waited {waited:?})")]
    Timeout { waited: Duration, limit: Duration },
    /// Admission was attempted outside a tokio runtime, so the permit's return could not
    /// be scheduled. No permit was taken.
    #[error("no tokio runtime to schedule the permit's return")]
    NoRuntime,
}

impl RateLimitError {
    /// Check if this error is a construction-time configuration failure
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, Self::InvalidConfig(_))
    }
    /// Check if the wait was cancelled by the caller
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
    /// Check if the wait ran past its deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
    /// Check if admission was refused for lack of a runtime
    pub fn is_no_runtime(&self) -> bool {
        matches!(self, Self::NoRuntime)
    }
    /// Access timeout details as (waited, limit).
    pub fn timeout_details(&self) -> Option<(Duration, Duration)> {
        match self {
            Self::Timeout { waited, limit } => Some((*waited, *limit)),
            _ => None,
        }
    }
}

/// Error returned by throttled calls: either admission failed, the payload could not be
/// encoded, or the downstream collaborator failed.
#[derive(Debug)]
pub enum SubmitError<E> {
    /// The limiter did not admit the call
    Limit(RateLimitError),
    /// The payload could not be serialized
    Encode(serde_json::Error),
    /// The dispatch pool shut down before the job completed
    Closed,
    /// The downstream operation failed; carried unchanged
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for SubmitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit(e) => write!(f, "rate limiter: {}", e),
            Self::Encode(e) => write!(f, "failed to encode payload: {}", e),
            Self::Closed => write!(f, "dispatch pool closed before the job completed"),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for SubmitError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Limit(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Inner(e) => Some(e),
            Self::Closed => None,
        }
    }
}

impl<E> From<RateLimitError> for SubmitError<E> {
    fn from(err: RateLimitError) -> Self {
        Self::Limit(err)
    }
}

impl<E> SubmitError<E> {
    /// Check if the limiter refused admission (cancelled or timed out)
    pub fn is_limited(&self) -> bool {
        matches!(self, Self::Limit(_))
    }
    /// Check if this error wraps a downstream error.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }
    /// Check if the dispatch pool went away before answering
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
    /// Get the inner error if this is an Inner variant
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
    /// Borrow the inner error if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
    /// Borrow the limiter error if present.
    pub fn as_limit(&self) -> Option<&RateLimitError> {
        match self {
            Self::Limit(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn config_error_display() {
        assert_eq!(ConfigError::ZeroCapacity.to_string(), "capacity must be > 0");
        let msg = ConfigError::CapacityTooLarge { requested: 7, max: 5 }.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('5'));
    }

    #[test]
    fn invalid_config_wraps_config_error() {
        let err: RateLimitError = ConfigError::ZeroWindow.into();
        assert!(err.is_invalid_config());
        assert!(err.to_string().contains("window must be > 0"));
        assert!(err.source().is_some());
    }

    #[test]
    fn timeout_display_and_details() {
        let err = RateLimitError::Timeout {
            waited: Duration::from_millis(250),
            limit: Duration::from_millis(250),
        };
        assert!(err.is_timeout());
        assert!(!err.is_cancelled());
        assert!(err.to_string().contains("250ms"));
        assert_eq!(
            err.timeout_details(),
            Some((Duration::from_millis(250), Duration::from_millis(250)))
        );
        assert!(RateLimitError::Cancelled.timeout_details().is_none());
    }

    #[test]
    fn inner_error_is_surfaced_unchanged() {
        let err: SubmitError<io::Error> =
            SubmitError::Inner(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(err.is_inner());
        assert_eq!(err.to_string(), "refused");
        assert_eq!(err.source().map(|s| s.to_string()), Some("refused".to_string()));
        let inner = err.into_inner().expect("inner");
        assert_eq!(inner.kind(), io::ErrorKind::ConnectionRefused);
    }

    #[test]
    fn limit_error_converts_and_exposes_source() {
        let err: SubmitError<io::Error> = RateLimitError::Cancelled.into();
        assert!(err.is_limited());
        assert_eq!(err.as_limit(), Some(&RateLimitError::Cancelled));
        assert!(err.as_inner().is_none());
        assert!(err.to_string().starts_with("rate limiter:"));
    }

    #[test]
    fn closed_has_no_source() {
        let err: SubmitError<io::Error> = SubmitError::Closed;
        assert!(err.is_closed());
        assert!(err.source().is_none());
    }
}
