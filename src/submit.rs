//! Throttled document submission.
//!
//! - [`DocumentSubmitter`]: the outbound collaborator. It receives an already-encoded
//!   payload and reports a status code; transport details live behind it.
//! - [`DocumentClient`]: waits for a limiter permit, then hands the payload to the
//!   submitter. Collaborator errors come back unchanged as [`SubmitError::Inner`].
//! - [`RecordingSubmitter`]: in-memory submitter for tests and demos.
//!
//! [`SubmitError::Inner`]: crate::SubmitError::Inner

use async_trait::async_trait;
use std::fmt;

pub mod client;
pub mod recording;

pub use client::DocumentClient;
pub use recording::{RecordingSubmitter, Submission};

/// Status code reported by the receiving side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const CREATED: StatusCode = StatusCode(201);
    pub const TOO_MANY_REQUESTS: StatusCode = StatusCode(429);

    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// 2xx
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.0)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sends one encoded payload to the external resource.
///
/// Implementations must not retry on their own; retry policy belongs to the caller.
#[async_trait]
pub trait DocumentSubmitter: Send + Sync {
    /// Error type for transport failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Deliver `payload` and report the receiver's status code.
    async fn submit(&self, payload: Vec<u8>) -> Result<StatusCode, Self::Error>;
}

#[async_trait]
impl<T> DocumentSubmitter for std::sync::Arc<T>
where
    T: DocumentSubmitter + ?Sized,
{
    type Error = T::Error;

    async fn submit(&self, payload: Vec<u8>) -> Result<StatusCode, Self::Error> {
        (**self).submit(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        assert!(StatusCode::OK.is_success());
        assert!(StatusCode(299).is_success());
        assert!(!StatusCode::TOO_MANY_REQUESTS.is_success());
        assert!(!StatusCode(199).is_success());
        assert_eq!(StatusCode::CREATED.to_string(), "201");
    }
}
