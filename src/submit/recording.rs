use super::{DocumentSubmitter, StatusCode};
use async_trait::async_trait;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// A payload captured by [`RecordingSubmitter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub payload: Vec<u8>,
    /// When the submitter received the payload.
    pub at: Instant,
}

/// Submitter that keeps every payload in memory.
///
/// Responds with a fixed status after an optional simulated latency, or fails every call
/// with a fixed I/O error kind.
#[derive(Debug, Clone)]
pub struct RecordingSubmitter {
    submissions: Arc<Mutex<Vec<Submission>>>,
    status: StatusCode,
    latency: Duration,
    failure: Option<io::ErrorKind>,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self {
            submissions: Arc::new(Mutex::new(Vec::new())),
            status: StatusCode::OK,
            latency: Duration::ZERO,
            failure: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sleep this long before answering each call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every call with `kind` after recording the payload.
    pub fn failing(mut self, kind: io::ErrorKind) -> Self {
        self.failure = Some(kind);
        self
    }

    fn guard(&self) -> MutexGuard<'_, Vec<Submission>> {
        self.submissions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.guard().clone()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

impl Default for RecordingSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentSubmitter for RecordingSubmitter {
    type Error = io::Error;

    async fn submit(&self, payload: Vec<u8>) -> Result<StatusCode, Self::Error> {
        self.guard().push(Submission { payload, at: Instant::now() });
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.failure {
            Some(kind) => Err(io::Error::new(kind, "simulated submit failure")),
            None => Ok(self.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_payloads_in_order() {
        let submitter = RecordingSubmitter::new().with_status(StatusCode::CREATED);
        assert_eq!(submitter.submit(b"one".to_vec()).await.unwrap(), StatusCode::CREATED);
        assert_eq!(submitter.submit(b"two".to_vec()).await.unwrap(), StatusCode::CREATED);

        let payloads: Vec<_> = submitter.submissions().into_iter().map(|s| s.payload).collect();
        assert_eq!(payloads, vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[tokio::test]
    async fn failing_still_records() {
        let submitter = RecordingSubmitter::new().failing(io::ErrorKind::TimedOut);
        let err = submitter.submit(b"x".to_vec()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert_eq!(submitter.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_applied() {
        let submitter = RecordingSubmitter::new().with_latency(Duration::from_millis(250));
        let start = Instant::now();
        submitter.submit(Vec::new()).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(250));
    }
}
