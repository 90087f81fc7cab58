//! Bounded worker pool feeding a [`DocumentClient`].
//!
//! Jobs go into a bounded queue and a fixed number of worker tasks pull from it. The
//! number of pending documents is therefore independent of the number of live tasks,
//! and the client's limiter decides when each worker may submit.
//!
//! ```rust
//! use paceline::{DispatchPool, Document, DocumentClient, RateLimiter, RecordingSubmitter};
//! use std::time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let limiter = RateLimiter::new(5, Duration::from_millis(50)).unwrap();
//! let client = DocumentClient::new(limiter, RecordingSubmitter::new());
//! let pool = DispatchPool::spawn(client.clone(), 4, 16);
//!
//! let handle = pool.submit(Document::sample("2026-10-19"), "sig").await.unwrap();
//! assert!(handle.wait().await.unwrap().is_success());
//!
//! pool.shutdown().await;
//! assert_eq!(client.submitter().len(), 1);
//! # });
//! ```

use crate::document::Document;
use crate::error::SubmitError;
use crate::submit::{DocumentClient, DocumentSubmitter, StatusCode};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

type JobResult<E> = Result<StatusCode, SubmitError<E>>;

struct Job<E> {
    document: Document,
    signature: String,
    reply: oneshot::Sender<JobResult<E>>,
}

/// Pending result of a queued job.
#[derive(Debug)]
pub struct JobHandle<E> {
    rx: oneshot::Receiver<JobResult<E>>,
}

impl<E> JobHandle<E> {
    /// Wait for the job to finish.
    ///
    /// Resolves to [`SubmitError::Closed`] if the pool shut down before reaching the job.
    pub async fn wait(self) -> JobResult<E> {
        self.rx.await.unwrap_or(Err(SubmitError::Closed))
    }
}

/// Fixed set of workers submitting queued documents through one client.
pub struct DispatchPool<S: DocumentSubmitter> {
    tx: mpsc::Sender<Job<S::Error>>,
    workers: Vec<JoinHandle<()>>,
}

impl<S: DocumentSubmitter> std::fmt::Debug for DispatchPool<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchPool")
            .field("workers", &self.workers.len())
            .field("queue_capacity", &self.tx.max_capacity())
            .finish()
    }
}

impl<S> DispatchPool<S>
where
    S: DocumentSubmitter + 'static,
{
    /// Start `workers` tasks behind a queue holding up to `queue_depth` jobs.
    ///
    /// Both values are raised to at least 1. Must be called within a tokio runtime.
    pub fn spawn(client: DocumentClient<S>, workers: usize, queue_depth: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Job<S::Error>>(queue_depth.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..workers.max(1))
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let client = client.clone();
                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(job) = next else { break };
                        tracing::trace!(worker, doc_id = %job.document.doc_id, "job picked up");
                        let result = client.create_document(&job.document, &job.signature).await;
                        // The caller may have dropped its handle.
                        let _ = job.reply.send(result);
                    }
                    tracing::debug!(worker, "dispatch worker stopped");
                })
            })
            .collect();

        Self { tx, workers }
    }

    /// Number of worker tasks.
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Queue a document, waiting for queue space if the pool is saturated.
    pub async fn submit(
        &self,
        document: Document,
        signature: impl Into<String>,
    ) -> Result<JobHandle<S::Error>, SubmitError<S::Error>> {
        let (reply, rx) = oneshot::channel();
        let job = Job { document, signature: signature.into(), reply };
        self.tx.send(job).await.map_err(|_| SubmitError::Closed)?;
        Ok(JobHandle { rx })
    }

    /// Stop accepting jobs, let workers drain the queue, and wait for them to exit.
    pub async fn shutdown(self) {
        let Self { tx, workers } = self;
        drop(tx);
        for result in futures::future::join_all(workers).await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "dispatch worker ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RateLimiter, RecordingSubmitter};
    use std::time::Duration;
    use tokio::time::Instant;

    fn client(capacity: usize, window: Duration) -> DocumentClient<RecordingSubmitter> {
        DocumentClient::new(RateLimiter::new(capacity, window).unwrap(), RecordingSubmitter::new())
    }

    #[tokio::test(start_paused = true)]
    async fn pool_respects_limiter() {
        let window = Duration::from_millis(1000);
        let client = client(5, window);
        let pool = DispatchPool::spawn(client.clone(), 8, 32);
        assert_eq!(pool.workers(), 8);
        let start = Instant::now();

        let mut handles = Vec::new();
        for n in 0..12 {
            let doc = Document::sample("2026-10-19").with_doc_id(n.to_string());
            handles.push(pool.submit(doc, format!("Signature {}", n)).await.unwrap());
        }
        for h in handles {
            assert_eq!(h.wait().await.unwrap(), StatusCode::OK);
        }
        pool.shutdown().await;

        let mut offsets: Vec<_> =
            client.submitter().submissions().iter().map(|s| s.at - start).collect();
        offsets.sort();
        assert_eq!(offsets.len(), 12);
        assert!(offsets[..5].iter().all(|d| d.is_zero()));
        assert!(offsets[5..10].iter().all(|d| *d == window));
        assert!(offsets[10..].iter().all(|d| *d == window * 2));
    }

    #[tokio::test]
    async fn submit_after_workers_gone_reports_closed() {
        let pool = DispatchPool::spawn(client(1, Duration::from_millis(10)), 1, 1);
        for worker in &pool.workers {
            worker.abort();
        }
        for worker in pool.workers.iter() {
            while !worker.is_finished() {
                tokio::task::yield_now().await;
            }
        }

        let err = pool.submit(Document::sample("2026-10-19"), "sig").await.unwrap_err();
        assert!(err.is_closed());
    }

    #[tokio::test]
    async fn shutdown_drains_queued_jobs() {
        let client = client(2, Duration::from_millis(5));
        let pool = DispatchPool::spawn(client.clone(), 1, 8);
        let mut handles = Vec::new();
        for n in 0..4 {
            let doc = Document::sample("2026-10-19").with_doc_id(n.to_string());
            handles.push(pool.submit(doc, "sig").await.unwrap());
        }
        pool.shutdown().await;

        assert_eq!(client.submitter().len(), 4);
        for h in handles {
            assert!(h.wait().await.is_ok());
        }
    }
}
