use super::{DocumentSubmitter, StatusCode};
use crate::document::Document;
use crate::error::SubmitError;
use crate::rate_limit::{Permit, RateLimiter};
use std::sync::Arc;
use std::time::Duration;

/// Submits documents through a shared [`RateLimiter`].
///
/// Clones share both the limiter and the submitter.
pub struct DocumentClient<S> {
    limiter: RateLimiter,
    submitter: Arc<S>,
}

impl<S> Clone for DocumentClient<S> {
    fn clone(&self) -> Self {
        Self { limiter: self.limiter.clone(), submitter: Arc::clone(&self.submitter) }
    }
}

impl<S> std::fmt::Debug for DocumentClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentClient")
            .field("limiter", &self.limiter)
            .field("submitter", &"<submitter>")
            .finish()
    }
}

impl<S> DocumentClient<S>
where
    S: DocumentSubmitter,
{
    pub fn new(limiter: RateLimiter, submitter: S) -> Self {
        Self { limiter, submitter: Arc::new(submitter) }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn submitter(&self) -> &S {
        &self.submitter
    }

    /// Encode `document`, wait for admission, and submit it.
    ///
    /// Encoding happens before admission so a malformed document never spends a permit.
    pub async fn create_document(
        &self,
        document: &Document,
        signature: &str,
    ) -> Result<StatusCode, SubmitError<S::Error>> {
        let payload = document.to_json().map_err(SubmitError::Encode)?;
        let permit = self.limiter.acquire().await?;
        self.send(permit, payload, document, signature).await
    }

    /// Like [`create_document`](Self::create_document), giving up with
    /// [`RateLimitError::Timeout`](crate::RateLimitError::Timeout) if no permit frees up
    /// within `timeout`.
    pub async fn create_document_timeout(
        &self,
        document: &Document,
        signature: &str,
        timeout: Duration,
    ) -> Result<StatusCode, SubmitError<S::Error>> {
        let payload = document.to_json().map_err(SubmitError::Encode)?;
        let permit = self.limiter.acquire_timeout(timeout).await?;
        self.send(permit, payload, document, signature).await
    }

    async fn send(
        &self,
        mut permit: Permit,
        payload: Vec<u8>,
        document: &Document,
        signature: &str,
    ) -> Result<StatusCode, SubmitError<S::Error>> {
        let result = self.submitter.submit(payload).await;
        permit.release();

        match result {
            Ok(status) => {
                tracing::info!(
                    doc_id = %document.doc_id,
                    signature,
                    permit = permit.id(),
                    %status,
                    "document submitted"
                );
                Ok(status)
            }
            Err(e) => {
                tracing::warn!(doc_id = %document.doc_id, signature, error = %e, "document submit failed");
                Err(SubmitError::Inner(e))
            }
        }
    }
}
