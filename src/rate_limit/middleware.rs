use crate::error::{RateLimitError, SubmitError};
use crate::rate_limit::{Permit, RateLimiter};
use futures::future::BoxFuture;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// A layer that gates every request on a [`RateLimiter`] permit.
#[derive(Clone, Debug)]
pub struct RateLimitLayer {
    limiter: RateLimiter,
}

impl RateLimitLayer {
    /// Create a new rate limit layer sharing `limiter`'s quota.
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService::new(service, self.limiter.clone())
    }
}

/// Middleware service that waits for admission before calling the inner service.
///
/// The permit is obtained in `poll_ready`, before the inner service is asked for
/// readiness, so inner layers that reserve a slot on readiness (`ConcurrencyLimit`,
/// `Buffer`) are not tied up while a request waits for admission. A service that became
/// ready and is then dropped without being called still spends its admission.
pub struct RateLimitService<S> {
    inner: S,
    limiter: RateLimiter,
    acquiring: Option<BoxFuture<'static, Result<Permit, RateLimitError>>>,
    permit: Option<Permit>,
}

impl<S> RateLimitService<S> {
    fn new(inner: S, limiter: RateLimiter) -> Self {
        Self { inner, limiter, acquiring: None, permit: None }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

impl<S: Clone> Clone for RateLimitService<S> {
    fn clone(&self) -> Self {
        // Readiness is per instance; a clone starts without a permit.
        Self::new(self.inner.clone(), self.limiter.clone())
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for RateLimitService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitService")
            .field("inner", &self.inner)
            .field("limiter", &self.limiter)
            .field("admitted", &self.permit.is_some())
            .finish()
    }
}

impl<S, Req> Service<Req> for RateLimitService<S>
where
    S: Service<Req>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = S::Response;
    type Error = SubmitError<S::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if self.permit.is_none() {
            let acquiring = self.acquiring.get_or_insert_with(|| -> BoxFuture<'static, _> {
                let limiter = self.limiter.clone();
                Box::pin(async move { limiter.acquire().await })
            });
            let admitted = ready!(acquiring.as_mut().poll(cx));
            self.acquiring = None;
            self.permit = Some(admitted?);
        }
        self.inner.poll_ready(cx).map_err(SubmitError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let permit = self.permit.take();
        let limiter = self.limiter.clone();
        let response = self.inner.call(req);

        Box::pin(async move {
            // Called without poll_ready: wait for admission here instead.
            let mut permit = match permit {
                Some(permit) => permit,
                None => limiter.acquire().await?,
            };
            let result = response.await.map_err(SubmitError::Inner);
            permit.release();
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::time::Duration;
    use tokio::time::Instant;
    use tower::{service_fn, ServiceBuilder, ServiceExt};

    const WINDOW: Duration = Duration::from_millis(100);

    #[tokio::test(start_paused = true)]
    async fn throttles_inner_service() {
        let limiter = RateLimiter::new(2, WINDOW).unwrap();
        let svc = ServiceBuilder::new()
            .layer(RateLimitLayer::new(limiter.clone()))
            .service(service_fn(|n: u32| async move { Ok::<_, Infallible>(n * 2) }));

        let start = Instant::now();
        let mut outputs = Vec::new();
        for n in 0..4 {
            outputs.push(svc.clone().oneshot(n).await.unwrap());
        }
        assert_eq!(outputs, vec![0, 2, 4, 6]);
        assert_eq!(start.elapsed(), WINDOW);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn inner_errors_pass_through() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10)).unwrap();
        let svc = RateLimitLayer::new(limiter).layer(service_fn(|_: ()| async {
            Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "downstream"))
        }));

        let err = svc.oneshot(()).await.unwrap_err();
        assert!(err.is_inner());
        assert_eq!(err.to_string(), "downstream");
    }

    #[tokio::test(start_paused = true)]
    async fn waiting_for_admission_leaves_inner_slot_free() {
        let limiter = RateLimiter::new(1, WINDOW).unwrap();
        let svc = ServiceBuilder::new()
            .layer(RateLimitLayer::new(limiter.clone()))
            .concurrency_limit(1)
            .service(service_fn(|n: u32| async move { Ok::<_, Infallible>(n) }));

        let mut first = svc.clone();
        first.ready().await.unwrap();
        assert_eq!(limiter.available_permits(), 0);

        // Queued behind the limiter, not behind the concurrency slot `first` holds.
        let waiter = tokio::spawn(svc.clone().oneshot(2));
        tokio::task::yield_now().await;
        assert_eq!(limiter.waiting(), 1);

        assert_eq!(first.call(1).await.unwrap(), 1);
        let start = Instant::now();
        assert_eq!(waiter.await.unwrap().unwrap(), 2);
        assert!(start.elapsed() <= WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn call_without_poll_ready_still_waits_for_admission() {
        let limiter = RateLimiter::new(1, WINDOW).unwrap();
        let mut svc = RateLimitLayer::new(limiter.clone())
            .layer(service_fn(|n: u32| async move { Ok::<_, Infallible>(n) }));
        let start = Instant::now();

        assert_eq!(svc.call(1).await.unwrap(), 1);
        assert_eq!(svc.call(2).await.unwrap(), 2);
        assert_eq!(start.elapsed(), WINDOW);
    }
}
