//! Fair, sliding-window admission control.
//!
//! A [`RateLimiter`] admits at most `capacity` operations per `window`. Callers ask for a
//! [`Permit`] before doing the throttled work; when none is available they queue, and
//! queued callers are served strictly in arrival order.
//!
//! Semantics:
//! - The pool starts full. Each grant takes one permit out of it.
//! - With [`ReleaseMode::FromAcquisition`] (the default), a permit goes back to the pool
//!   exactly `window` after it was granted, no matter how long its holder takes. Any
//!   window-length interval therefore sees at most `capacity` grants.
//! - With [`ReleaseMode::AfterCompletion`], a permit stays out until its holder releases
//!   it (or drops it) and returns `window` after that.
//! - Returns are driven by timer tasks on the tokio runtime, never by a caller's task.
//! - A waiter that is cancelled, times out, or whose future is dropped leaves the queue
//!   without consuming a permit.
//!
//! Invariants:
//! - `0 <= available_permits() <= capacity()` at all times.
//! - A waiter is never admitted while an earlier waiter is still queued.
//! - Releasing a permit more than once has the effect of releasing it once.
//!
//! ```rust
//! use paceline::RateLimiter;
//! use std::time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let limiter = RateLimiter::new(5, Duration::from_secs(1)).unwrap();
//!
//! let mut permit = limiter.acquire().await.unwrap();
//! // ... call the throttled resource ...
//! permit.release();
//!
//! assert_eq!(limiter.outstanding(), 1);
//! # });
//! ```

use crate::config::{RateLimiterConfig, ReleaseMode};
use crate::error::RateLimitError;
use crate::telemetry::{emit_best_effort, LimiterEvent, TelemetrySink};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

pub mod middleware;
pub mod permit;

pub use middleware::{RateLimitLayer, RateLimitService};
pub use permit::Permit;

type Emitter = Arc<dyn Fn(LimiterEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// State shared by every handle to one limiter and by the permits it grants.
pub(crate) struct Shared {
    semaphore: Arc<Semaphore>,
    config: RateLimiterConfig,
    in_flight: AtomicUsize,
    waiting: AtomicUsize,
    next_id: AtomicU64,
    emitter: Option<Emitter>,
}

impl Shared {
    pub(crate) fn finish(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    async fn emit(&self, event: LimiterEvent) {
        if let Some(emit) = &self.emitter {
            emit(event).await;
        }
    }

    /// Emit without making the caller wait on the sink.
    pub(crate) fn emit_detached(&self, handle: &Handle, event: LimiterEvent) {
        if let Some(emit) = &self.emitter {
            handle.spawn(emit(event));
        }
    }

    /// Hand `permit` to a timer task that puts it back in the pool one window after `from`.
    ///
    /// Returns the instant the slot comes back. A window too long to represent as an
    /// instant means the slot never comes back, so the permit is retired instead.
    pub(crate) fn schedule_return(
        self: &Arc<Self>,
        handle: &Handle,
        permit: OwnedSemaphorePermit,
        from: Instant,
    ) -> Option<Instant> {
        let Some(at) = from.checked_add(self.config.window) else {
            tracing::debug!(window = ?self.config.window, "return lies beyond the clock's range; retiring permit");
            permit.forget();
            return None;
        };
        let shared = Arc::clone(self);
        handle.spawn(async move {
            tokio::time::sleep_until(at).await;
            drop(permit);
            let available = shared.semaphore.available_permits();
            tracing::trace!(available, "permit returned to pool");
            shared.emit(LimiterEvent::Replenished { available }).await;
        });
        Some(at)
    }
}

/// Decrements the waiting count when a queued caller leaves, however it leaves.
struct Queued<'a>(&'a AtomicUsize);

impl<'a> Queued<'a> {
    fn enter(counter: &'a AtomicUsize) -> (Self, usize) {
        let waiting = counter.fetch_add(1, Ordering::AcqRel) + 1;
        (Self(counter), waiting)
    }
}

impl Drop for Queued<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Admission controller bounding grants to `capacity` per `window`.
///
/// Cloning is cheap and every clone shares the same permit pool and queue.
#[derive(Clone)]
pub struct RateLimiter {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("capacity", &self.capacity())
            .field("window", &self.window())
            .field("release", &self.release_mode())
            .field("available", &self.available_permits())
            .field("waiting", &self.waiting())
            .field("sink", &self.shared.emitter.as_ref().map(|_| "<sink>"))
            .finish()
    }
}

impl RateLimiter {
    /// Limiter admitting `capacity` operations per `window`, released from acquisition.
    ///
    /// Fails with [`RateLimitError::InvalidConfig`] if either value is zero.
    pub fn new(capacity: usize, window: Duration) -> Result<Self, RateLimitError> {
        Self::from_config(RateLimiterConfig::new(capacity, window))
    }

    /// Build a limiter from a validated config.
    pub fn from_config(config: RateLimiterConfig) -> Result<Self, RateLimitError> {
        Self::with_emitter(config, None)
    }

    /// Construct a new builder with defaults.
    pub fn builder() -> RateLimiterBuilder {
        RateLimiterBuilder::new()
    }

    fn with_emitter(
        config: RateLimiterConfig,
        emitter: Option<Emitter>,
    ) -> Result<Self, RateLimitError> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                semaphore: Arc::new(Semaphore::new(config.capacity)),
                config,
                in_flight: AtomicUsize::new(0),
                waiting: AtomicUsize::new(0),
                next_id: AtomicU64::new(0),
                emitter,
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.shared.config.capacity
    }

    pub fn window(&self) -> Duration {
        self.shared.config.window
    }

    pub fn release_mode(&self) -> ReleaseMode {
        self.shared.config.release
    }

    /// Permits currently in the pool.
    pub fn available_permits(&self) -> usize {
        self.shared.semaphore.available_permits()
    }

    /// Permits granted and not yet back in the pool.
    pub fn outstanding(&self) -> usize {
        self.capacity().saturating_sub(self.available_permits())
    }

    /// Permits granted whose holders have not signalled completion.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Callers currently queued for a permit.
    pub fn waiting(&self) -> usize {
        self.shared.waiting.load(Ordering::Acquire)
    }

    /// Wait as long as needed for a permit.
    pub async fn acquire(&self) -> Result<Permit, RateLimitError> {
        self.admit(None, std::future::pending::<()>()).await
    }

    /// Wait at most `timeout` for a permit.
    ///
    /// A timeout too large to express as a deadline waits without one.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<Permit, RateLimitError> {
        self.admit(Instant::now().checked_add(timeout), std::future::pending::<()>()).await
    }

    /// Wait for a permit until `deadline`.
    pub async fn acquire_until(&self, deadline: Instant) -> Result<Permit, RateLimitError> {
        self.admit(Some(deadline), std::future::pending::<()>()).await
    }

    /// Wait for a permit unless `cancel` completes first.
    ///
    /// A permit that is already available is granted even if `cancel` is ready.
    pub async fn acquire_or_cancel<F>(&self, cancel: F) -> Result<Permit, RateLimitError>
    where
        F: Future,
    {
        self.admit(None, async move {
            cancel.await;
        })
        .await
    }

    /// Take a permit only if one is free right now.
    ///
    /// Never jumps ahead of queued callers. Returns `None` outside a tokio runtime, since
    /// the permit's return could not be scheduled.
    pub fn try_acquire(&self) -> Option<Permit> {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("try_acquire called outside a tokio runtime");
            return None;
        };
        let held = Arc::clone(&self.shared.semaphore).try_acquire_owned().ok()?;
        Some(self.grant(handle, held, Duration::ZERO))
    }

    /// Signal that the work guarded by `permit` is done. Same as [`Permit::release`].
    pub fn release(&self, mut permit: Permit) {
        permit.release();
    }

    async fn admit<C>(&self, deadline: Option<Instant>, cancel: C) -> Result<Permit, RateLimitError>
    where
        C: Future<Output = ()>,
    {
        // Returns are driven by the runtime's timer; without one, admitting would be unbounded.
        let handle = Handle::try_current().map_err(|_| {
            tracing::warn!("acquire called outside a tokio runtime");
            RateLimitError::NoRuntime
        })?;
        let start = Instant::now();
        let semaphore = Arc::clone(&self.shared.semaphore);

        let held = match Arc::clone(&semaphore).try_acquire_owned() {
            Ok(held) => held,
            Err(_) => {
                let (_queued, waiting) = Queued::enter(&self.shared.waiting);
                tracing::debug!(waiting, "no permit available, queueing");

                let expiry = async move {
                    match deadline {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending::<()>().await,
                    }
                };

                tokio::select! {
                    biased;
                    acquired = semaphore.acquire_owned() => {
                        // The semaphore is never closed while a handle exists.
                        acquired.map_err(|_| RateLimitError::Cancelled)?
                    }
                    _ = cancel => {
                        let waited = start.elapsed();
                        tracing::debug!(?waited, "acquire cancelled");
                        self.shared.emit_detached(&handle, LimiterEvent::Cancelled { waited });
                        return Err(RateLimitError::Cancelled);
                    }
                    _ = expiry => {
                        let waited = start.elapsed();
                        let limit = deadline.map_or(waited, |at| at.saturating_duration_since(start));
                        tracing::debug!(?waited, ?limit, "acquire timed out");
                        self.shared.emit_detached(&handle, LimiterEvent::TimedOut { waited });
                        return Err(RateLimitError::Timeout { waited, limit });
                    }
                }
            }
        };

        Ok(self.grant(handle, held, start.elapsed()))
    }

    fn grant(&self, handle: Handle, held: OwnedSemaphorePermit, waited: Duration) -> Permit {
        let shared = &self.shared;
        let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
        let acquired_at = Instant::now();
        shared.in_flight.fetch_add(1, Ordering::AcqRel);

        let (held, returns_at) = match shared.config.release {
            ReleaseMode::FromAcquisition => {
                (None, shared.schedule_return(&handle, held, acquired_at))
            }
            ReleaseMode::AfterCompletion => (Some(held), None),
        };

        let available = shared.semaphore.available_permits();
        tracing::debug!(permit = id, ?waited, available, "permit granted");
        shared.emit_detached(&handle, LimiterEvent::Acquired { waited, available });
        Permit::new(id, acquired_at, returns_at, held, handle, Arc::clone(shared))
    }
}

/// Builder for `RateLimiter`.
pub struct RateLimiterBuilder {
    config: RateLimiterConfig,
    emitter: Option<Emitter>,
}

impl RateLimiterBuilder {
    /// Create a builder with the default five-per-second quota.
    pub fn new() -> Self {
        Self { config: RateLimiterConfig::default(), emitter: None }
    }

    /// Maximum admissions per window. Must be > 0.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Replenishment period. Must be > 0.
    pub fn window(mut self, window: Duration) -> Self {
        self.config.window = window;
        self
    }

    pub fn release_mode(mut self, release: ReleaseMode) -> Self {
        self.config.release = release;
        self
    }

    /// Replace capacity, window and release mode at once.
    pub fn config(mut self, config: RateLimiterConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a telemetry sink.
    pub fn sink<S>(mut self, sink: S) -> Self
    where
        S: TelemetrySink,
        S::Future: Send + 'static,
    {
        self.emitter = Some(Arc::new(move |event| -> BoxFuture<'static, ()> {
            Box::pin(emit_best_effort(sink.clone(), event))
        }));
        self
    }

    /// Build the limiter, validating inputs.
    pub fn build(self) -> Result<RateLimiter, RateLimitError> {
        RateLimiter::with_emitter(self.config, self.emitter)
    }
}

impl Default for RateLimiterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
