//! Permits granted by a [`RateLimiter`](crate::RateLimiter).

use super::Shared;
use crate::telemetry::LimiterEvent;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::OwnedSemaphorePermit;
use tokio::time::Instant;

/// One admission. Release it when the throttled work is done.
///
/// Dropping an unreleased permit releases it. Whether the release frees a pool slot
/// depends on the limiter's [`ReleaseMode`](crate::ReleaseMode): with `FromAcquisition`
/// the slot's return was already scheduled at grant time and releasing only records
/// completion; with `AfterCompletion` releasing schedules the return one window later.
#[must_use = "dropping a permit releases it immediately"]
pub struct Permit {
    id: u64,
    acquired_at: Instant,
    returns_at: Option<Instant>,
    held: Option<OwnedSemaphorePermit>,
    released: bool,
    // Runtime the permit was granted on; its timer drives the pool return.
    handle: Handle,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit")
            .field("id", &self.id)
            .field("acquired_at", &self.acquired_at)
            .field("returns_at", &self.returns_at)
            .field("released", &self.released)
            .finish()
    }
}

impl Permit {
    pub(crate) fn new(
        id: u64,
        acquired_at: Instant,
        returns_at: Option<Instant>,
        held: Option<OwnedSemaphorePermit>,
        handle: Handle,
        shared: Arc<Shared>,
    ) -> Self {
        Self { id, acquired_at, returns_at, held, released: false, handle, shared }
    }

    /// Grant sequence number, unique per limiter.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }

    /// When the pool slot comes back, once that is known.
    pub fn returns_at(&self) -> Option<Instant> {
        self.returns_at
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Signal completion. Calling this again has no further effect.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.shared.finish();

        let held_for = self.acquired_at.elapsed();
        if let Some(slot) = self.held.take() {
            self.returns_at = self.shared.schedule_return(&self.handle, slot, Instant::now());
        }
        tracing::debug!(permit = self.id, held = ?held_for, "permit released");
        self.shared.emit_detached(&self.handle, LimiterEvent::Released { held: held_for });
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.release();
    }
}
