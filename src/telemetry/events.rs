use serde_json::json;
use std::fmt;
use std::time::Duration;

/// Events emitted by a [`RateLimiter`](crate::RateLimiter).
///
/// Admission outcomes (`Acquired`, `Cancelled`, `TimedOut`) are emitted on the caller's
/// task. `Released` and `Replenished` are emitted from the limiter's release timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterEvent {
    /// A caller was granted a permit.
    Acquired {
        /// Time spent queued (zero for an immediate grant)
        waited: Duration,
        /// Permits left in the pool right after the grant
        available: usize,
    },
    /// A queued caller abandoned its wait.
    Cancelled {
        /// Time spent queued before cancelling
        waited: Duration,
    },
    /// A queued caller's deadline passed.
    TimedOut {
        /// Time spent queued before giving up
        waited: Duration,
    },
    /// A holder signalled completion.
    Released {
        /// Time between grant and release
        held: Duration,
    },
    /// A permit went back to the pool.
    Replenished {
        /// Permits in the pool after the return (zero if a waiter took it)
        available: usize,
    },
}

impl LimiterEvent {
    /// Short machine-readable name for the event.
    pub fn kind(&self) -> &'static str {
        match self {
            LimiterEvent::Acquired { .. } => "permit_acquired",
            LimiterEvent::Cancelled { .. } => "acquire_cancelled",
            LimiterEvent::TimedOut { .. } => "acquire_timed_out",
            LimiterEvent::Released { .. } => "permit_released",
            LimiterEvent::Replenished { .. } => "permit_replenished",
        }
    }
}

impl fmt::Display for LimiterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimiterEvent::Acquired { waited, available } => {
                write!(f, "Acquired(waited={:?}, available={})", waited, available)
            }
            LimiterEvent::Cancelled { waited } => write!(f, "Cancelled(waited={:?})", waited),
            LimiterEvent::TimedOut { waited } => write!(f, "TimedOut(waited={:?})", waited),
            LimiterEvent::Released { held } => write!(f, "Released(held={:?})", held),
            LimiterEvent::Replenished { available } => {
                write!(f, "Replenished(available={})", available)
            }
        }
    }
}

#[inline]
fn clamp_u64(val: u128) -> u64 {
    val.min(u128::from(u64::MAX)) as u64
}

/// Convert a LimiterEvent into a JSON value for sinks.
pub fn event_to_json(event: &LimiterEvent) -> serde_json::Value {
    match event {
        LimiterEvent::Acquired { waited, available } => json!({
            "kind": event.kind(),
            "waited_ms": clamp_u64(waited.as_millis()),
            "available": *available,
        }),
        LimiterEvent::Cancelled { waited } | LimiterEvent::TimedOut { waited } => json!({
            "kind": event.kind(),
            "waited_ms": clamp_u64(waited.as_millis()),
        }),
        LimiterEvent::Released { held } => json!({
            "kind": event.kind(),
            "held_ms": clamp_u64(held.as_millis()),
        }),
        LimiterEvent::Replenished { available } => json!({
            "kind": event.kind(),
            "available": *available,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquired_display() {
        let event = LimiterEvent::Acquired { waited: Duration::from_millis(20), available: 3 };
        let s = event.to_string();
        assert!(s.contains("Acquired"));
        assert!(s.contains("available=3"));
    }

    #[test]
    fn timed_out_display() {
        let event = LimiterEvent::TimedOut { waited: Duration::from_millis(100) };
        assert!(event.to_string().contains("TimedOut"));
        assert!(event.to_string().contains("100ms"));
    }

    #[test]
    fn acquired_json() {
        let v = event_to_json(&LimiterEvent::Acquired {
            waited: Duration::from_millis(1000),
            available: 0,
        });
        assert_eq!(v["kind"], "permit_acquired");
        assert_eq!(v["waited_ms"], 1000);
        assert_eq!(v["available"], 0);
    }

    #[test]
    fn cancelled_and_timeout_json_differ_by_kind() {
        let waited = Duration::from_millis(7);
        let c = event_to_json(&LimiterEvent::Cancelled { waited });
        let t = event_to_json(&LimiterEvent::TimedOut { waited });
        assert_eq!(c["kind"], "acquire_cancelled");
        assert_eq!(t["kind"], "acquire_timed_out");
        assert_eq!(c["waited_ms"], t["waited_ms"]);
    }

    #[test]
    fn released_json() {
        let v = event_to_json(&LimiterEvent::Released { held: Duration::from_millis(42) });
        assert_eq!(v["kind"], "permit_released");
        assert_eq!(v["held_ms"], 42);
    }

    #[test]
    fn replenished_json() {
        let v = event_to_json(&LimiterEvent::Replenished { available: 4 });
        assert_eq!(v["kind"], "permit_replenished");
        assert_eq!(v["available"], 4);
    }
}
