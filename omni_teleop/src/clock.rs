//! Monotonic clock sources for tick pacing.
//!
//! The scheduler only needs "what time is it" and "sleep until then".
//! [`MonotonicClock`] is the production source; [`ManualClock`] is a
//! virtual clock that lets tests drive overruns deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Monotonic time source.
///
/// `now()` values are offsets from an arbitrary per-clock origin and never
/// go backwards.
pub trait Clock: Send + Sync + 'static {
    /// Current monotonic time.
    fn now(&self) -> Duration;

    /// Block until `now() >= deadline`. Returns immediately if already past.
    fn sleep_until(&self, deadline: Duration);
}

// ─── Monotonic Clock ────────────────────────────────────────────────

/// `CLOCK_MONOTONIC` clock.
///
/// With the `rt` feature, sleeping uses `clock_nanosleep(TIMER_ABSTIME)`
/// for drift-free pacing; otherwise `std::thread::sleep` on the remainder.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    #[cfg(not(feature = "rt"))]
    origin: std::time::Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(feature = "rt"))]
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(feature = "rt"))]
impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep_until(&self, deadline: Duration) {
        if let Some(remaining) = deadline.checked_sub(self.now()) {
            std::thread::sleep(remaining);
        }
    }
}

#[cfg(feature = "rt")]
impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        use nix::time::{clock_gettime, ClockId};
        // CLOCK_MONOTONIC cannot fail on Linux with a valid clock id.
        match clock_gettime(ClockId::CLOCK_MONOTONIC) {
            Ok(ts) => Duration::new(ts.tv_sec() as u64, ts.tv_nsec() as u32),
            Err(_) => Duration::ZERO,
        }
    }

    fn sleep_until(&self, deadline: Duration) {
        use nix::sys::time::TimeSpec;
        use nix::time::{clock_nanosleep, ClockId, ClockNanosleepFlags};

        let wake = TimeSpec::new(deadline.as_secs() as i64, deadline.subsec_nanos() as i64);
        while self.now() < deadline {
            let result = clock_nanosleep(
                ClockId::CLOCK_MONOTONIC,
                ClockNanosleepFlags::TIMER_ABSTIME,
                &wake,
            );
            if !retry_absolute_sleep(result.map(drop)) {
                if let Some(remaining) = deadline.checked_sub(self.now()) {
                    std::thread::sleep(remaining);
                }
                break;
            }
        }
    }
}

/// Whether the absolute sleep loop goes round again after `result`.
///
/// Only a wake-up or `EINTR` re-enters `clock_nanosleep`; any other errno
/// would fail the same way on every pass.
#[cfg(feature = "rt")]
fn retry_absolute_sleep(result: nix::Result<()>) -> bool {
    use nix::errno::Errno;
    match result {
        Ok(()) | Err(Errno::EINTR) => true,
        Err(e) => {
            tracing::warn!("clock_nanosleep failed ({e}), finishing tick sleep with thread::sleep");
            false
        }
    }
}

// ─── Manual Clock ───────────────────────────────────────────────────

/// Virtual clock advanced explicitly.
///
/// `sleep_until` jumps straight to the deadline, so a scheduler driven by
/// this clock runs as fast as its tasks allow while still observing exact
/// tick arithmetic. Tasks call [`advance`](Self::advance) to simulate work.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ns: AtomicU64,
}

impl ManualClock {
    pub const fn new() -> Self {
        Self {
            now_ns: AtomicU64::new(0),
        }
    }

    /// Move time forward by `d`.
    pub fn advance(&self, d: Duration) {
        self.now_ns.fetch_add(d.as_nanos() as u64, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.now_ns.load(Ordering::Acquire))
    }

    fn sleep_until(&self, deadline: Duration) {
        self.now_ns
            .fetch_max(deadline.as_nanos() as u64, Ordering::AcqRel);
        std::thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_sleep_jumps_forward_only() {
        let clock = ManualClock::new();
        clock.sleep_until(Duration::from_millis(5));
        assert_eq!(clock.now(), Duration::from_millis(5));

        clock.sleep_until(Duration::from_millis(2));
        assert_eq!(clock.now(), Duration::from_millis(5));

        clock.advance(Duration::from_micros(250));
        assert_eq!(clock.now(), Duration::from_micros(5250));
    }

    #[test]
    fn monotonic_clock_sleeps_at_least_until_deadline() {
        let clock = MonotonicClock::new();
        let deadline = clock.now() + Duration::from_millis(2);
        clock.sleep_until(deadline);
        assert!(clock.now() >= deadline);

        // A deadline already in the past returns at once.
        let before = clock.now();
        clock.sleep_until(Duration::ZERO);
        assert!(clock.now() - before < Duration::from_millis(100));
    }

    #[cfg(feature = "rt")]
    #[test]
    fn absolute_sleep_retries_only_after_wakeup_or_eintr() {
        use nix::errno::Errno;
        assert!(retry_absolute_sleep(Ok(())));
        assert!(retry_absolute_sleep(Err(Errno::EINTR)));
        assert!(!retry_absolute_sleep(Err(Errno::EINVAL)));
        assert!(!retry_absolute_sleep(Err(Errno::EFAULT)));
    }
}
