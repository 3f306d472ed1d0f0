//! Cooperative stop flag shared between the tick thread, its tasks and
//! outside controllers (signal handler, console, caller of `stop()`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use omni_common::teleop::error::TeleopError;
use parking_lot::{Condvar, Mutex};

/// Why the tick loop exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `stop()` or `request_stop()` was called.
    Requested,
    /// The configured tick limit was reached.
    TickLimitReached,
    /// The control task failed, panicked or missed too many deadlines.
    Fault(TeleopError),
}

impl StopReason {
    #[inline]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }
}

/// Stop flag with a recorded reason.
///
/// The flag is an atomic read once per dispatch; the reason and the
/// condvar are only touched on the stop path. The first reason recorded
/// wins.
#[derive(Debug, Default)]
pub struct RunState {
    stop_requested: AtomicBool,
    reason: Mutex<Option<StopReason>>,
    stopped: Condvar,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a plain stop.
    pub fn request_stop(&self) {
        self.stop_with(StopReason::Requested);
    }

    /// Request a stop, recording `reason` unless one was already recorded.
    pub fn stop_with(&self, reason: StopReason) {
        let mut slot = self.reason.lock();
        if slot.is_none() {
            *slot = Some(reason);
        }
        self.stop_requested.store(true, Ordering::Release);
        self.stopped.notify_all();
    }

    #[inline]
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Recorded reason, `None` while running.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.reason.lock().clone()
    }

    /// Block until a stop is requested or `timeout` passes.
    ///
    /// Returns `true` if a stop was requested.
    pub fn wait_for_stop(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut slot = self.reason.lock();
        while slot.is_none() {
            match deadline {
                Some(deadline) => {
                    if self.stopped.wait_until(&mut slot, deadline).timed_out() {
                        return slot.is_some();
                    }
                }
                None => self.stopped.wait(&mut slot),
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn first_reason_wins() {
        let state = RunState::new();
        assert!(!state.is_stop_requested());
        assert_eq!(state.stop_reason(), None);

        state.stop_with(StopReason::TickLimitReached);
        state.request_stop();
        assert!(state.is_stop_requested());
        assert_eq!(state.stop_reason(), Some(StopReason::TickLimitReached));
    }

    #[test]
    fn wait_times_out_while_running() {
        let state = RunState::new();
        assert!(!state.wait_for_stop(Some(Duration::from_millis(5))));
    }

    #[test]
    fn wait_wakes_on_stop_from_other_thread() {
        let state = Arc::new(RunState::new());
        let remote = Arc::clone(&state);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            remote.stop_with(StopReason::Fault(TeleopError::OperationalFault {
                link: "L->R".into(),
            }));
        });
        assert!(state.wait_for_stop(None));
        handle.join().unwrap();
        assert!(state.stop_reason().is_some_and(|r| r.is_fault()));
    }
}
