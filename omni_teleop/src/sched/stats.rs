//! Per-task execution statistics.

use omni_common::teleop::error::TeleopError;

/// O(1) per-invocation timing and fault bookkeeping for one task.
///
/// Updated on the tick thread only; copied into the run report on exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStats {
    /// Completed invocations (including ones that returned an error).
    pub invocations: u64,
    /// Last invocation duration [ns].
    pub last_ns: u64,
    /// Minimum invocation duration [ns].
    pub min_ns: u64,
    /// Maximum invocation duration [ns].
    pub max_ns: u64,
    /// Running sum for average computation.
    pub sum_ns: u128,
    /// Invocations that finished after the next release of the task.
    pub overruns: u64,
    /// Due invocations dropped by overrun catch-up.
    pub skipped: u64,
    /// Current run of missed deadlines; reset by an on-time invocation.
    pub consecutive_misses: u32,
    /// Task is no longer dispatched after a fault.
    pub disabled: bool,
    /// Most recent error or panic.
    pub last_fault: Option<TeleopError>,
}

impl TaskStats {
    pub const fn new() -> Self {
        Self {
            invocations: 0,
            last_ns: 0,
            min_ns: u64::MAX,
            max_ns: 0,
            sum_ns: 0,
            overruns: 0,
            skipped: 0,
            consecutive_misses: 0,
            disabled: false,
            last_fault: None,
        }
    }

    /// Record one invocation duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: u64) {
        self.invocations += 1;
        self.last_ns = duration_ns;
        if duration_ns < self.min_ns {
            self.min_ns = duration_ns;
        }
        if duration_ns > self.max_ns {
            self.max_ns = duration_ns;
        }
        self.sum_ns += u128::from(duration_ns);
    }

    /// Average invocation time [ns] (0 if never run).
    #[inline]
    pub fn avg_ns(&self) -> u64 {
        if self.invocations == 0 {
            0
        } else {
            (self.sum_ns / u128::from(self.invocations)) as u64
        }
    }
}

impl Default for TaskStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_step_timings() {
        // Control steps of a 1 ms tick: a fast step, a slow one, then an
        // idle-looking one.
        let mut stats = TaskStats::new();
        assert_eq!(stats.min_ns, u64::MAX);
        assert_eq!(stats.avg_ns(), 0);

        for ns in [120_000, 840_000, 60_000] {
            stats.record(ns);
        }
        assert_eq!(stats.invocations, 3);
        assert_eq!(stats.last_ns, 60_000);
        assert_eq!((stats.min_ns, stats.max_ns), (60_000, 840_000));
        assert_eq!(stats.avg_ns(), 340_000);
    }

    #[test]
    fn sum_does_not_wrap_on_long_runs() {
        let mut stats = TaskStats::new();
        stats.record(u64::MAX);
        stats.record(u64::MAX);
        assert_eq!(stats.avg_ns(), u64::MAX);
    }

    #[test]
    fn new_is_clean() {
        let stats = TaskStats::default();
        assert!(!stats.disabled);
        assert_eq!(stats.overruns, 0);
        assert_eq!(stats.last_fault, None);
    }
}
