//! Task definitions handed to the scheduler.

use std::fmt;
use std::time::Duration;

use omni_common::teleop::error::TeleopError;

use super::run_state::RunState;

/// Per-invocation view passed to a task body.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    /// 1-indexed base tick number.
    pub tick: u64,
    /// Nominal release time of this tick relative to scheduler start.
    pub elapsed: Duration,
    /// Shared stop flag; a task may request a stop through it.
    pub run_state: &'a RunState,
}

/// Body of a periodic task.
///
/// Must be short relative to the base tick and must not block on I/O.
/// Returning an error is handled at the dispatch boundary: the control
/// (highest-priority) task stops the scheduler, auxiliary tasks are disabled.
pub trait PeriodicTask: Send {
    fn run(&mut self, ctx: &TickContext<'_>) -> Result<(), TeleopError>;

    /// Called once on the tick thread after the loop has exited.
    fn on_stop(&mut self) {}
}

impl<F> PeriodicTask for F
where
    F: FnMut(&TickContext<'_>) -> Result<(), TeleopError> + Send,
{
    fn run(&mut self, ctx: &TickContext<'_>) -> Result<(), TeleopError> {
        self(ctx)
    }
}

/// Wrap a closure as a [`PeriodicTask`], pinning down its higher-ranked
/// signature so the closure parameter needs no annotation.
pub fn from_fn<F>(f: F) -> F
where
    F: FnMut(&TickContext<'_>) -> Result<(), TeleopError> + Send,
{
    f
}

/// A task registration: what to run, how often, and in which order.
pub struct ScheduledTask {
    /// Diagnostic name.
    pub name: String,
    /// Run once every `period_cycles` base ticks (must be positive).
    pub period_cycles: u64,
    /// Higher value is dispatched first within a tick.
    pub priority: i32,
    /// Task body; owned by the scheduler while it runs.
    pub action: Box<dyn PeriodicTask>,
}

impl ScheduledTask {
    pub fn new(
        name: impl Into<String>,
        period_cycles: u64,
        priority: i32,
        action: impl PeriodicTask + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            period_cycles,
            priority,
            action: Box::new(action),
        }
    }

    /// True if this task runs on `tick` (1-indexed, `tick % period == 0`).
    #[inline]
    pub const fn is_due(&self, tick: u64) -> bool {
        self.period_cycles != 0 && tick != 0 && tick % self.period_cycles == 0
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("name", &self.name)
            .field("period_cycles", &self.period_cycles)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Identifies a registered task in the [`RunReport`](super::RunReport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(pub(crate) usize);

impl TaskHandle {
    /// Registration index (0 = first registered).
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_ticks_are_one_indexed_multiples() {
        let task = ScheduledTask::new("aux", 1000, 1, from_fn(|_| Ok(())));
        assert!(!task.is_due(0));
        assert!(!task.is_due(999));
        assert!(task.is_due(1000));
        assert!(!task.is_due(1500));
        assert!(task.is_due(2000));
    }

    #[test]
    fn closures_are_tasks() {
        let mut count = 0u32;
        let mut body = from_fn(|_| {
            count += 1;
            Ok(())
        });
        let state = RunState::new();
        let ctx = TickContext {
            tick: 1,
            elapsed: Duration::ZERO,
            run_state: &state,
        };
        body.run(&ctx).unwrap();
        body.run(&ctx).unwrap();
        assert_eq!(count, 2);
    }
}
