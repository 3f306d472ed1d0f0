//! Periodic task scheduler root.
//!
//! A single clock-driven dispatcher: every base tick it runs the tasks whose
//! period divides the tick number, highest priority first, on one dedicated
//! thread. See [`scheduler`] for timing and fault policy.

pub mod run_state;
pub mod scheduler;
pub mod stats;
pub mod task;

pub use run_state::{RunState, StopReason};
pub use scheduler::{PeriodicTaskScheduler, RunReport, SchedulerConfig, TaskReport};
pub use stats::TaskStats;
pub use task::{from_fn, PeriodicTask, ScheduledTask, TaskHandle, TickContext};
