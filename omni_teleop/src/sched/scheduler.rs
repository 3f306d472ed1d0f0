//! Fixed-rate periodic task dispatcher.
//!
//! ## Tick Loop
//! One dedicated thread sleeps to the absolute release time of each base
//! tick (`origin + n * tick`, 1-indexed), then runs every task whose period
//! divides `n` in descending priority order. Task bodies run to completion
//! on that thread; nothing is preempted.
//!
//! ## Overruns
//! - A task that finishes after its own next release has missed a deadline.
//! - If the loop falls more than one tick behind, the ticks in between are
//!   skipped (never replayed) and every due invocation they contained is
//!   counted as skipped.
//! - Misses of the control task (highest priority) accumulate; one more than
//!   `deadline_miss_tolerance` consecutive misses stops the run with
//!   [`TeleopError::DeadlineMiss`]. An on-time invocation resets the count.
//!
//! ## Faults
//! Errors and panics are caught at the dispatch boundary. The control task
//! stops the scheduler; any other task is disabled for the rest of the run.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use omni_common::consts::{DEADLINE_MISS_TOLERANCE_DEFAULT, MAX_TASKS};
use omni_common::teleop::config::SchedulerSection;
use omni_common::teleop::error::TeleopError;
use tracing::{debug, error, info, warn};

use super::run_state::{RunState, StopReason};
use super::stats::TaskStats;
use super::task::{ScheduledTask, TaskHandle, TickContext};
use crate::clock::{Clock, MonotonicClock};
use crate::rt;

// ─── Configuration ──────────────────────────────────────────────────

/// Runtime parameters of one scheduler instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Base tick; every task period is a multiple of it.
    pub tick: Duration,
    /// Consecutive control-task misses tolerated before stopping.
    pub deadline_miss_tolerance: u32,
    /// Stop after this many ticks (`None` runs until stopped).
    pub tick_limit: Option<u64>,
    /// CPU core for the tick thread (applied with the `rt` feature).
    pub cpu_core: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(1),
            deadline_miss_tolerance: DEADLINE_MISS_TOLERANCE_DEFAULT,
            tick_limit: None,
            cpu_core: None,
        }
    }
}

impl From<&SchedulerSection> for SchedulerConfig {
    fn from(section: &SchedulerSection) -> Self {
        Self {
            tick: section.tick(),
            deadline_miss_tolerance: section.deadline_miss_tolerance,
            tick_limit: None,
            cpu_core: section.cpu_core,
        }
    }
}

// ─── Run Report ─────────────────────────────────────────────────────

/// Final statistics of one task.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub name: String,
    pub period_cycles: u64,
    pub priority: i32,
    pub stats: TaskStats,
}

/// Outcome of a finished run. Tasks are listed in registration order.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Last tick reached (dispatched or skipped).
    pub ticks: u64,
    /// Base ticks skipped by overrun catch-up.
    pub skipped_ticks: u64,
    pub stop_reason: StopReason,
    pub tasks: Vec<TaskReport>,
}

impl RunReport {
    /// Report of the task registered under `handle`.
    pub fn task(&self, handle: TaskHandle) -> Option<&TaskReport> {
        self.tasks.get(handle.index())
    }
}

// ─── Scheduler ──────────────────────────────────────────────────────

struct TaskSlot {
    registration: usize,
    task: ScheduledTask,
    stats: TaskStats,
}

/// Periodic task scheduler driven by a single clock.
///
/// Lifecycle: `add_task`* → `start` → (`stop`) → `join`. Tasks cannot be
/// added once started and a scheduler runs at most once.
pub struct PeriodicTaskScheduler<C: Clock = MonotonicClock> {
    config: SchedulerConfig,
    clock: Arc<C>,
    run_state: Arc<RunState>,
    slots: heapless::Vec<TaskSlot, MAX_TASKS>,
    started: bool,
    worker: Option<JoinHandle<RunReport>>,
    report: Option<RunReport>,
}

impl PeriodicTaskScheduler<MonotonicClock> {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }
}

impl<C: Clock> PeriodicTaskScheduler<C> {
    /// Scheduler paced by `clock` instead of the system monotonic clock.
    pub fn with_clock(config: SchedulerConfig, clock: Arc<C>) -> Self {
        Self {
            config,
            clock,
            run_state: Arc::new(RunState::new()),
            slots: heapless::Vec::new(),
            started: false,
            worker: None,
            report: None,
        }
    }

    /// Highest valid task priority.
    pub fn max_priority(&self) -> i32 {
        rt::priority_range().1
    }

    /// Lowest valid task priority.
    pub fn min_priority(&self) -> i32 {
        rt::priority_range().0
    }

    /// Stop flag shared with the tick thread and every task.
    pub fn run_state(&self) -> Arc<RunState> {
        Arc::clone(&self.run_state)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Register a task. Only valid before [`start`](Self::start).
    pub fn add_task(&mut self, task: ScheduledTask) -> Result<TaskHandle, TeleopError> {
        if self.started {
            return Err(TeleopError::InvalidState(
                "tasks cannot be added after start",
            ));
        }
        if task.period_cycles == 0 {
            return Err(TeleopError::invalid(format!(
                "task '{}': period_cycles must be positive",
                task.name
            )));
        }
        let (min, max) = rt::priority_range();
        if !(min..=max).contains(&task.priority) {
            return Err(TeleopError::invalid(format!(
                "task '{}': priority {} outside [{min}, {max}]",
                task.name, task.priority
            )));
        }
        if let Some(other) = self.slots.iter().find(|s| {
            s.task.priority == task.priority
                && may_collide(s.task.period_cycles, task.period_cycles, self.config.tick_limit)
        }) {
            return Err(TeleopError::invalid(format!(
                "task '{}' and task '{}' share priority {} and can be due on the same tick",
                task.name, other.task.name, task.priority
            )));
        }

        let registration = self.slots.len();
        debug!(
            "Registering task '{}' (period {} ticks, priority {})",
            task.name, task.period_cycles, task.priority
        );
        self.slots
            .push(TaskSlot {
                registration,
                task,
                stats: TaskStats::new(),
            })
            .map_err(|slot| {
                TeleopError::invalid(format!(
                    "task '{}': task table full ({MAX_TASKS} tasks)",
                    slot.task.name
                ))
            })?;
        Ok(TaskHandle(registration))
    }

    /// Start ticking on a dedicated thread.
    ///
    /// With `blocking`, returns only after the run has ended; the report is
    /// then available from [`join`](Self::join).
    pub fn start(&mut self, blocking: bool) -> Result<(), TeleopError> {
        if self.started {
            return Err(TeleopError::InvalidState("scheduler already started"));
        }
        if self.slots.is_empty() {
            return Err(TeleopError::InvalidState("no tasks registered"));
        }
        if self.config.tick.is_zero() {
            return Err(TeleopError::invalid("base tick must be positive"));
        }

        let mut slots = core::mem::take(&mut self.slots);
        // Stable: equal priorities keep registration order.
        slots.sort_by(|a, b| b.task.priority.cmp(&a.task.priority));

        let tick_loop = TickLoop {
            config: self.config.clone(),
            clock: Arc::clone(&self.clock),
            run_state: Arc::clone(&self.run_state),
            slots,
        };
        let handle = std::thread::Builder::new()
            .name("omni-tick".into())
            .spawn(move || tick_loop.run())
            .map_err(|e| TeleopError::RtSetup(format!("failed to spawn tick thread: {e}")))?;

        self.started = true;
        self.worker = Some(handle);

        if blocking {
            self.join()?;
        }
        Ok(())
    }

    /// Request a stop. Idempotent; does not wait.
    pub fn stop(&self) {
        self.run_state.request_stop();
    }

    /// True while the tick thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait for the tick thread to exit and return its report.
    pub fn join(&mut self) -> Result<&RunReport, TeleopError> {
        if self.report.is_none() {
            let handle = self
                .worker
                .take()
                .ok_or(TeleopError::InvalidState("scheduler not started"))?;
            let report = handle
                .join()
                .map_err(|_| TeleopError::InvalidState("tick thread panicked"))?;
            self.report = Some(report);
        }
        self.report
            .as_ref()
            .ok_or(TeleopError::InvalidState("scheduler not started"))
    }
}

impl<C: Clock> Drop for PeriodicTaskScheduler<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.take() {
            self.run_state.request_stop();
            let _ = handle.join();
        }
    }
}

/// Whether two periods share a due tick within the run.
fn may_collide(a: u64, b: u64, tick_limit: Option<u64>) -> bool {
    match tick_limit {
        None => true,
        Some(limit) => (a / gcd(a, b))
            .checked_mul(b)
            .is_some_and(|lcm| lcm <= limit),
    }
}

const fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

// ─── Tick Loop ──────────────────────────────────────────────────────

struct TickLoop<C: Clock> {
    config: SchedulerConfig,
    clock: Arc<C>,
    run_state: Arc<RunState>,
    /// Sorted by descending priority; index 0 is the control task.
    slots: heapless::Vec<TaskSlot, MAX_TASKS>,
}

impl<C: Clock> TickLoop<C> {
    fn run(mut self) -> RunReport {
        let control_priority = self.slots[0].task.priority;
        if let Err(e) = rt::rt_setup(self.config.cpu_core, control_priority) {
            error!("Tick thread RT setup failed: {e}");
            self.run_state.stop_with(StopReason::Fault(e));
            return self.finish(0, 0);
        }
        info!(
            "Tick loop started: {} task(s), tick {:?}, control task '{}'",
            self.slots.len(),
            self.config.tick,
            self.slots[0].task.name
        );

        let tick_ns = self.config.tick.as_nanos() as u64;
        let origin = self.clock.now();
        let mut tick: u64 = 0;
        let mut skipped_ticks: u64 = 0;

        loop {
            if self.run_state.is_stop_requested() {
                break;
            }
            if self.config.tick_limit.is_some_and(|limit| tick >= limit) {
                self.run_state.stop_with(StopReason::TickLimitReached);
                break;
            }

            tick += 1;
            let elapsed = release_offset(tick_ns, tick);
            self.clock.sleep_until(origin + elapsed);
            self.dispatch(tick, elapsed, origin, tick_ns);

            // Catch up when more than one tick behind.
            let behind = self.clock.now().saturating_sub(origin);
            let elapsed_ticks = (behind.as_nanos() / u128::from(tick_ns)) as u64;
            if elapsed_ticks > tick + 1 {
                let first = tick + 1;
                let last = match self.config.tick_limit {
                    Some(limit) => (elapsed_ticks - 1).min(limit),
                    None => elapsed_ticks - 1,
                };
                if last >= first {
                    skipped_ticks += last - first + 1;
                    self.skip(first, last);
                    tick = last;
                }
            }
        }

        self.finish(tick, skipped_ticks)
    }

    /// Run every due task of `tick` in priority order.
    fn dispatch(&mut self, tick: u64, elapsed: Duration, origin: Duration, tick_ns: u64) {
        let Self {
            config,
            clock,
            run_state,
            slots,
        } = self;
        let run_state: &RunState = run_state;
        let ctx = TickContext {
            tick,
            elapsed,
            run_state,
        };

        for (idx, slot) in slots.iter_mut().enumerate() {
            if run_state.is_stop_requested() {
                return;
            }
            if slot.stats.disabled || !slot.task.is_due(tick) {
                continue;
            }

            let started = clock.now();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| slot.task.action.run(&ctx)));
            let finished = clock.now();
            slot.stats
                .record(finished.saturating_sub(started).as_nanos() as u64);

            let is_control = idx == 0;
            let fault = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(payload) => Some(TeleopError::TaskFault {
                    task: slot.task.name.clone(),
                    reason: format!("panicked: {}", panic_message(payload.as_ref())),
                }),
            };
            if let Some(err) = fault {
                slot.stats.last_fault = Some(err.clone());
                if is_control {
                    let err = if err.stops_control_loop() {
                        err
                    } else {
                        TeleopError::TaskFault {
                            task: slot.task.name.clone(),
                            reason: err.to_string(),
                        }
                    };
                    error!("Control task '{}' failed at tick {tick}: {err}", slot.task.name);
                    run_state.stop_with(StopReason::Fault(err));
                    return;
                }
                warn!(
                    "Task '{}' failed at tick {tick}, disabling it: {err}",
                    slot.task.name
                );
                slot.stats.disabled = true;
                continue;
            }

            let next_release =
                origin + release_offset(tick_ns, tick.saturating_add(slot.task.period_cycles));
            if finished <= next_release {
                if is_control {
                    slot.stats.consecutive_misses = 0;
                }
                continue;
            }

            slot.stats.overruns += 1;
            if is_control {
                slot.stats.consecutive_misses += 1;
                if check_tolerance(slot, config.deadline_miss_tolerance, run_state) {
                    return;
                }
            } else {
                warn!(
                    "Task '{}' overran its period at tick {tick} ({:?})",
                    slot.task.name,
                    finished.saturating_sub(started)
                );
            }
        }
    }

    /// Account for the due invocations of ticks `first..=last`.
    fn skip(&mut self, first: u64, last: u64) {
        warn!(
            "Tick loop behind schedule, skipping ticks {first}..={last} ({} tick(s))",
            last - first + 1
        );
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            let period = slot.task.period_cycles;
            let due = last / period - (first - 1) / period;
            if due == 0 || slot.stats.disabled {
                continue;
            }
            slot.stats.skipped += due;
            if idx == 0 {
                slot.stats.consecutive_misses = slot
                    .stats
                    .consecutive_misses
                    .saturating_add(u32::try_from(due).unwrap_or(u32::MAX));
                if check_tolerance(slot, self.config.deadline_miss_tolerance, &self.run_state) {
                    return;
                }
            }
        }
    }

    fn finish(mut self, ticks: u64, skipped_ticks: u64) -> RunReport {
        for slot in self.slots.iter_mut() {
            let action = &mut slot.task.action;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| action.on_stop())) {
                warn!(
                    "Task '{}' panicked in on_stop: {}",
                    slot.task.name,
                    panic_message(payload.as_ref())
                );
            }
        }

        let stop_reason = self
            .run_state
            .stop_reason()
            .unwrap_or(StopReason::Requested);
        info!("Tick loop stopped after {ticks} tick(s): {stop_reason:?}");

        let mut slots: Vec<TaskSlot> = self.slots.into_iter().collect();
        slots.sort_by_key(|s| s.registration);
        RunReport {
            ticks,
            skipped_ticks,
            stop_reason,
            tasks: slots
                .into_iter()
                .map(|s| TaskReport {
                    name: s.task.name,
                    period_cycles: s.task.period_cycles,
                    priority: s.task.priority,
                    stats: s.stats,
                })
                .collect(),
        }
    }
}

/// Stop the run if the control task exceeded its miss tolerance.
fn check_tolerance(slot: &TaskSlot, tolerance: u32, run_state: &RunState) -> bool {
    let misses = slot.stats.consecutive_misses;
    if misses <= tolerance {
        return false;
    }
    let err = TeleopError::DeadlineMiss {
        task: slot.task.name.clone(),
        misses,
        tolerance,
    };
    error!("{err}");
    run_state.stop_with(StopReason::Fault(err));
    true
}

#[inline]
fn release_offset(tick_ns: u64, tick: u64) -> Duration {
    Duration::from_nanos(tick_ns.saturating_mul(tick))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sched::task::from_fn;

    fn manual(tick_limit: u64) -> PeriodicTaskScheduler<ManualClock> {
        PeriodicTaskScheduler::with_clock(
            SchedulerConfig {
                tick_limit: Some(tick_limit),
                ..Default::default()
            },
            Arc::new(ManualClock::new()),
        )
    }

    #[test]
    fn gcd_and_collision() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(7, 1), 1);
        assert!(may_collide(1, 1000, None));
        assert!(may_collide(4, 6, Some(12)));
        assert!(!may_collide(4, 6, Some(11)));
        assert!(!may_collide(u64::MAX, u64::MAX - 1, Some(u64::MAX)));
    }

    #[test]
    fn config_from_section() {
        let section = SchedulerSection {
            tick_us: 500,
            deadline_miss_tolerance: 0,
            cpu_core: Some(3),
            status_interval_cycles: 10,
        };
        let cfg = SchedulerConfig::from(&section);
        assert_eq!(cfg.tick, Duration::from_micros(500));
        assert_eq!(cfg.deadline_miss_tolerance, 0);
        assert_eq!(cfg.cpu_core, Some(3));
        assert_eq!(cfg.tick_limit, None);
    }

    #[test]
    fn start_without_tasks_is_invalid_state() {
        let mut sched = manual(10);
        assert!(matches!(sched.start(true), Err(TeleopError::InvalidState(_))));
        assert!(matches!(sched.join(), Err(TeleopError::InvalidState(_))));
    }

    #[test]
    fn report_lists_tasks_in_registration_order() {
        let mut sched = manual(4);
        let low = sched
            .add_task(ScheduledTask::new("low", 2, 10, from_fn(|_| Ok(()))))
            .unwrap();
        let high = sched
            .add_task(ScheduledTask::new("high", 1, 90, from_fn(|_| Ok(()))))
            .unwrap();
        sched.start(true).unwrap();

        let report = sched.join().unwrap();
        assert_eq!(report.ticks, 4);
        assert_eq!(report.stop_reason, StopReason::TickLimitReached);
        assert_eq!(report.task(low).unwrap().name, "low");
        assert_eq!(report.task(low).unwrap().stats.invocations, 2);
        assert_eq!(report.task(high).unwrap().stats.invocations, 4);
    }

    #[test]
    fn task_table_capacity() {
        let mut sched = manual(1);
        for i in 0..MAX_TASKS {
            sched
                .add_task(ScheduledTask::new(
                    format!("t{i}"),
                    1,
                    i as i32 + 1,
                    from_fn(|_| Ok(())),
                ))
                .unwrap();
        }
        let err = sched
            .add_task(ScheduledTask::new("extra", 1, 50, from_fn(|_| Ok(()))))
            .unwrap_err();
        assert!(err.to_string().contains("task table full"));
    }

    #[test]
    fn panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
