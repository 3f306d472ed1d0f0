//! Periodic tasks of the teleop loop.
//!
//! [`TeleopControlTask`] is the control task (period 1, highest priority);
//! [`StatusTask`] is an auxiliary low-rate reporter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use omni_common::teleop::error::TeleopError;
use tracing::{debug, info};

use crate::axis_lock::AxisLockController;
use crate::sched::{PeriodicTask, TickContext};
use crate::session::TeleopSession;

// ─── Control Task ───────────────────────────────────────────────────

/// One control step per tick on every session, with the current lock state.
///
/// Every session's health is checked before any step runs, so a fault on
/// one arm of a dual-arm cell also halts the other.
pub struct TeleopControlTask<S: TeleopSession> {
    sessions: Vec<S>,
    controller: Arc<AxisLockController>,
    steps: Arc<AtomicU64>,
    seen_generation: Option<u64>,
}

impl<S: TeleopSession> TeleopControlTask<S> {
    /// # Errors
    /// `InvalidArgument` if `sessions` is empty.
    pub fn new(sessions: Vec<S>, controller: Arc<AxisLockController>) -> Result<Self, TeleopError> {
        if sessions.is_empty() {
            return Err(TeleopError::invalid("control task needs at least one session"));
        }
        Ok(Self {
            sessions,
            controller,
            steps: Arc::new(AtomicU64::new(0)),
            seen_generation: None,
        })
    }

    /// Counter of completed control ticks, readable from other tasks.
    pub fn steps(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.steps)
    }

    pub fn sessions(&self) -> &[S] {
        &self.sessions
    }
}

impl<S: TeleopSession> PeriodicTask for TeleopControlTask<S> {
    fn run(&mut self, ctx: &TickContext<'_>) -> Result<(), TeleopError> {
        if let Some(faulted) = self.sessions.iter().find(|s| !s.is_operational()) {
            return Err(TeleopError::OperationalFault {
                link: faulted.label().to_string(),
            });
        }

        let (generation, lock) = self.controller.snapshot();
        if self.seen_generation != Some(generation) {
            debug!("Control loop using axis lock {lock} from tick {}", ctx.tick);
            self.seen_generation = Some(generation);
        }

        for session in &mut self.sessions {
            session.run_control_step(&lock)?;
        }
        self.steps.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn on_stop(&mut self) {
        for session in &mut self.sessions {
            session.stop();
        }
        info!(
            "Control loop stopped after {} step(s), {} session(s) stopped",
            self.steps.load(Ordering::Relaxed),
            self.sessions.len()
        );
    }
}

// ─── Status Task ────────────────────────────────────────────────────

/// Logs the active lock state and control-step progress.
#[derive(Debug)]
pub struct StatusTask {
    controller: Arc<AxisLockController>,
    steps: Arc<AtomicU64>,
    last_steps: u64,
}

impl StatusTask {
    pub fn new(controller: Arc<AxisLockController>, steps: Arc<AtomicU64>) -> Self {
        Self {
            controller,
            steps,
            last_steps: 0,
        }
    }
}

impl PeriodicTask for StatusTask {
    fn run(&mut self, ctx: &TickContext<'_>) -> Result<(), TeleopError> {
        let steps = self.steps.load(Ordering::Relaxed);
        info!(
            "[{:>6.1}s] axis lock {} | {} control step(s) (+{})",
            ctx.elapsed.as_secs_f64(),
            self.controller.get_command(),
            steps,
            steps.saturating_sub(self.last_steps)
        );
        self.last_steps = steps;
        Ok(())
    }
}
