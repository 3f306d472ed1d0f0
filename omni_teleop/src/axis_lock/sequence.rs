//! Scripted axis-lock walk-through.
//!
//! Fourteen phases of [`AXIS_LOCK_PHASE_SECS`] each:
//!
//! | Phase  | Command                                       |
//! |--------|-----------------------------------------------|
//! | 0..=5  | TCP frame, only X, Y, Z, Rx, Ry, Rz floating  |
//! | 6      | TCP frame, all axes floating                  |
//! | 7..=12 | WORLD frame, only X, Y, Z, Rx, Ry, Rz floating|
//! | 13     | WORLD frame, all axes floating (held forever) |

use std::sync::Arc;
use std::time::Duration;

use omni_common::consts::AXIS_LOCK_PHASE_SECS;
use omni_common::teleop::axis_lock::{AxisLockCommand, CartesianAxis, CoordinateFrame};
use omni_common::teleop::error::TeleopError;
use tracing::info;

use super::AxisLockController;
use crate::sched::{PeriodicTask, TickContext};

/// Time-indexed axis-lock script.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisLockSequence;

impl AxisLockSequence {
    pub const PHASES: usize = 14;

    /// Phase active after `elapsed`. Phase `k` covers whole seconds
    /// `(5k, 5(k+1)]`; phase 0 also covers second 0.
    pub fn phase_index(elapsed: Duration) -> usize {
        let secs = elapsed.as_secs();
        let phase = secs.saturating_sub(1) / AXIS_LOCK_PHASE_SECS;
        phase.min(Self::PHASES as u64 - 1) as usize
    }

    pub fn command_for_phase(phase: usize) -> AxisLockCommand {
        let per_frame = CartesianAxis::ALL.len();
        match phase {
            p if p < per_frame => {
                AxisLockCommand::floating_only(CoordinateFrame::Tcp, CartesianAxis::ALL[p])
            }
            p if p == per_frame => AxisLockCommand::unlocked(CoordinateFrame::Tcp),
            p if p < 2 * per_frame + 1 => AxisLockCommand::floating_only(
                CoordinateFrame::World,
                CartesianAxis::ALL[p - per_frame - 1],
            ),
            _ => AxisLockCommand::unlocked(CoordinateFrame::World),
        }
    }

    pub fn command_at(elapsed: Duration) -> AxisLockCommand {
        Self::command_for_phase(Self::phase_index(elapsed))
    }
}

/// Auxiliary task driving the controller through [`AxisLockSequence`].
///
/// Only phase changes are written, so the controller generation counts
/// phases.
#[derive(Debug)]
pub struct ScriptedLockTask {
    controller: Arc<AxisLockController>,
    current_phase: Option<usize>,
}

impl ScriptedLockTask {
    pub fn new(controller: Arc<AxisLockController>) -> Self {
        Self {
            controller,
            current_phase: None,
        }
    }

    pub fn current_phase(&self) -> Option<usize> {
        self.current_phase
    }
}

impl PeriodicTask for ScriptedLockTask {
    fn run(&mut self, ctx: &TickContext<'_>) -> Result<(), TeleopError> {
        let phase = AxisLockSequence::phase_index(ctx.elapsed);
        if self.current_phase != Some(phase) {
            let cmd = AxisLockSequence::command_for_phase(phase);
            self.controller.set_command(cmd);
            self.current_phase = Some(phase);
            info!(
                "Scripted axis lock phase {}/{}: {cmd}",
                phase + 1,
                AxisLockSequence::PHASES
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_boundaries() {
        let s = Duration::from_secs;
        assert_eq!(AxisLockSequence::phase_index(Duration::ZERO), 0);
        assert_eq!(AxisLockSequence::phase_index(s(5)), 0);
        assert_eq!(AxisLockSequence::phase_index(s(6)), 1);
        assert_eq!(AxisLockSequence::phase_index(s(10)), 1);
        assert_eq!(AxisLockSequence::phase_index(s(11)), 2);
        assert_eq!(AxisLockSequence::phase_index(s(70)), 13);
        assert_eq!(AxisLockSequence::phase_index(s(10_000)), 13);
    }

    #[test]
    fn phase_commands() {
        let tcp_x = AxisLockSequence::command_for_phase(0);
        assert_eq!(tcp_x.frame, CoordinateFrame::Tcp);
        assert!(!tcp_x.is_locked(CartesianAxis::X));
        assert_eq!(tcp_x.locked_count(), 5);

        let tcp_rz = AxisLockSequence::command_for_phase(5);
        assert!(!tcp_rz.is_locked(CartesianAxis::Rz));
        assert!(tcp_rz.is_locked(CartesianAxis::X));

        assert_eq!(
            AxisLockSequence::command_for_phase(6),
            AxisLockCommand::unlocked(CoordinateFrame::Tcp)
        );

        let world_x = AxisLockSequence::command_for_phase(7);
        assert_eq!(world_x.frame, CoordinateFrame::World);
        assert!(!world_x.is_locked(CartesianAxis::X));

        let world_rz = AxisLockSequence::command_for_phase(12);
        assert!(!world_rz.is_locked(CartesianAxis::Rz));
        assert_eq!(world_rz.locked_count(), 5);

        assert_eq!(
            AxisLockSequence::command_for_phase(13),
            AxisLockCommand::unlocked(CoordinateFrame::World)
        );
        assert_eq!(
            AxisLockSequence::command_for_phase(99),
            AxisLockCommand::unlocked(CoordinateFrame::World)
        );
    }
}
