//! Teleop session boundary.
//!
//! A [`TeleopSession`] is one local (leader) / remote (follower) robot pair.
//! The vendor link implements it; [`sim::SimulatedSession`] is the
//! in-process stand-in used without hardware.

pub mod sim;

use omni_common::consts::CART_DOF;
use omni_common::teleop::axis_lock::AxisLockCommand;
use omni_common::teleop::config::RobotConfig;
use omni_common::teleop::error::TeleopError;
use omni_common::teleop::{JointPosture, WrenchLimits};
use tracing::info;

pub use sim::{SimProbe, SimulatedSession};

/// Interface of a teleoperation link consumed by the control loop.
///
/// # Lifecycle
///
/// 1. `enable()` then `init()`, in that order, before any control step.
/// 2. `set_null_space_posture()` / `set_max_wrench()` - before scheduling.
/// 3. `run_control_step()` - once per control tick while `is_operational()`.
/// 4. `stop()` - when the control loop exits.
///
/// # Timing Contracts
///
/// | Operation            | Max Duration  | RT Constraint |
/// |----------------------|---------------|---------------|
/// | `enable()`/`init()`  | seconds       | None (pre-RT) |
/// | `is_operational()`   | negligible    | **HARD**      |
/// | `run_control_step()` | base tick     | **HARD**      |
/// | `stop()`             | 1 second      | None          |
pub trait TeleopSession: Send {
    /// Diagnostic label, usually `local->remote`.
    fn label(&self) -> &str;

    /// Bring both robots out of the idle state. Idempotent.
    ///
    /// # Errors
    /// `SetupError` if the link cannot reach the ready state.
    fn enable(&mut self) -> Result<(), TeleopError>;

    /// Initialize the teleop controller. Idempotent; requires `enable()`.
    fn init(&mut self) -> Result<(), TeleopError>;

    /// Preferred redundancy-resolution posture [rad]. Range checks are the
    /// link's business.
    fn set_null_space_posture(&mut self, posture: &JointPosture) -> Result<(), TeleopError>;

    /// Remote contact wrench ceiling `[Fx, Fy, Fz, Mx, My, Mz]` [N, Nm].
    fn set_max_wrench(&mut self, limits: &WrenchLimits) -> Result<(), TeleopError>;

    /// Non-blocking health check. `false` means a fault occurred and no
    /// further control steps may be issued.
    fn is_operational(&self) -> bool;

    /// Execute exactly one control update with the given lock state.
    fn run_control_step(&mut self, lock: &AxisLockCommand) -> Result<(), TeleopError>;

    /// Stop both robots.
    fn stop(&mut self);

    /// Try to clear a latched fault.
    fn clear_fault(&mut self) -> Result<(), TeleopError>;
}

/// Reject negative or non-finite wrench limits.
pub fn check_wrench(limits: &WrenchLimits) -> Result<(), TeleopError> {
    match limits.iter().position(|w| !w.is_finite() || *w < 0.0) {
        Some(i) => Err(TeleopError::invalid(format!(
            "max wrench component {i} of {CART_DOF} is invalid: {}",
            limits[i]
        ))),
        None => Ok(()),
    }
}

/// Run the setup sequence on one session.
///
/// enable → init → null-space posture → max remote wrench. Any failure is
/// reported as `SetupError` for this link.
pub fn prepare_session<S>(session: &mut S, robot: &RobotConfig) -> Result<(), TeleopError>
where
    S: TeleopSession + ?Sized,
{
    let setup_error = |label: &str, e: TeleopError| match e {
        TeleopError::SetupError { .. } => e,
        other => TeleopError::SetupError {
            link: label.to_string(),
            reason: other.to_string(),
        },
    };

    info!("Preparing teleop link {}", session.label());
    session
        .enable()
        .map_err(|e| setup_error(session.label(), e))?;
    session.init().map_err(|e| setup_error(session.label(), e))?;
    session
        .set_null_space_posture(&robot.null_space_posture)
        .map_err(|e| setup_error(session.label(), e))?;
    session
        .set_max_wrench(&robot.max_remote_wrench)
        .map_err(|e| setup_error(session.label(), e))?;
    info!("Teleop link {} ready", session.label());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrench_validation() {
        assert!(check_wrench(&[80.0, 80.0, 80.0, 24.0, 24.0, 24.0]).is_ok());
        assert!(check_wrench(&[0.0; CART_DOF]).is_ok());

        let err = check_wrench(&[1.0, 1.0, -0.5, 1.0, 1.0, 1.0]).unwrap_err();
        assert!(matches!(err, TeleopError::InvalidArgument(ref m) if m.contains("component 2")));
        assert!(check_wrench(&[f64::NAN, 1.0, 1.0, 1.0, 1.0, 1.0]).is_err());
    }
}
