//! Error taxonomy for the teleop core.
//!
//! | Variant            | Raised by                          | Consequence                      |
//! |--------------------|------------------------------------|----------------------------------|
//! | `InvalidArgument`  | malformed command, bad task period | rejected at the call             |
//! | `SetupError`       | session enable/init                | scheduling never starts          |
//! | `OperationalFault` | control task health check          | scheduler stop                   |
//! | `DeadlineMiss`     | control task overrun tolerance     | scheduler stop                   |
//! | `TaskFault`        | any task body                      | stop (control) / disable (aux)   |
//! | `InvalidState`     | lifecycle misuse (start twice, …)  | rejected at the call             |
//! | `RtSetup`          | tick thread RT configuration       | scheduler stop                   |

use thiserror::Error;

/// Errors surfaced by the axis-lock model, sessions and the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeleopError {
    /// Malformed input rejected synchronously, never coerced.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A robot link could not reach the ready state.
    #[error("setup failed on link {link}: {reason}")]
    SetupError { link: String, reason: String },

    /// `is_operational()` returned false while the control loop was running.
    #[error("operational fault on link {link}")]
    OperationalFault { link: String },

    /// The control task overran its period beyond the configured tolerance.
    #[error("deadline miss on task '{task}': {misses} consecutive misses (tolerance {tolerance})")]
    DeadlineMiss {
        task: String,
        misses: u32,
        tolerance: u32,
    },

    /// A task body returned an error or panicked.
    #[error("task '{task}' faulted: {reason}")]
    TaskFault { task: String, reason: String },

    /// Operation not allowed in the current lifecycle phase.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// OS real-time setup (mlockall, affinity, SCHED_FIFO) failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),
}

impl TeleopError {
    /// Shorthand for [`TeleopError::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// True for errors that end a running control loop.
    pub const fn stops_control_loop(&self) -> bool {
        matches!(
            self,
            Self::OperationalFault { .. } | Self::DeadlineMiss { .. } | Self::TaskFault { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let err = TeleopError::DeadlineMiss {
            task: "HP periodic teleop".into(),
            misses: 4,
            tolerance: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("HP periodic teleop"));
        assert!(msg.contains('4'));
        assert!(msg.contains("tolerance 3"));
    }

    #[test]
    fn runtime_faults_stop_the_loop() {
        assert!(TeleopError::OperationalFault { link: "a".into() }.stops_control_loop());
        assert!(!TeleopError::invalid("period 0").stops_control_loop());
        assert!(!TeleopError::InvalidState("started").stops_control_loop());
    }
}
