//! System-wide constants for the omni teleop workspace.
//!
//! Single source of truth for all numeric limits and defaults.
//! Imported by all crates; values are defined here only.

/// Robot joint-space degrees of freedom (7-DOF redundant arm).
pub const JOINT_DOF: usize = 7;

/// Robot Cartesian-space degrees of freedom (3 linear + 3 angular).
pub const CART_DOF: usize = 6;

/// Lockable axes per group (translation or rotation).
pub const AXIS_COUNT: usize = 3;

/// Default scheduler base tick in microseconds (1 kHz = 1000 µs).
pub const BASE_TICK_US: u64 = 1000;

/// Smallest accepted base tick [µs].
pub const TICK_US_MIN: u64 = 100;

/// Largest accepted base tick [µs].
pub const TICK_US_MAX: u64 = 100_000;

/// Lowest task priority (SCHED_FIFO minimum on Linux).
pub const PRIORITY_MIN: i32 = 1;

/// Highest task priority (SCHED_FIFO maximum on Linux).
pub const PRIORITY_MAX: i32 = 99;

/// Consecutive control-task deadline misses tolerated before a fault.
pub const DEADLINE_MISS_TOLERANCE_DEFAULT: u32 = 3;

/// Capacity of the scheduler task table.
pub const MAX_TASKS: usize = 16;

/// Default auxiliary status interval [ticks] (1 s at 1 kHz).
pub const STATUS_INTERVAL_DEFAULT: u64 = 1000;

/// Default wait after setup for the elbow posture to settle [ms].
pub const SETTLE_MS_DEFAULT: u64 = 3000;

/// Length of one scripted axis-lock phase [s].
pub const AXIS_LOCK_PHASE_SECS: u64 = 5;

/// Preferred null-space joint positions [rad].
pub const DEFAULT_NULL_SPACE_POSTURE: [f64; JOINT_DOF] =
    [-0.67, -0.98, 0.89, 1.55, -0.85, 0.54, 0.46];

/// Maximum contact wrench of the remote robot [N, N, N, Nm, Nm, Nm].
pub const DEFAULT_MAX_REMOTE_WRENCH: [f64; CART_DOF] = [80.0, 80.0, 80.0, 24.0, 24.0, 24.0];

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/omni_teleop.toml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert_eq!(CART_DOF, 2 * AXIS_COUNT);
        assert!(TICK_US_MIN <= BASE_TICK_US && BASE_TICK_US <= TICK_US_MAX);
        assert!(PRIORITY_MIN < PRIORITY_MAX);
        assert!(MAX_TASKS >= 2);
    }

    #[test]
    fn default_wrench_is_non_negative() {
        assert!(DEFAULT_MAX_REMOTE_WRENCH.iter().all(|w| *w >= 0.0));
    }
}
