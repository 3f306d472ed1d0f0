//! Prelude module for common re-exports.
//!
//! ```rust
//! use omni_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::teleop::config::{LinkConfig, RobotConfig, SchedulerSection, TeleopConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{BASE_TICK_US, CART_DOF, JOINT_DOF, PRIORITY_MAX, PRIORITY_MIN};

// ─── Teleop Model ───────────────────────────────────────────────────
pub use crate::teleop::axis_lock::{
    AxisLockCommand, CartesianAxis, CoordinateFrame, RawAxisLockCommand,
};
pub use crate::teleop::error::TeleopError;
pub use crate::teleop::{JointPosture, WrenchLimits};
