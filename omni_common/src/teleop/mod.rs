//! Teleoperation data model shared between the runtime and its tools.
//!
//! Axis-lock commands, teleop configuration and the error taxonomy.

pub mod axis_lock;
pub mod config;
pub mod error;

use crate::consts::{CART_DOF, JOINT_DOF};

/// Preferred joint positions for null-space posture control [rad].
pub type JointPosture = [f64; JOINT_DOF];

/// Force/torque ceiling `[fx, fy, fz, mx, my, mz]` [N, Nm].
pub type WrenchLimits = [f64; CART_DOF];
