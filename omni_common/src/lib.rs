//! Omni Teleop Common Library
//!
//! Shared constants, configuration loading and the teleoperation data model
//! used by every crate in the workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - System-wide limits and defaults
//! - [`config`] - Configuration loading traits and types
//! - [`teleop`] - Axis-lock model, teleop configuration and error taxonomy
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use omni_common::prelude::*;
//!
//! let cmd = AxisLockCommand::floating_only(CoordinateFrame::Tcp, CartesianAxis::X);
//! assert!(cmd.is_locked(CartesianAxis::Y));
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
pub mod teleop;
