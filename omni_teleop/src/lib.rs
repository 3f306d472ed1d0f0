//! # Omni Teleop
//!
//! Real-time teleoperation loop for local/remote robot pairs with
//! operator-controlled Cartesian axis locking.
//!
//! ## Components
//!
//! 1. **PeriodicTaskScheduler** - fixed-rate dispatcher on one tick thread;
//!    due tasks run in descending priority order, overruns are skipped and
//!    the control task's deadline misses are bounded by a tolerance.
//! 2. **AxisLockController** - current axis-lock command, shared tear-free
//!    between operator input and the control task.
//! 3. **TeleopSession** - robot link boundary, with a simulated link.
//! 4. **TeleopControlTask** - one control step per tick on every link.
//!
//! ## Threads
//!
//! - `omni-tick`: scheduler loop (SCHED_FIFO with the `rt` feature).
//! - `omni-console`: operator key input (console mode only).
//! - caller: blocks in `start(true)` or polls `RunState`.

pub mod axis_lock;
pub mod clock;
pub mod control;
pub mod rt;
pub mod sched;
pub mod session;
