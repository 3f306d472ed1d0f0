//! RT thread setup for the scheduler's tick thread.
//!
//! The tick thread runs [`rt_setup`] once before its first release. The
//! setup is an ordered plan of [`RtStep`]s:
//!
//! | Step           | Call                                         |
//! |----------------|----------------------------------------------|
//! | `LockMemory`   | `mlockall(MCL_CURRENT \| MCL_FUTURE)`, then stack prefault |
//! | `PinCpu(n)`    | `sched_setaffinity` to core `n` (only if configured) |
//! | `FifoPriority` | `sched_setscheduler(SCHED_FIFO, p)`          |
//!
//! Without the `rt` feature the plan is still built and logged but no step
//! touches the OS, so tests and simulation runs need no privileges.

use std::fmt;

use omni_common::consts::{PRIORITY_MAX, PRIORITY_MIN};
use omni_common::teleop::error::TeleopError;
use tracing::debug;

/// Stack touched after locking memory.
#[cfg(feature = "rt")]
const PREFAULT_STACK_BYTES: usize = 512 * 1024;

/// One step of the tick thread's RT setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtStep {
    LockMemory,
    PinCpu(usize),
    FifoPriority(i32),
}

impl fmt::Display for RtStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockMemory => f.write_str("lock memory"),
            Self::PinCpu(cpu) => write!(f, "pin to CPU {cpu}"),
            Self::FifoPriority(p) => write!(f, "SCHED_FIFO priority {p}"),
        }
    }
}

/// Valid task priority range `(min, max)`.
///
/// With the `rt` feature this is the OS SCHED_FIFO range; otherwise the
/// Linux defaults `(1, 99)`.
pub fn priority_range() -> (i32, i32) {
    #[cfg(feature = "rt")]
    {
        let min = unsafe { libc::sched_get_priority_min(libc::SCHED_FIFO) };
        let max = unsafe { libc::sched_get_priority_max(libc::SCHED_FIFO) };
        if min >= 0 && max > min {
            return (min, max);
        }
    }
    (PRIORITY_MIN, PRIORITY_MAX)
}

/// Steps [`rt_setup`] performs, in order.
pub fn rt_plan(cpu_core: Option<usize>, priority: i32) -> heapless::Vec<RtStep, 3> {
    let mut plan = heapless::Vec::new();
    // Capacity 3 covers every combination.
    let _ = plan.push(RtStep::LockMemory);
    if let Some(cpu) = cpu_core {
        let _ = plan.push(RtStep::PinCpu(cpu));
    }
    let _ = plan.push(RtStep::FifoPriority(priority));
    plan
}

/// Run the full setup plan on the calling thread, stopping at the first
/// failing step.
pub fn rt_setup(cpu_core: Option<usize>, priority: i32) -> Result<(), TeleopError> {
    for step in rt_plan(cpu_core, priority) {
        apply(step).map_err(|reason| TeleopError::RtSetup(format!("{step} failed: {reason}")))?;
        debug!("RT setup: {step}");
    }
    Ok(())
}

#[cfg(feature = "rt")]
fn apply(step: RtStep) -> Result<(), String> {
    match step {
        RtStep::LockMemory => {
            use nix::sys::mman::{MlockallFlags, mlockall};
            mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
                .map_err(|e| e.to_string())?;
            prefault_stack();
            Ok(())
        }
        RtStep::PinCpu(cpu) => {
            use nix::sched::{CpuSet, sched_setaffinity};
            use nix::unistd::Pid;
            let mut set = CpuSet::new();
            set.set(cpu)
                .and_then(|()| sched_setaffinity(Pid::from_raw(0), &set))
                .map_err(|e| e.to_string())
        }
        RtStep::FifoPriority(priority) => {
            let param = libc::sched_param {
                sched_priority: priority,
            };
            if unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) } != 0 {
                return Err(std::io::Error::last_os_error().to_string());
            }
            Ok(())
        }
    }
}

#[cfg(not(feature = "rt"))]
fn apply(_step: RtStep) -> Result<(), String> {
    Ok(())
}

#[cfg(feature = "rt")]
fn prefault_stack() {
    let mut buf = [0u8; PREFAULT_STACK_BYTES];
    for byte in buf.iter_mut() {
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}
