//! Simulated teleop link.
//!
//! Enforces the enable → init ordering, records every applied lock command
//! and can latch a fault after a fixed number of control steps. A shared
//! [`SimProbe`] exposes the link state to other threads (tests, status
//! output) while the session itself is owned by the control task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

use omni_common::teleop::axis_lock::{AxisLockCommand, LockBits};
use omni_common::teleop::config::LinkConfig;
use omni_common::teleop::error::TeleopError;
use omni_common::teleop::{JointPosture, WrenchLimits};
use tracing::{debug, warn};

use super::{TeleopSession, check_wrench};

/// Lifecycle phase of a simulated link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    Connected,
    Enabled,
    Ready,
    Stopped,
}

/// No command applied yet.
const NO_LOCK: u8 = 0xFF;

/// Thread-safe view of a simulated link.
#[derive(Debug)]
pub struct SimProbe {
    steps: AtomicU64,
    last_lock: AtomicU8,
    faulted: AtomicBool,
    stopped: AtomicBool,
}

impl SimProbe {
    fn new() -> Self {
        Self {
            steps: AtomicU64::new(0),
            last_lock: AtomicU8::new(NO_LOCK),
            faulted: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Control steps executed so far.
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Acquire)
    }

    /// Lock command of the most recent control step.
    pub fn last_lock(&self) -> Option<AxisLockCommand> {
        match self.last_lock.load(Ordering::Acquire) {
            NO_LOCK => None,
            bits => Some(AxisLockCommand::unpack(LockBits::from_bits_truncate(bits))),
        }
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Latch a robot-side fault, as if the remote robot hit a limit.
    pub fn inject_fault(&self) {
        self.faulted.store(true, Ordering::Release);
    }
}

/// In-process stand-in for a local/remote robot pair.
#[derive(Debug)]
pub struct SimulatedSession {
    link: LinkConfig,
    label: String,
    license_path: String,
    phase: LinkPhase,
    fault_after: Option<u64>,
    null_space_posture: Option<JointPosture>,
    max_wrench: Option<WrenchLimits>,
    probe: Arc<SimProbe>,
}

impl SimulatedSession {
    /// Open a link to `link`. `fault_after` latches a fault once that many
    /// control steps have run.
    ///
    /// # Errors
    /// `SetupError` for an invalid robot pair or an empty license path.
    pub fn connect(
        link: &LinkConfig,
        license_path: &str,
        fault_after: Option<u64>,
    ) -> Result<Self, TeleopError> {
        let label = link.label();
        link.validate().map_err(|reason| TeleopError::SetupError {
            link: label.clone(),
            reason,
        })?;
        if license_path.trim().is_empty() {
            return Err(TeleopError::SetupError {
                link: label,
                reason: "license path is empty".to_string(),
            });
        }
        debug!("Simulated link {label} connected");
        Ok(Self {
            link: link.clone(),
            label,
            license_path: license_path.to_string(),
            phase: LinkPhase::Connected,
            fault_after,
            null_space_posture: None,
            max_wrench: None,
            probe: Arc::new(SimProbe::new()),
        })
    }

    pub fn probe(&self) -> Arc<SimProbe> {
        Arc::clone(&self.probe)
    }

    pub fn phase(&self) -> LinkPhase {
        self.phase
    }

    pub fn link(&self) -> &LinkConfig {
        &self.link
    }

    pub fn license_path(&self) -> &str {
        &self.license_path
    }

    pub fn null_space_posture(&self) -> Option<&JointPosture> {
        self.null_space_posture.as_ref()
    }

    pub fn max_wrench(&self) -> Option<&WrenchLimits> {
        self.max_wrench.as_ref()
    }

    fn setup_error(&self, reason: &str) -> TeleopError {
        TeleopError::SetupError {
            link: self.label.clone(),
            reason: reason.to_string(),
        }
    }
}

impl TeleopSession for SimulatedSession {
    fn label(&self) -> &str {
        &self.label
    }

    fn enable(&mut self) -> Result<(), TeleopError> {
        if self.probe.is_faulted() {
            return Err(self.setup_error("robot is in fault state"));
        }
        if matches!(self.phase, LinkPhase::Connected | LinkPhase::Stopped) {
            self.phase = LinkPhase::Enabled;
            self.probe.stopped.store(false, Ordering::Release);
            debug!("Simulated link {} enabled", self.label);
        }
        Ok(())
    }

    fn init(&mut self) -> Result<(), TeleopError> {
        match self.phase {
            LinkPhase::Enabled => {
                self.phase = LinkPhase::Ready;
                debug!("Simulated link {} initialized", self.label);
                Ok(())
            }
            LinkPhase::Ready => Ok(()),
            LinkPhase::Connected | LinkPhase::Stopped => {
                Err(self.setup_error("init() called before enable()"))
            }
        }
    }

    fn set_null_space_posture(&mut self, posture: &JointPosture) -> Result<(), TeleopError> {
        self.null_space_posture = Some(*posture);
        Ok(())
    }

    fn set_max_wrench(&mut self, limits: &WrenchLimits) -> Result<(), TeleopError> {
        check_wrench(limits)?;
        self.max_wrench = Some(*limits);
        Ok(())
    }

    fn is_operational(&self) -> bool {
        self.phase == LinkPhase::Ready && !self.probe.is_faulted()
    }

    fn run_control_step(&mut self, lock: &AxisLockCommand) -> Result<(), TeleopError> {
        if self.phase != LinkPhase::Ready {
            return Err(TeleopError::InvalidState("control step before init()"));
        }
        if self.probe.is_faulted() {
            return Err(TeleopError::OperationalFault {
                link: self.label.clone(),
            });
        }

        let steps = self.probe.steps.fetch_add(1, Ordering::AcqRel) + 1;
        self.probe
            .last_lock
            .store(lock.pack().bits(), Ordering::Release);

        if self.fault_after.is_some_and(|n| steps >= n) {
            warn!("Simulated link {} faulted after {steps} step(s)", self.label);
            self.probe.inject_fault();
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.phase != LinkPhase::Stopped {
            self.phase = LinkPhase::Stopped;
            self.probe.stopped.store(true, Ordering::Release);
            debug!("Simulated link {} stopped", self.label);
        }
    }

    fn clear_fault(&mut self) -> Result<(), TeleopError> {
        if self.probe.faulted.swap(false, Ordering::AcqRel) {
            self.fault_after = None;
            debug!("Simulated link {} fault cleared", self.label);
        }
        Ok(())
    }
}
