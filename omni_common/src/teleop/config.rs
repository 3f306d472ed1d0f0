//! Teleop runtime configuration.
//!
//! Loaded from TOML at startup and overridden by command-line flags.
//! Every section has defaults so a file only needs what differs.
//!
//! ```toml
//! [shared]
//! service_name = "omni-teleop"
//!
//! [scheduler]
//! tick_us = 1000
//! deadline_miss_tolerance = 3
//!
//! [robot]
//! license_path = "/etc/omni/license.json"
//! max_remote_wrench = [80.0, 80.0, 80.0, 24.0, 24.0, 24.0]
//!
//! [[links]]
//! local_sn = "Rizon4s-123456"
//! remote_sn = "Rizon4s-654321"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{JointPosture, WrenchLimits};
use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    BASE_TICK_US, DEADLINE_MISS_TOLERANCE_DEFAULT, DEFAULT_MAX_REMOTE_WRENCH,
    DEFAULT_NULL_SPACE_POSTURE, SETTLE_MS_DEFAULT, STATUS_INTERVAL_DEFAULT, TICK_US_MAX,
    TICK_US_MIN,
};

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete teleop configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeleopConfig {
    #[serde(default)]
    pub shared: SharedConfig,

    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub robot: RobotConfig,

    /// Local/remote robot pairs. Dual-arm cells list two.
    #[serde(default)]
    pub links: Vec<LinkConfig>,
}

impl TeleopConfig {
    /// Validate all sections. Call after command-line overrides are merged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.scheduler.validate().map_err(ConfigError::ValidationError)?;
        self.robot.validate().map_err(ConfigError::ValidationError)?;

        if self.links.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one [[links]] entry is required".to_string(),
            ));
        }
        for (i, link) in self.links.iter().enumerate() {
            link.validate()
                .map_err(|e| ConfigError::ValidationError(format!("links[{i}]: {e}")))?;
        }
        Ok(())
    }
}

// ─── Scheduler ──────────────────────────────────────────────────────

/// `[scheduler]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerSection {
    /// Base tick [µs] (default: 1000 = 1 kHz).
    #[serde(default = "default_tick_us")]
    pub tick_us: u64,

    /// Consecutive control-task deadline misses tolerated (default: 3).
    #[serde(default = "default_tolerance")]
    pub deadline_miss_tolerance: u32,

    /// CPU core to pin the tick thread to (RT builds only).
    #[serde(default)]
    pub cpu_core: Option<usize>,

    /// Auxiliary status/console task period [ticks] (default: 1000).
    #[serde(default = "default_status_interval")]
    pub status_interval_cycles: u64,
}

fn default_tick_us() -> u64 {
    BASE_TICK_US
}
fn default_tolerance() -> u32 {
    DEADLINE_MISS_TOLERANCE_DEFAULT
}
fn default_status_interval() -> u64 {
    STATUS_INTERVAL_DEFAULT
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            tick_us: default_tick_us(),
            deadline_miss_tolerance: default_tolerance(),
            cpu_core: None,
            status_interval_cycles: default_status_interval(),
        }
    }
}

impl SchedulerSection {
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_us < TICK_US_MIN || self.tick_us > TICK_US_MAX {
            return Err(format!(
                "tick_us {} out of range [{}, {}]",
                self.tick_us, TICK_US_MIN, TICK_US_MAX
            ));
        }
        if self.status_interval_cycles == 0 {
            return Err("status_interval_cycles must be positive".to_string());
        }
        Ok(())
    }

    /// Base tick as Duration.
    #[inline]
    pub fn tick(&self) -> Duration {
        Duration::from_micros(self.tick_us)
    }
}

// ─── Robot ──────────────────────────────────────────────────────────

/// `[robot]` section: settings applied to every link during setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RobotConfig {
    /// License config file; validity is checked by the robot link.
    #[serde(default)]
    pub license_path: String,

    /// Preferred null-space posture [rad].
    #[serde(default = "default_posture")]
    pub null_space_posture: JointPosture,

    /// Remote contact wrench ceiling [N, Nm].
    #[serde(default = "default_wrench")]
    pub max_remote_wrench: WrenchLimits,

    /// Wait after setup for the posture to settle [ms].
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_posture() -> JointPosture {
    DEFAULT_NULL_SPACE_POSTURE
}
fn default_wrench() -> WrenchLimits {
    DEFAULT_MAX_REMOTE_WRENCH
}
fn default_settle_ms() -> u64 {
    SETTLE_MS_DEFAULT
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            license_path: String::new(),
            null_space_posture: default_posture(),
            max_remote_wrench: default_wrench(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl RobotConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.license_path.is_empty() {
            return Err("license_path cannot be empty".to_string());
        }
        if let Some(q) = self.null_space_posture.iter().find(|q| !q.is_finite()) {
            return Err(format!("null_space_posture contains non-finite value {q}"));
        }
        if let Some(w) = self
            .max_remote_wrench
            .iter()
            .find(|w| !w.is_finite() || **w < 0.0)
        {
            return Err(format!("max_remote_wrench contains invalid value {w}"));
        }
        Ok(())
    }
}

// ─── Links ──────────────────────────────────────────────────────────

/// One local (leader) / remote (follower) robot pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkConfig {
    /// Serial number of the local robot.
    pub local_sn: String,
    /// Serial number of the remote robot.
    pub remote_sn: String,
}

impl LinkConfig {
    pub fn new(local_sn: impl Into<String>, remote_sn: impl Into<String>) -> Self {
        Self {
            local_sn: local_sn.into(),
            remote_sn: remote_sn.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.local_sn.trim().is_empty() || self.remote_sn.trim().is_empty() {
            return Err("local_sn and remote_sn cannot be empty".to_string());
        }
        if self.local_sn == self.remote_sn {
            return Err(format!(
                "local and remote robot share serial number {}",
                self.local_sn
            ));
        }
        Ok(())
    }

    /// Diagnostic label, `local->remote`.
    pub fn label(&self) -> String {
        format!("{}->{}", self.local_sn, self.remote_sn)
    }
}
