//! Teleop config file tests.
//!
//! Loads complete and partial TOML files through `ConfigLoader`, checks
//! default filling, unknown-field rejection and validation of merged values.

use omni_common::config::{ConfigError, ConfigLoader, LogLevel};
use omni_common::teleop::config::{LinkConfig, TeleopConfig};
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn full_dual_arm_file_loads() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "teleop.toml",
        r#"
[shared]
log_level = "debug"
service_name = "dual-arm-cell"

[scheduler]
tick_us = 500
deadline_miss_tolerance = 0
cpu_core = 2
status_interval_cycles = 2000

[robot]
license_path = "/etc/omni/license.json"
null_space_posture = [0.0, -0.5, 0.0, 1.2, 0.0, 0.6, 0.0]
max_remote_wrench = [20.0, 20.0, 20.0, 5.0, 5.0, 5.0]
settle_ms = 0

[[links]]
local_sn = "Rizon4s-L1"
remote_sn = "Rizon4s-R1"

[[links]]
local_sn = "Rizon4s-L2"
remote_sn = "Rizon4s-R2"
"#,
    );

    let cfg = TeleopConfig::load(&path).unwrap();
    cfg.validate().unwrap();

    assert_eq!(cfg.shared.log_level, LogLevel::Debug);
    assert_eq!(cfg.scheduler.tick_us, 500);
    assert_eq!(cfg.scheduler.deadline_miss_tolerance, 0);
    assert_eq!(cfg.scheduler.cpu_core, Some(2));
    assert_eq!(cfg.robot.max_remote_wrench[3], 5.0);
    assert_eq!(cfg.links.len(), 2);
    assert_eq!(cfg.links[1], LinkConfig::new("Rizon4s-L2", "Rizon4s-R2"));
}

#[test]
fn minimal_file_gets_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "teleop.toml",
        r#"
[robot]
license_path = "license.json"

[[links]]
local_sn = "L"
remote_sn = "R"
"#,
    );

    let cfg = TeleopConfig::load(&path).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.shared.service_name, "omni-teleop");
    assert_eq!(cfg.scheduler.tick_us, 1000);
    assert_eq!(cfg.scheduler.status_interval_cycles, 1000);
    assert_eq!(cfg.robot.settle_ms, 3000);
}

#[test]
fn unknown_field_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "teleop.toml",
        r#"
[scheduler]
tick_us = 1000
priority_boost = true
"#,
    );

    assert!(matches!(
        TeleopConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn wrong_posture_length_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "teleop.toml",
        r#"
[robot]
license_path = "license.json"
null_space_posture = [0.0, 0.0, 0.0]
"#,
    );

    assert!(matches!(
        TeleopConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn missing_license_fails_validation() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "teleop.toml",
        r#"
[[links]]
local_sn = "L"
remote_sn = "R"
"#,
    );

    let cfg = TeleopConfig::load(&path).unwrap();
    match cfg.validate() {
        Err(ConfigError::ValidationError(msg)) => assert!(msg.contains("license_path")),
        other => panic!("expected ValidationError, got {other:?}"),
    }
}
