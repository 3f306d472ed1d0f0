//! # Omni Teleop
//!
//! Runs the teleoperation loop for one or more local/remote robot pairs.
//!
//! Supports two axis-lock input modes:
//! - **Console** (`--mode console`): operator toggles axes with single keys
//!   on stdin; a status task logs the lock state once per interval.
//! - **Scripted** (`--mode scripted`): the lock state walks through the
//!   fixed 14-phase sequence, 5 s per phase.
//!
//! Links are prepared (enable, init, null-space posture, max wrench), given
//! time to settle, then the control task runs every tick at the highest
//! priority until Ctrl-C, the `--duration-s` limit, or a fault.

use clap::{Parser, ValueEnum};
use omni_common::config::{ConfigError, ConfigLoader, LogLevel};
use omni_common::consts::DEFAULT_CONFIG_PATH;
use omni_common::teleop::config::{LinkConfig, TeleopConfig};
use omni_teleop::axis_lock::{AxisLockController, ScriptedLockTask, spawn_console};
use omni_teleop::control::{StatusTask, TeleopControlTask};
use omni_teleop::sched::{PeriodicTaskScheduler, RunReport, ScheduledTask, SchedulerConfig, StopReason};
use omni_teleop::session::{SimulatedSession, prepare_session};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Omni Teleop: axis-lock teleoperation loop
#[derive(Parser, Debug)]
#[command(name = "omni_teleop")]
#[command(version)]
#[command(about = "Real-time teleoperation loop with operator axis locking")]
struct Args {
    /// Teleop configuration TOML (default: config/omni_teleop.toml if present).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial number of a local robot. Repeat for dual-arm cells.
    #[arg(short = 'l', long = "local-sn", value_name = "SN")]
    local_sn: Vec<String>,

    /// Serial number of a remote robot, paired with --local-sn in order.
    #[arg(short = 'r', long = "remote-sn", value_name = "SN")]
    remote_sn: Vec<String>,

    /// License config file.
    #[arg(short = 'c', long, value_name = "FILE")]
    license: Option<String>,

    /// Axis-lock input mode.
    #[arg(long, value_enum, default_value_t = Mode::Console)]
    mode: Mode,

    /// Stop after this many seconds (default: run until Ctrl-C).
    #[arg(long, value_name = "SECS")]
    duration_s: Option<u64>,

    /// Latch a simulated robot fault after this many control steps.
    #[arg(long, value_name = "STEPS")]
    sim_fault_after: Option<u64>,

    /// CPU core to pin the tick thread to.
    #[arg(long)]
    cpu_core: Option<usize>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Console,
    Scripted,
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args);
    let level = config
        .as_ref()
        .map(|cfg| cfg.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);

    info!("Omni Teleop v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|cfg| run(&args, &cfg));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Omni Teleop shutdown complete");
}

/// Load the config file and apply command-line overrides.
fn load_config(args: &Args) -> Result<TeleopConfig, ConfigError> {
    let mut cfg = match &args.config {
        Some(path) => TeleopConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            TeleopConfig::load(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => TeleopConfig::default(),
    };

    if !args.local_sn.is_empty() || !args.remote_sn.is_empty() {
        if args.local_sn.len() != args.remote_sn.len() {
            return Err(ConfigError::ValidationError(format!(
                "{} --local-sn but {} --remote-sn given",
                args.local_sn.len(),
                args.remote_sn.len()
            )));
        }
        cfg.links = args
            .local_sn
            .iter()
            .zip(&args.remote_sn)
            .map(|(local, remote)| LinkConfig::new(local.as_str(), remote.as_str()))
            .collect();
    }
    if let Some(license) = &args.license {
        cfg.robot.license_path = license.clone();
    }
    if args.cpu_core.is_some() {
        cfg.scheduler.cpu_core = args.cpu_core;
    }

    cfg.validate()?;
    Ok(cfg)
}

fn run(args: &Args, cfg: &TeleopConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Config OK: service={}, links={}, tick={}µs, mode={:?}",
        cfg.shared.service_name,
        cfg.links.len(),
        cfg.scheduler.tick_us,
        args.mode
    );

    // ── Links ──
    let mut sessions = Vec::with_capacity(cfg.links.len());
    for link in &cfg.links {
        let mut session =
            SimulatedSession::connect(link, &cfg.robot.license_path, args.sim_fault_after)?;
        prepare_session(&mut session, &cfg.robot)?;
        sessions.push(session);
    }
    if cfg.robot.settle_ms > 0 {
        info!("Waiting {} ms for the null-space posture to settle", cfg.robot.settle_ms);
        std::thread::sleep(Duration::from_millis(cfg.robot.settle_ms));
    }

    // ── Scheduler ──
    let mut sched_config = SchedulerConfig::from(&cfg.scheduler);
    sched_config.tick_limit = args
        .duration_s
        .map(|secs| secs.saturating_mul(1_000_000) / cfg.scheduler.tick_us);
    let mut scheduler = PeriodicTaskScheduler::new(sched_config);
    let (min_priority, max_priority) = (scheduler.min_priority(), scheduler.max_priority());

    let controller = Arc::new(AxisLockController::new());
    let control = TeleopControlTask::new(sessions, Arc::clone(&controller))?;
    let steps = control.steps();
    scheduler.add_task(ScheduledTask::new("teleop-control", 1, max_priority, control))?;

    let run_state = scheduler.run_state();
    match args.mode {
        Mode::Console => {
            scheduler.add_task(ScheduledTask::new(
                "status",
                cfg.scheduler.status_interval_cycles,
                min_priority,
                StatusTask::new(Arc::clone(&controller), steps),
            ))?;
            // Detached: blocks on stdin until the process exits.
            let _console = spawn_console(
                BufReader::new(std::io::stdin()),
                Arc::clone(&controller),
                Arc::clone(&run_state),
            )?;
        }
        Mode::Scripted => {
            scheduler.add_task(ScheduledTask::new(
                "axis-lock-script",
                cfg.scheduler.status_interval_cycles,
                min_priority,
                ScriptedLockTask::new(Arc::clone(&controller)),
            ))?;
        }
    }

    // Setup signal handler for graceful shutdown.
    let signal_state = Arc::clone(&run_state);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        signal_state.request_stop();
    })?;

    info!("Starting scheduler (control priority {max_priority}, aux priority {min_priority})");
    scheduler.start(true)?;
    let report = scheduler.join()?;
    log_report(report);

    match &report.stop_reason {
        StopReason::Fault(e) => Err(e.clone().into()),
        StopReason::Requested | StopReason::TickLimitReached => Ok(()),
    }
}

fn log_report(report: &RunReport) {
    info!(
        "Run finished after {} tick(s) ({} skipped): {:?}",
        report.ticks, report.skipped_ticks, report.stop_reason
    );
    for task in &report.tasks {
        let s = &task.stats;
        info!(
            "Task '{}' (period {}, priority {}): {} run(s), avg {} ns, max {} ns, {} overrun(s), {} skipped",
            task.name,
            task.period_cycles,
            task.priority,
            s.invocations,
            s.avg_ns(),
            s.max_ns,
            s.overruns,
            s.skipped
        );
        if let Some(fault) = &s.last_fault {
            warn!(
                "Task '{}' last fault{}: {fault}",
                task.name,
                if s.disabled { " (disabled)" } else { "" }
            );
        }
    }
}

fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        level.as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
