//! Dispatch benchmark: cost of the tick loop and the control path.
//!
//! The scheduler runs on `ManualClock`, so the numbers cover dispatch,
//! bookkeeping and task bodies without any real sleeping.

use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use omni_common::teleop::axis_lock::{AxisLockCommand, CartesianAxis, CoordinateFrame};
use omni_common::teleop::config::{LinkConfig, RobotConfig};
use omni_teleop::axis_lock::AxisLockController;
use omni_teleop::clock::ManualClock;
use omni_teleop::control::TeleopControlTask;
use omni_teleop::sched::{
    PeriodicTask, PeriodicTaskScheduler, RunState, ScheduledTask, SchedulerConfig, TickContext,
    from_fn,
};
use omni_teleop::session::{SimulatedSession, prepare_session};

const TICKS: u64 = 1_000;

fn sessions(n: usize) -> Vec<SimulatedSession> {
    let robot = RobotConfig {
        license_path: "license.json".into(),
        ..Default::default()
    };
    (0..n)
        .map(|i| {
            let link = LinkConfig::new(format!("L{i}"), format!("R{i}"));
            let mut s = SimulatedSession::connect(&link, "license.json", None)
                .unwrap_or_else(|e| panic!("connect {i}: {e}"));
            prepare_session(&mut s, &robot).unwrap_or_else(|e| panic!("prepare {i}: {e}"));
            s
        })
        .collect()
}

/// One scheduler run of `TICKS` ticks with `n_tasks` trivial tasks.
///
/// Task `i` has period `i + 1`, so later tasks are due less often.
#[inline(never)]
fn run_ticks(n_tasks: usize) -> u64 {
    let mut sched = PeriodicTaskScheduler::with_clock(
        SchedulerConfig {
            tick: Duration::from_millis(1),
            tick_limit: Some(TICKS),
            ..Default::default()
        },
        Arc::new(ManualClock::new()),
    );
    for i in 0..n_tasks {
        let task = ScheduledTask::new(
            format!("task-{i}"),
            i as u64 + 1,
            90 - i as i32,
            from_fn(|ctx| {
                black_box(ctx.tick);
                Ok(())
            }),
        );
        if sched.add_task(task).is_err() {
            panic!("task {i} rejected");
        }
    }
    if let Err(e) = sched.start(true) {
        panic!("start failed: {e}");
    }
    match sched.join() {
        Ok(report) => report.ticks,
        Err(e) => panic!("join failed: {e}"),
    }
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.sample_size(50);

    for &n_tasks in &[1usize, 4, 8, 16] {
        group.bench_with_input(BenchmarkId::new("tasks", n_tasks), &n_tasks, |b, &n| {
            b.iter(|| run_ticks(n));
        });
    }

    group.finish();
}

fn bench_control_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("control_step");
    group.significance_level(0.01);
    group.sample_size(500);

    for &n_links in &[1usize, 2] {
        let controller = Arc::new(AxisLockController::with_command(
            AxisLockCommand::floating_only(CoordinateFrame::Tcp, CartesianAxis::Z),
        ));
        let mut task = TeleopControlTask::new(sessions(n_links), controller)
            .unwrap_or_else(|e| panic!("control task: {e}"));
        let run_state = RunState::new();
        let mut tick = 0u64;

        group.bench_with_input(BenchmarkId::new("links", n_links), &n_links, |b, &_n| {
            b.iter(|| {
                tick += 1;
                let ctx = TickContext {
                    tick,
                    elapsed: Duration::from_millis(tick),
                    run_state: &run_state,
                };
                black_box(task.run(&ctx))
            });
        });
    }

    group.finish();
}

fn bench_controller(c: &mut Criterion) {
    let controller = AxisLockController::new();
    let cmds = [
        AxisLockCommand::fully_locked(CoordinateFrame::Tcp),
        AxisLockCommand::unlocked(CoordinateFrame::World),
    ];

    c.bench_function("axis_lock_get", |b| {
        b.iter(|| black_box(controller.get_command()));
    });

    let mut i = 0usize;
    c.bench_function("axis_lock_set", |b| {
        b.iter(|| {
            i ^= 1;
            controller.set_command(black_box(cmds[i]));
        });
    });
}

criterion_group!(benches, bench_dispatch, bench_control_step, bench_controller);
criterion_main!(benches);
