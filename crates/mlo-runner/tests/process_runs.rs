//! End-to-end runs against scripted simulators.
//!
//! Each test drives real child processes through the scheduler or the pool
//! and checks results against the log artifacts left on disk.

#![cfg(unix)]

use chrono::{Local, TimeZone};
use mlo_runner::{
    InvocationBuilder, InvocationExecutor, OrchestratorConfig, Protocol, RunClock, RunError,
    RunSelection, Scheduler, SimulatorEntry, Strategy, WorkerPool,
};
use mlo_test_utils::{sample_catalog, shell_entry, Workspace};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

fn fixed_clock() -> RunClock {
    RunClock::at(Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap())
}

/// Run `selection` in a fresh workspace and return the report plus workspace.
async fn run_in_workspace(
    simulator: SimulatorEntry,
    selection: &RunSelection,
    workers: usize,
) -> (mlo_runner::RunReport, Workspace) {
    let workspace = Workspace::new();
    let config = workspace.config(simulator).with_workers(workers);
    config.prepare_dirs().await.unwrap();

    let clock = fixed_clock();
    let scheduler = Scheduler::new(
        Arc::new(sample_catalog()),
        config.invocation_builder(),
        Arc::new(config.process_executor(clock.label())),
    )
    .with_pool(config.worker_pool())
    .with_log_dir(config.log_dir_path());

    let report = scheduler.run(selection, clock).await.unwrap();
    (report, workspace)
}

/// A run whose simulator exits 137 is a failure carrying that code, and its
/// log says so.
#[tokio::test]
async fn exit_137_is_recorded() {
    let selection = RunSelection::all()
        .with_categories(["mobility"])
        .with_strategies([Strategy::Greedy])
        .with_protocols([Protocol::Udp]);
    let (report, _workspace) =
        run_in_workspace(shell_entry("echo started; exit 137"), &selection, 2).await;

    assert_eq!(report.submitted, 2);
    assert_eq!(report.summary.failure_count, 2);
    for result in &report.results {
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(137));
        assert_eq!(result.error, Some(RunError::NonZeroExit(137)));

        let log = std::fs::read_to_string(&result.log_path).unwrap();
        assert!(log.contains("Return Code: 137\n"));
        assert!(log.contains("--- STDOUT ---\nstarted\n"));
    }
}

/// Submitted, completed and logged counts are equal.
#[tokio::test]
async fn one_log_per_invocation() {
    let selection = RunSelection::all()
        .with_categories(["interference", "mobility"])
        .with_protocols([Protocol::Mixed]);
    let (report, workspace) = run_in_workspace(shell_entry("exit 0"), &selection, 4).await;

    assert_eq!(report.submitted, 5 * 4);
    assert_eq!(report.summary.completed(), report.submitted);
    assert!(report.all_succeeded());

    let logs = workspace.log_files(&report.log_dir);
    assert_eq!(logs.len(), report.submitted);
    assert!(logs.iter().all(|p| p
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("_20250314_092653.log")));
}

/// The simulator sees the orchestration flags followed by the scenario
/// parameters.
#[tokio::test]
async fn simulator_receives_flags_and_parameters() {
    let selection = RunSelection::all()
        .with_categories(["mobility"])
        .with_strategies([Strategy::SlaMlo])
        .with_protocols([Protocol::Tcp]);
    let (report, _workspace) =
        run_in_workspace(shell_entry(r#"printf '%s\n' "$@""#), &selection, 1).await;

    let walk = report
        .results
        .iter()
        .find(|r| r.run_id.as_str().starts_with("mobility_walk_"))
        .unwrap();
    let log = std::fs::read_to_string(&walk.log_path).unwrap();
    let stdout = log
        .split("--- STDOUT ---\n")
        .nth(1)
        .and_then(|rest| rest.split("\n--- STDERR ---").next())
        .unwrap();

    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
        vec![
            "--strategy=SLA-MLO",
            "--protocol=TCP",
            "--seed=92654",
            "--csvFile=scratch/output_files_csv/mlo_unified_results.csv",
            "--scenario=mobility_walk",
            "--runNumber=92654",
            "--verbose=1",
            "--speed=1.5",
        ]
    );
}

/// One worker and several workers agree on which runs fail.
#[tokio::test]
async fn worker_count_does_not_change_outcomes() {
    let script = r#"case "$*" in *--protocol=TCP*) exit 2;; *--strategy=Greedy*) exit 1;; esac; exit 0"#;
    let selection = RunSelection::all().with_categories(["interference"]);

    let (serial, _a) = run_in_workspace(shell_entry(script), &selection, 1).await;
    let (parallel, _b) = run_in_workspace(shell_entry(script), &selection, 6).await;

    let outcomes = |report: &mlo_runner::RunReport| {
        report
            .results
            .iter()
            .map(|r| (r.run_id.clone(), r.success, r.exit_code))
            .collect::<BTreeSet<_>>()
    };
    assert_eq!(outcomes(&serial), outcomes(&parallel));
    assert_eq!(serial.summary.success_count, parallel.summary.success_count);
    // 3 scenarios x 4 strategies x 3 protocols; TCP fails, Greedy fails.
    assert_eq!(serial.submitted, 36);
    assert_eq!(serial.summary.success_count, 3 * 3 * 2);
}

/// A missing executable fails its own runs without an exit code while
/// sibling runs in the same batch still complete.
#[tokio::test]
async fn launch_failure_does_not_abort_siblings() {
    let workspace = Workspace::new();
    let config = workspace.config(shell_entry("exit 0"));
    config.prepare_dirs().await.unwrap();

    let catalog = sample_catalog();
    let scenarios = catalog.scenarios_for("interference").unwrap();
    let good = config.invocation_builder();
    let missing = InvocationBuilder::new(
        SimulatorEntry::direct("/nonexistent/mlo_simulator"),
        config.simulator_csv_path(),
    );

    let mut invocations = Vec::new();
    for (seed, scenario) in (1u64..).zip(scenarios) {
        invocations.push(good.build("interference", scenario, Strategy::Greedy, Protocol::Udp, seed));
        invocations.push(missing.build(
            "interference",
            scenario,
            Strategy::Reliability,
            Protocol::Udp,
            seed + 100,
        ));
    }

    let executor: Arc<dyn InvocationExecutor> = Arc::new(config.process_executor("label"));
    let mut batch = WorkerPool::new(3).submit_all(executor, invocations);
    let mut results = Vec::new();
    while let Some(result) = batch.next().await {
        results.push(result);
    }
    batch.shutdown().await;

    assert_eq!(results.len(), 6);
    let (ok, failed): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.success);
    assert_eq!(ok.len(), 3);
    assert_eq!(failed.len(), 3);
    for result in failed {
        assert_eq!(result.exit_code, None);
        assert!(matches!(result.error, Some(RunError::LaunchFailure(ref m)) if !m.is_empty()));

        let log = std::fs::read_to_string(&result.log_path).unwrap();
        assert!(log.contains("Return Code: none"));
        assert!(log.contains("--- ORCHESTRATOR ERROR ---"));
    }
    assert_eq!(workspace.log_files(&config.log_dir_path()).len(), 6);
}

/// A relative program path is taken from the simulator directory.
#[tokio::test]
async fn relative_program_runs_from_simulator_dir() {
    let workspace = Workspace::new();
    workspace.link_program("fake_ns3", "/bin/sh");
    let config = workspace.config(
        SimulatorEntry::direct("./fake_ns3").with_launcher_args(["-c", "exit 0", "sim"]),
    );
    config.prepare_dirs().await.unwrap();

    let clock = fixed_clock();
    let report = Scheduler::new(
        Arc::new(sample_catalog()),
        config.invocation_builder(),
        Arc::new(config.process_executor(clock.label())),
    )
    .with_pool(WorkerPool::new(2))
    .run(
        &RunSelection::all()
            .with_categories(["mobility"])
            .with_protocols([Protocol::Udp]),
        clock,
    )
    .await
    .unwrap();

    assert_eq!(report.submitted, 8);
    assert!(report.all_succeeded());
}

/// A simulator directory given relative to the current directory works the
/// same as an absolute one.
#[tokio::test]
async fn relative_simulator_dir_runs() {
    let dir = tempfile::Builder::new()
        .prefix("sim-")
        .tempdir_in(".")
        .unwrap();
    let relative = PathBuf::from(dir.path().file_name().unwrap());
    std::os::unix::fs::symlink("/bin/sh", relative.join("fake_ns3")).unwrap();

    let config = OrchestratorConfig::new()
        .with_simulator_dir(&relative)
        .with_simulator(
            SimulatorEntry::direct("./fake_ns3").with_launcher_args(["-c", "exit 0", "sim"]),
        );
    config.prepare_dirs().await.unwrap();

    let clock = fixed_clock();
    let report = Scheduler::new(
        Arc::new(sample_catalog()),
        config.invocation_builder(),
        Arc::new(config.process_executor(clock.label())),
    )
    .with_pool(WorkerPool::new(2))
    .run(
        &RunSelection::all()
            .with_categories(["mobility"])
            .with_protocols([Protocol::Udp]),
        clock,
    )
    .await
    .unwrap();

    assert_eq!(report.submitted, 8);
    assert!(report.all_succeeded(), "{}", report.render_text());
    let logs = std::fs::read_dir(dir.path().join("scratch/logs")).unwrap().count();
    assert_eq!(logs, 8);
}
