//! Testing utilities for the MLO runner workspace
//!
//! Shared fixtures: a small catalog, scripted simulator entries, an in-memory
//! executor and a scratch workspace on disk.

#![allow(missing_docs)]

use mlo_catalog::{Category, ScenarioCatalog, ScenarioDefinition};
use mlo_runner::{
    Invocation, InvocationExecutor, OrchestratorConfig, RunError, RunId, RunResult,
    SimulatorEntry,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// `baseline` (12 scenarios), `interference` (3) and `mobility` (2)
pub fn sample_catalog() -> ScenarioCatalog {
    let baseline = (1..=12).fold(Category::new("baseline", "Baseline performance"), |c, i| {
        c.with_scenario(ScenarioDefinition::new(
            format!("load_{i:02}"),
            format!("--nWifi={} --simtime=10", i * 5),
            format!("Load step {i}"),
        ))
    });
    let interference = Category::new("interference", "Interference handling")
        .with_scenario(ScenarioDefinition::new("light", "--interference=0.1", "Light"))
        .with_scenario(ScenarioDefinition::new("medium", "--interference=0.3", "Medium"))
        .with_scenario(ScenarioDefinition::new("heavy", "--interference=0.6", "Heavy"));
    let mobility = Category::new("mobility", "Mobility patterns")
        .with_scenario(ScenarioDefinition::new("walk", "--speed=1.5", "Walking"))
        .with_scenario(ScenarioDefinition::new("drive", "--speed=15", "Driving"));

    ScenarioCatalog::from_categories([baseline, interference, mobility]).unwrap()
}

/// Entry that runs `script` under `sh -c`; simulator flags arrive as `$@`
pub fn shell_entry(script: &str) -> SimulatorEntry {
    SimulatorEntry::direct("sh").with_launcher_args(["-c", script, "sim"])
}

type Predicate = Box<dyn Fn(&Invocation) -> bool + Send + Sync>;

/// In-memory executor that records every call
pub struct MockExecutor {
    calls: Mutex<Vec<RunId>>,
    faults: Mutex<Vec<(RunId, String)>>,
    fail_when: Predicate,
    panic_when: Predicate,
}

impl MockExecutor {
    /// Executor where every run succeeds
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            faults: Mutex::new(Vec::new()),
            fail_when: Box::new(|_: &Invocation| false),
            panic_when: Box::new(|_: &Invocation| false),
        }
    }

    /// Runs matching `predicate` exit with code 1
    pub fn failing_when(
        mut self,
        predicate: impl Fn(&Invocation) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_when = Box::new(predicate);
        self
    }

    /// Runs matching `predicate` panic inside `execute`
    pub fn panicking_when(
        mut self,
        predicate: impl Fn(&Invocation) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.panic_when = Box::new(predicate);
        self
    }

    /// Wrap in an `Arc`
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Run ids passed to `execute`, in call order
    pub fn calls(&self) -> Vec<RunId> {
        self.calls.lock().clone()
    }

    /// Faults passed to `record_fault`
    pub fn faults(&self) -> Vec<(RunId, String)> {
        self.faults.lock().clone()
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl InvocationExecutor for MockExecutor {
    async fn execute(&self, invocation: &Invocation) -> RunResult {
        self.calls.lock().push(invocation.run_id.clone());
        if (self.panic_when)(invocation) {
            panic!("mock panic for {}", invocation.run_id);
        }

        let failed = (self.fail_when)(invocation);
        RunResult {
            run_id: invocation.run_id.clone(),
            success: !failed,
            exit_code: Some(i32::from(failed)),
            duration_secs: 0.001,
            log_path: PathBuf::from(format!("{}.log", invocation.run_id)),
            error: failed.then_some(RunError::NonZeroExit(1)),
        }
    }

    async fn record_fault(&self, invocation: &Invocation, fault: &str) -> RunResult {
        self.faults
            .lock()
            .push((invocation.run_id.clone(), fault.to_string()));
        RunResult::fault(
            invocation.run_id.clone(),
            PathBuf::new(),
            RunError::WorkerFault(fault.to_string()),
        )
    }
}

/// Scratch simulator directory that is removed on drop
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Configuration rooted at this workspace with the given simulator
    pub fn config(&self, simulator: SimulatorEntry) -> OrchestratorConfig {
        OrchestratorConfig::new()
            .with_simulator_dir(self.path())
            .with_simulator(simulator)
    }

    /// Link `name` in the workspace to an existing executable
    #[cfg(unix)]
    pub fn link_program(&self, name: &str, target: impl AsRef<Path>) -> PathBuf {
        let path = self.path().join(name);
        std::os::unix::fs::symlink(target, &path).unwrap();
        path
    }

    /// Every `.log` file under `log_dir`, sorted
    pub fn log_files(&self, log_dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<_> = std::fs::read_dir(log_dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "log"))
            .collect();
        files.sort();
        files
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}
