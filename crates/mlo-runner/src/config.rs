//! Orchestrator configuration
//!
//! Loaded from TOML, then overridden by command-line flags. Relative output
//! and log directories are taken relative to `simulator_dir`, which is also
//! the working directory of every simulator process.

use crate::error::RunnerError;
use crate::executor::ProcessExecutor;
use crate::invocation::{InvocationBuilder, SimulatorEntry};
use crate::pool::WorkerPool;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Simulator checkout; working directory of every run
    pub simulator_dir: PathBuf,
    /// Directory of the shared result file
    pub output_dir: PathBuf,
    /// Directory for per-run log artifacts
    pub log_dir: PathBuf,
    /// Shared result file name
    pub result_file: String,
    /// How the simulator is launched
    pub simulator: SimulatorEntry,
    /// Worker count; host parallelism when absent
    pub workers: Option<usize>,
    /// Per-run timeout; runs are unbounded when absent
    pub run_timeout_secs: Option<u64>,
}

impl OrchestratorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// `RunnerError::ConfigParse` for malformed TOML or unknown keys.
    pub fn from_toml_str(source: &str) -> Result<Self, RunnerError> {
        Ok(toml::from_str(source)?)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// `RunnerError::Io` if the file cannot be read, otherwise as
    /// [`OrchestratorConfig::from_toml_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RunnerError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| RunnerError::io(path, e))?;
        Self::from_toml_str(&source)
    }

    /// With simulator directory
    #[inline]
    #[must_use]
    pub fn with_simulator_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.simulator_dir = dir.into();
        self
    }

    /// With output directory
    #[inline]
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// With log directory
    #[inline]
    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// With result file name
    #[inline]
    #[must_use]
    pub fn with_result_file(mut self, name: impl Into<String>) -> Self {
        self.result_file = name.into();
        self
    }

    /// With simulator entry
    #[inline]
    #[must_use]
    pub fn with_simulator(mut self, simulator: SimulatorEntry) -> Self {
        self.simulator = simulator;
        self
    }

    /// With worker count
    #[inline]
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// With per-run timeout in seconds
    #[inline]
    #[must_use]
    pub fn with_run_timeout_secs(mut self, secs: u64) -> Self {
        self.run_timeout_secs = Some(secs);
        self
    }

    /// Check values that cannot be expressed in the types
    ///
    /// # Errors
    /// `RunnerError::Config` naming the offending field.
    pub fn validate(&self) -> Result<(), RunnerError> {
        if self.workers == Some(0) {
            return Err(RunnerError::Config("workers must be at least 1".into()));
        }
        if self.run_timeout_secs == Some(0) {
            return Err(RunnerError::Config(
                "run_timeout_secs must be at least 1".into(),
            ));
        }
        if self.result_file.trim().is_empty() {
            return Err(RunnerError::Config("result_file must not be empty".into()));
        }
        if self.result_file.contains(['/', '\\']) {
            return Err(RunnerError::Config(format!(
                "result_file {:?} must be a file name, not a path",
                self.result_file
            )));
        }
        if self.simulator.program.as_os_str().is_empty() {
            return Err(RunnerError::Config(
                "simulator.program must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Output directory as seen from this process
    #[must_use]
    pub fn output_dir_path(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    /// Log directory as seen from this process
    #[must_use]
    pub fn log_dir_path(&self) -> PathBuf {
        self.resolve(&self.log_dir)
    }

    /// Result file as seen from this process
    #[must_use]
    pub fn csv_path(&self) -> PathBuf {
        self.output_dir_path().join(&self.result_file)
    }

    /// Result file as passed to the simulator, relative to its working dir
    #[must_use]
    pub fn simulator_csv_path(&self) -> PathBuf {
        self.output_dir.join(&self.result_file)
    }

    /// Per-run timeout
    #[inline]
    #[must_use]
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }

    /// Worker pool sized from `workers`
    #[must_use]
    pub fn worker_pool(&self) -> WorkerPool {
        self.workers.map_or_else(WorkerPool::default, WorkerPool::new)
    }

    /// Invocation builder for this configuration
    #[must_use]
    pub fn invocation_builder(&self) -> InvocationBuilder {
        InvocationBuilder::new(self.simulator.clone(), self.simulator_csv_path())
    }

    /// Process executor for one run
    #[must_use]
    pub fn process_executor(&self, run_label: impl Into<String>) -> ProcessExecutor {
        ProcessExecutor::new(&self.simulator_dir, self.log_dir_path(), run_label)
            .with_timeout(self.run_timeout())
    }

    /// Create the output and log directories
    ///
    /// # Errors
    /// `RunnerError::Io` for the first directory that cannot be created.
    pub async fn prepare_dirs(&self) -> Result<(), RunnerError> {
        for dir in [self.output_dir_path(), self.log_dir_path()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| RunnerError::io(&dir, e))?;
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.simulator_dir.join(path)
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            simulator_dir: PathBuf::from("."),
            output_dir: PathBuf::from("scratch/output_files_csv"),
            log_dir: PathBuf::from("scratch/logs"),
            result_file: "mlo_unified_results.csv".to_string(),
            simulator: SimulatorEntry::default(),
            workers: None,
            run_timeout_secs: None,
        }
    }
}
