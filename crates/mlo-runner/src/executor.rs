//! Run execution
//!
//! The executor runs one invocation to completion and always produces a
//! `RunResult`, never an error: launch faults, non-zero exits and timeouts all
//! become failed results so one bad run cannot abort the batch.
//!
//! # Invariant
//!
//! Every call to `execute` or `record_fault` on `ProcessExecutor` writes
//! exactly one log artifact for the invocation.

use crate::error::RunError;
use crate::invocation::{Invocation, RunId};
use crate::log_artifact::{log_path, LogArtifact};
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Outcome of one invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    /// Run identifier
    pub run_id: RunId,
    /// True only for exit code 0 with a log written
    pub success: bool,
    /// Exit code, absent if the process never produced one
    pub exit_code: Option<i32>,
    /// Wall-clock duration of the run
    pub duration_secs: f64,
    /// Log artifact location
    pub log_path: PathBuf,
    /// Failure reason
    pub error: Option<RunError>,
}

impl RunResult {
    /// Failed result with no exit code
    #[must_use]
    pub fn fault(run_id: RunId, log_path: PathBuf, error: RunError) -> Self {
        Self {
            run_id,
            success: false,
            exit_code: None,
            duration_secs: 0.0,
            log_path,
            error: Some(error),
        }
    }
}

/// Executes invocations
///
/// Implement this trait to change how a single run is carried out.
#[async_trait::async_trait]
pub trait InvocationExecutor: Send + Sync {
    /// Run one invocation to completion
    async fn execute(&self, invocation: &Invocation) -> RunResult;

    /// Turn a fault that escaped `execute` into a failed result
    async fn record_fault(&self, invocation: &Invocation, fault: &str) -> RunResult {
        RunResult::fault(
            invocation.run_id.clone(),
            PathBuf::new(),
            RunError::WorkerFault(fault.to_string()),
        )
    }
}

/// Runs the simulator as a child process and logs each run
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    working_dir: PathBuf,
    log_dir: PathBuf,
    run_label: String,
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    /// Create an executor without a run timeout
    #[must_use]
    pub fn new(
        working_dir: impl Into<PathBuf>,
        log_dir: impl Into<PathBuf>,
        run_label: impl Into<String>,
    ) -> Self {
        Self {
            working_dir: absolute(working_dir.into()),
            log_dir: absolute(log_dir.into()),
            run_label: run_label.into(),
            timeout: None,
        }
    }

    /// With a per-run timeout; `None` lets runs take as long as they need
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Log artifact path for an invocation
    #[inline]
    #[must_use]
    pub fn log_path(&self, invocation: &Invocation) -> PathBuf {
        log_path(&self.log_dir, &invocation.run_id, &self.run_label)
    }

    /// Relative paths with a directory part are taken from the working dir;
    /// bare names go through `PATH`.
    fn resolve_program(&self, program: &Path) -> PathBuf {
        if program.is_relative() && program.components().count() > 1 {
            self.working_dir.join(program)
        } else {
            program.to_path_buf()
        }
    }

    async fn spawn_and_wait(&self, invocation: &Invocation) -> Result<Output, RunError> {
        let mut command = Command::new(self.resolve_program(&invocation.program));
        command
            .args(&invocation.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own group, so a timeout can take down anything the simulator forked.
        #[cfg(unix)]
        command.process_group(0);

        let child = command
            .spawn()
            .map_err(|e| RunError::LaunchFailure(e.to_string()))?;
        let pid = child.id();

        let waiting = child.wait_with_output();
        tokio::pin!(waiting);
        let output = match self.timeout {
            None => waiting.await,
            Some(limit) => match tokio::time::timeout(limit, &mut waiting).await {
                Ok(output) => output,
                Err(_) => {
                    // The leader is unreaped while `waiting` is alive, so the
                    // group id cannot have been reused.
                    if let Some(pid) = pid {
                        kill_process_group(pid).await;
                    }
                    // Reap the leader; dropping the future kills it if it is
                    // still around.
                    let _ = tokio::time::timeout(REAP_GRACE, &mut waiting).await;
                    return Err(RunError::TimedOut {
                        secs: limit.as_secs(),
                    });
                }
            },
        };

        output.map_err(|e| RunError::WorkerFault(format!("failed to collect output: {e}")))
    }
}

/// How long a killed run gets to close its pipes and be reaped
const REAP_GRACE: Duration = Duration::from_secs(2);

/// Resolve against the current directory so children started in another
/// directory still find the same paths.
fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(e) => {
            tracing::warn!(path = %path.display(), "cannot resolve relative path: {e}");
            path
        }
    }
}

/// SIGKILL every process in the group led by `pgid`
#[cfg(unix)]
async fn kill_process_group(pgid: u32) {
    let group = format!("-{pgid}");
    let status = Command::new("kill")
        .args(["-s", "KILL", "--", group.as_str()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) if status.success() => {}
        Ok(status) => tracing::debug!(pgid, "kill on process group exited with {status}"),
        Err(e) => tracing::warn!(pgid, "failed to kill process group: {e}"),
    }
}

#[cfg(not(unix))]
async fn kill_process_group(_pgid: u32) {}

#[async_trait::async_trait]
impl InvocationExecutor for ProcessExecutor {
    async fn execute(&self, invocation: &Invocation) -> RunResult {
        let log_path = self.log_path(invocation);
        tracing::info!(run_id = %invocation.run_id, "starting simulation");

        let started = Instant::now();
        let outcome = self.spawn_and_wait(invocation).await;
        let duration_secs = started.elapsed().as_secs_f64();

        let (exit_code, stdout, stderr, mut error) = match outcome {
            Ok(output) => {
                let code = output.status.code();
                let error = match code {
                    Some(0) => None,
                    Some(code) => Some(RunError::NonZeroExit(code)),
                    None => Some(RunError::Terminated(output.status.to_string())),
                };
                (
                    code,
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                    error,
                )
            }
            Err(error) => (None, String::new(), String::new(), Some(error)),
        };

        let fault = match &error {
            Some(
                e @ (RunError::LaunchFailure(_)
                | RunError::TimedOut { .. }
                | RunError::WorkerFault(_)),
            ) => Some(e.to_string()),
            _ => None,
        };

        let artifact = LogArtifact {
            timestamp: Local::now(),
            execution_secs: duration_secs,
            return_code: exit_code,
            stdout: &stdout,
            stderr: &stderr,
            fault: fault.as_deref(),
            ..LogArtifact::new(invocation)
        };
        if let Err(e) = artifact.write(&log_path).await {
            tracing::error!(
                run_id = %invocation.run_id,
                path = %log_path.display(),
                "failed to write log artifact: {e}"
            );
            if error.is_none() {
                error = Some(RunError::LogWrite(e.to_string()));
            }
        }

        match &error {
            None => tracing::info!(
                run_id = %invocation.run_id,
                "SUCCESS: {} (took {:.1}s)",
                invocation.run_id,
                duration_secs
            ),
            Some(e) if e.is_simulator_failure() => tracing::warn!(
                run_id = %invocation.run_id,
                "FAILED: {} ({e}). See log for details: {}",
                invocation.run_id,
                log_path.display()
            ),
            Some(e) => tracing::error!(
                run_id = %invocation.run_id,
                kind = e.kind(),
                "FAILED: {} ({e}). See log for details: {}",
                invocation.run_id,
                log_path.display()
            ),
        }

        RunResult {
            run_id: invocation.run_id.clone(),
            success: error.is_none(),
            exit_code,
            duration_secs,
            log_path,
            error,
        }
    }

    async fn record_fault(&self, invocation: &Invocation, fault: &str) -> RunResult {
        let log_path = self.log_path(invocation);
        let error = RunError::WorkerFault(fault.to_string());
        let text = error.to_string();

        let artifact = LogArtifact {
            fault: Some(&text),
            ..LogArtifact::new(invocation)
        };
        if let Err(e) = artifact.write(&log_path).await {
            tracing::error!(
                run_id = %invocation.run_id,
                path = %log_path.display(),
                "failed to write fault log: {e}"
            );
        }

        tracing::error!(
            run_id = %invocation.run_id,
            "CRITICAL ERROR: {}. See log for details: {}",
            invocation.run_id,
            log_path.display()
        );

        RunResult::fault(invocation.run_id.clone(), log_path, error)
    }
}
