//! Per-run log artifacts
//!
//! Every invocation leaves exactly one plain-text log behind, named
//! `<run_id>_<run_label>.log`. Sections appear in a fixed order:
//! details, command, stdout, stderr, and an optional orchestrator error
//! section when the runner itself hit a fault.

use crate::invocation::{Invocation, RunId};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Log file path for a run
#[inline]
#[must_use]
pub fn log_path(log_dir: &Path, run_id: &RunId, run_label: &str) -> PathBuf {
    log_dir.join(format!("{run_id}_{run_label}.log"))
}

/// Contents of one log artifact
#[derive(Debug, Clone)]
pub struct LogArtifact<'a> {
    /// Run the log belongs to
    pub invocation: &'a Invocation,
    /// When the run finished
    pub timestamp: DateTime<Local>,
    /// Wall-clock duration in seconds
    pub execution_secs: f64,
    /// Exit code, if the process produced one
    pub return_code: Option<i32>,
    /// Captured standard output
    pub stdout: &'a str,
    /// Captured standard error
    pub stderr: &'a str,
    /// Fault raised by the runner rather than the simulator
    pub fault: Option<&'a str>,
}

impl<'a> LogArtifact<'a> {
    /// Artifact with no captured output yet
    #[must_use]
    pub fn new(invocation: &'a Invocation) -> Self {
        Self {
            invocation,
            timestamp: Local::now(),
            execution_secs: 0.0,
            return_code: None,
            stdout: "",
            stderr: "",
            fault: None,
        }
    }

    /// Render the artifact text
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(512 + self.stdout.len() + self.stderr.len());

        out.push_str("--- TEST DETAILS ---\n");
        let _ = writeln!(out, "Test Name: {}", self.invocation.run_id);
        let _ = writeln!(out, "Description: {}", self.invocation.description);
        let _ = writeln!(
            out,
            "Timestamp: {}",
            self.timestamp.format("%Y-%m-%dT%H:%M:%S%.6f")
        );
        let _ = writeln!(out, "Execution Time: {:.2} seconds", self.execution_secs);
        match self.return_code {
            Some(code) => {
                let _ = writeln!(out, "Return Code: {code}");
            }
            None => out.push_str("Return Code: none\n"),
        }

        out.push_str("\n--- COMMAND ---\n");
        out.push_str(&self.invocation.command);
        out.push_str("\n\n--- STDOUT ---\n");
        out.push_str(self.stdout);
        out.push_str("\n--- STDERR ---\n");
        out.push_str(self.stderr);

        if let Some(fault) = self.fault {
            out.push_str("\n--- ORCHESTRATOR ERROR ---\n");
            out.push_str(fault);
            out.push('\n');
        }

        out
    }

    /// Write the artifact to `path`, replacing any previous file
    ///
    /// # Errors
    /// Any I/O error from the write.
    pub async fn write(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::write(path, self.render()).await
    }
}
