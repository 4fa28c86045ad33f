//! Run summary
//!
//! `RunSummaryState` is folded by exactly one owner (the scheduler's collect
//! loop). `RunReport` is the read-only projection handed to the operator.

use crate::executor::RunResult;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Running totals for one orchestration run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunSummaryState {
    /// Runs that exited with code 0
    pub success_count: usize,
    /// Every other run
    pub failure_count: usize,
    /// Sum of individual run durations
    pub total_run_secs: f64,
}

impl RunSummaryState {
    /// Fold one completed result
    pub fn record(&mut self, result: &RunResult) {
        if result.success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.total_run_secs += result.duration_secs;
    }

    /// Runs folded so far
    #[inline]
    #[must_use]
    pub fn completed(&self) -> usize {
        self.success_count + self.failure_count
    }
}

/// Short human-readable summary of a state
#[must_use]
pub fn report(state: &RunSummaryState, elapsed_secs: f64) -> String {
    format!(
        "Total execution time: {elapsed_secs:.2} seconds\n\
         Successful runs: {}\n\
         Failed runs: {}\n",
        state.success_count, state.failure_count
    )
}

/// Final outcome of an orchestration run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Start label shared by every log artifact of the run
    pub run_label: String,
    /// When the run started
    pub started_at: DateTime<Local>,
    /// Final totals
    pub summary: RunSummaryState,
    /// Invocations handed to the pool
    pub submitted: usize,
    /// Batch wall-clock time
    pub wall_clock_secs: f64,
    /// Per-run results in completion order
    pub results: Vec<RunResult>,
    /// Selected categories the catalog did not contain
    pub unknown_categories: Vec<String>,
    /// Result file the simulators append to
    pub result_file: PathBuf,
    /// Directory holding the log artifacts
    pub log_dir: PathBuf,
}

impl RunReport {
    /// True if every submitted run succeeded
    #[inline]
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.summary.failure_count == 0 && self.summary.completed() == self.submitted
    }

    /// Failed results
    pub fn failures(&self) -> impl Iterator<Item = &RunResult> {
        self.results.iter().filter(|r| !r.success)
    }

    /// Render the operator-facing report
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(70);

        let _ = writeln!(out, "{rule}");
        out.push_str("MLO SIMULATION RUN COMPLETE\n");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(
            out,
            "Started: {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S")
        );
        out.push_str(&report(&self.summary, self.wall_clock_secs));
        let _ = writeln!(
            out,
            "Summed run time: {:.2} seconds",
            self.summary.total_run_secs
        );
        let _ = writeln!(out, "All results appended to: {}", self.result_file.display());
        let _ = writeln!(out, "Detailed logs are in: {}", self.log_dir.display());

        if !self.unknown_categories.is_empty() {
            let _ = writeln!(
                out,
                "Skipped unknown categories: {}",
                self.unknown_categories.join(", ")
            );
        }

        let mut failures: Vec<_> = self.failures().collect();
        if !failures.is_empty() {
            failures.sort_by(|a, b| a.run_id.cmp(&b.run_id));
            out.push_str("\nFailed runs:\n");
            for failure in failures {
                let reason = failure
                    .error
                    .as_ref()
                    .map(|e| format!("{}: {e}", e.kind()))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "  - {} ({reason})\n    log: {}",
                    failure.run_id,
                    failure.log_path.display()
                );
            }
        }

        out
    }
}
