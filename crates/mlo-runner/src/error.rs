//! Error types for the runner
//!
//! Two layers:
//! - `RunnerError`: configuration and selection failures, fatal before dispatch
//! - `RunError`: why one invocation failed, never fatal to the batch

use mlo_catalog::CatalogError;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::path::PathBuf;

/// Fatal runner error
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Catalog could not be loaded or queried
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A strategy or protocol name is not recognised
    #[error("invalid {axis} {value:?} (expected one of: {expected})")]
    InvalidSelection {
        axis: &'static str,
        value: String,
        expected: &'static str,
    },

    /// Nothing left to run after resolving the selection
    #[error("empty selection: {0}")]
    EmptySelection(String),

    /// Configuration is inconsistent
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file is not valid TOML for the expected shape
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Filesystem operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunnerError {
    /// Wrap an I/O error with the path it concerns
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a single invocation failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    /// Simulator process could not be started
    #[error("failed to launch simulator: {0}")]
    LaunchFailure(String),

    /// Simulator exited with a non-zero status
    #[error("simulator exited with code {0}")]
    NonZeroExit(i32),

    /// Simulator ended without an exit code, e.g. killed by a signal
    #[error("simulator terminated without exit code: {0}")]
    Terminated(String),

    /// Simulator exceeded the configured run timeout and was killed
    #[error("simulator timed out after {secs}s")]
    TimedOut { secs: u64 },

    /// Fault raised while a worker processed the invocation
    #[error("worker fault: {0}")]
    WorkerFault(String),

    /// Log artifact could not be written
    #[error("failed to write log artifact: {0}")]
    LogWrite(String),
}

impl RunError {
    /// Short machine-friendly kind name
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LaunchFailure(_) => "launch_failure",
            Self::NonZeroExit(_) => "non_zero_exit",
            Self::Terminated(_) => "terminated",
            Self::TimedOut { .. } => "timed_out",
            Self::WorkerFault(_) => "worker_fault",
            Self::LogWrite(_) => "log_write",
        }
    }

    /// True if the simulator itself ran and reported the failure
    #[inline]
    #[must_use]
    pub fn is_simulator_failure(&self) -> bool {
        matches!(
            self,
            Self::NonZeroExit(_) | Self::Terminated(_) | Self::TimedOut { .. }
        )
    }
}

impl Serialize for RunError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RunError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
