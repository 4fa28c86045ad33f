//! MLO Runner - Parallel experiment runner for the MLO simulator
//!
//! Expands a scenario catalog into a test matrix and runs it:
//! - Builds one simulator invocation per (category, scenario, strategy, protocol) cell
//! - Runs invocations as child processes on a bounded worker pool
//! - Writes one log artifact per run
//! - Folds results into a summary as they complete
//!
//! # Example
//!
//! ```rust,ignore
//! use mlo_runner::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OrchestratorConfig::new().with_workers(4);
//! let clock = RunClock::now();
//! config.prepare_dirs().await?;
//!
//! let scheduler = Scheduler::new(
//!     Arc::new(Suite::Basic.load()?),
//!     config.invocation_builder(),
//!     Arc::new(config.process_executor(clock.label())),
//! )
//! .with_pool(config.worker_pool());
//!
//! let selection = RunSelection::all().with_categories(["baseline"]);
//! let report = scheduler.run(&selection, clock).await?;
//! println!("{}", report.render_text());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod executor;
pub mod invocation;
pub mod log_artifact;
pub mod logging;
pub mod pool;
pub mod scheduler;
pub mod summary;
pub mod types;

pub use config::OrchestratorConfig;
pub use error::{RunError, RunnerError};
pub use executor::{InvocationExecutor, ProcessExecutor, RunResult};
pub use invocation::{Invocation, InvocationBuilder, RunId, SimulatorEntry};
pub use log_artifact::{log_path, LogArtifact};
pub use pool::{available_workers, PoolRun, PoolStats, WorkerPool};
pub use scheduler::{Plan, RunSelection, Scheduler};
pub use summary::{report, RunReport, RunSummaryState};
pub use types::{MatrixAxes, Protocol, RunClock, Strategy};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running campaigns
    pub use crate::{
        InvocationBuilder, InvocationExecutor, OrchestratorConfig, Protocol, RunClock,
        RunReport, RunResult, RunSelection, Scheduler, SimulatorEntry, Strategy, WorkerPool,
    };
    pub use mlo_catalog::{ScenarioCatalog, Suite};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
