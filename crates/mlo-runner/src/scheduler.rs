//! Matrix expansion and dispatch
//!
//! The scheduler turns a selection into an ordered plan of invocations, hands
//! the plan to the worker pool and folds results as they complete.
//!
//! # Ordering
//!
//! Submission order is category, scenario (catalog order), strategy, protocol
//! (axis order). Seeds come from a counter that starts at the run's seed base
//! and is incremented before each assignment, so the first seed is
//! `base + 1` and all seeds in a run are distinct. Completion order is
//! arbitrary.

use crate::error::{RunError, RunnerError};
use crate::executor::{InvocationExecutor, RunResult};
use crate::invocation::{Invocation, InvocationBuilder, RunId};
use crate::pool::WorkerPool;
use crate::summary::{RunReport, RunSummaryState};
use crate::types::{MatrixAxes, Protocol, RunClock, Strategy};
use mlo_catalog::ScenarioCatalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// What part of the matrix to run
///
/// `None` on any axis means the full axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSelection {
    /// Categories in the order they should run
    pub categories: Option<Vec<String>>,
    /// Strategies to test
    pub strategies: Option<Vec<Strategy>>,
    /// Protocols to test
    pub protocols: Option<Vec<Protocol>>,
}

impl RunSelection {
    /// Everything in the catalog
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// With categories
    #[must_use]
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    /// With strategies
    #[must_use]
    pub fn with_strategies(mut self, strategies: impl IntoIterator<Item = Strategy>) -> Self {
        self.strategies = Some(strategies.into_iter().collect());
        self
    }

    /// With protocols
    #[must_use]
    pub fn with_protocols(mut self, protocols: impl IntoIterator<Item = Protocol>) -> Self {
        self.protocols = Some(protocols.into_iter().collect());
        self
    }
}

/// Expanded matrix, in submission order
#[derive(Debug, Clone)]
pub struct Plan {
    /// One invocation per matrix cell
    pub invocations: Vec<Invocation>,
    /// Axes the plan was expanded over
    pub axes: MatrixAxes,
    /// Categories that took part, in run order
    pub categories: Vec<String>,
    /// Selected categories the catalog does not contain
    pub unknown_categories: Vec<String>,
}

impl Plan {
    /// Number of invocations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.invocations.len()
    }

    /// True if there is nothing to run
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }
}

/// Expands selections and runs them on a worker pool
pub struct Scheduler {
    catalog: Arc<ScenarioCatalog>,
    axes: MatrixAxes,
    builder: InvocationBuilder,
    executor: Arc<dyn InvocationExecutor>,
    pool: WorkerPool,
    log_dir: PathBuf,
}

impl Scheduler {
    /// Create a scheduler with the canonical axes and a host-sized pool
    #[must_use]
    pub fn new(
        catalog: Arc<ScenarioCatalog>,
        builder: InvocationBuilder,
        executor: Arc<dyn InvocationExecutor>,
    ) -> Self {
        Self {
            catalog,
            axes: MatrixAxes::default(),
            builder,
            executor,
            pool: WorkerPool::default(),
            log_dir: PathBuf::new(),
        }
    }

    /// With explicit axis order
    #[inline]
    #[must_use]
    pub fn with_axes(mut self, axes: MatrixAxes) -> Self {
        self.axes = axes;
        self
    }

    /// With a worker pool
    #[inline]
    #[must_use]
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    /// With the log directory reported to the operator
    #[inline]
    #[must_use]
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Catalog being scheduled
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    /// Expand a selection into a plan
    ///
    /// Unknown categories are logged and skipped.
    ///
    /// # Errors
    /// `RunnerError::EmptySelection` if no category, strategy, protocol or
    /// scenario remains.
    pub fn expand(&self, selection: &RunSelection, seed_base: u64) -> Result<Plan, RunnerError> {
        let (catalog, unknown_categories) = match &selection.categories {
            None => (Arc::clone(&self.catalog), Vec::new()),
            Some(names) => {
                let picked = self.catalog.filter(names);
                (Arc::new(picked.catalog), picked.unknown)
            }
        };
        for name in &unknown_categories {
            tracing::warn!("scenario category '{name}' not found, skipping");
        }
        if catalog.is_empty() {
            return Err(RunnerError::EmptySelection(
                "no known categories selected".into(),
            ));
        }

        let axes = self
            .axes
            .restrict(selection.strategies.as_deref(), selection.protocols.as_deref());
        if axes.strategies.is_empty() {
            return Err(RunnerError::EmptySelection("no strategies selected".into()));
        }
        if axes.protocols.is_empty() {
            return Err(RunnerError::EmptySelection("no protocols selected".into()));
        }

        let mut invocations =
            Vec::with_capacity(catalog.scenario_count() * axes.cells_per_scenario());
        let mut counter = seed_base;
        for category in catalog.categories() {
            for scenario in &category.scenarios {
                for &strategy in &axes.strategies {
                    for &protocol in &axes.protocols {
                        counter += 1;
                        invocations.push(self.builder.build(
                            &category.name,
                            scenario,
                            strategy,
                            protocol,
                            counter,
                        ));
                    }
                }
            }
        }

        if invocations.is_empty() {
            return Err(RunnerError::EmptySelection(
                "selected categories contain no scenarios".into(),
            ));
        }

        Ok(Plan {
            invocations,
            categories: catalog.list_categories().into_iter().map(str::to_string).collect(),
            axes,
            unknown_categories,
        })
    }

    /// Expand and run a selection to completion
    ///
    /// Individual run failures end up in the report; only selection errors
    /// are returned as `Err`. A run the pool never reports back is counted
    /// as a worker fault, so the report always covers every submission.
    ///
    /// # Errors
    /// Any error from [`Scheduler::expand`], raised before dispatch.
    pub async fn run(
        &self,
        selection: &RunSelection,
        clock: RunClock,
    ) -> Result<RunReport, RunnerError> {
        let plan = self.expand(selection, clock.seed_base())?;
        let submitted = plan.len();

        tracing::info!("Test categories: {}", plan.categories.join(", "));
        tracing::info!("Strategies: {}", join(&plan.axes.strategies));
        tracing::info!("Protocols: {}", join(&plan.axes.protocols));
        tracing::info!("Parallel workers: {}", self.pool.workers());
        tracing::info!("Total simulation runs to execute: {submitted}");

        let mut pending: BTreeSet<RunId> =
            plan.invocations.iter().map(|i| i.run_id.clone()).collect();

        let started = Instant::now();
        let mut batch = self.pool.submit_all(Arc::clone(&self.executor), plan.invocations);

        let mut summary = RunSummaryState::default();
        let mut results = Vec::with_capacity(submitted);
        while let Some(result) = batch.next().await {
            pending.remove(&result.run_id);
            summary.record(&result);
            tracing::info!(
                "progress {}/{submitted}: {} succeeded, {} failed",
                summary.completed(),
                summary.success_count,
                summary.failure_count
            );
            results.push(result);
        }
        let stats = batch.stats();
        batch.shutdown().await;

        if stats.completed < stats.submitted {
            tracing::error!(
                "only {} of {} runs reported a result",
                stats.completed,
                stats.submitted
            );
        }
        account_missing(pending, &mut summary, &mut results);

        Ok(RunReport {
            run_label: clock.label(),
            started_at: clock.started_at(),
            summary,
            submitted,
            wall_clock_secs: started.elapsed().as_secs_f64(),
            results,
            unknown_categories: plan.unknown_categories,
            result_file: self.builder.result_file().to_path_buf(),
            log_dir: self.log_dir.clone(),
        })
    }
}

/// Record a worker fault for each run that never produced a result
fn account_missing(
    missing: BTreeSet<RunId>,
    summary: &mut RunSummaryState,
    results: &mut Vec<RunResult>,
) {
    for run_id in missing {
        tracing::error!(%run_id, "no result reported for run");
        let result = RunResult::fault(
            run_id,
            PathBuf::new(),
            RunError::WorkerFault("no result reported".into()),
        );
        summary.record(&result);
        results.push(result);
    }
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
