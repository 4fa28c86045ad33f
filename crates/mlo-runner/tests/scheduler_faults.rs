//! Fault accounting in the scheduler.
//!
//! Failures and worker panics stay local to one invocation: every submission
//! is counted exactly once and the batch always runs to the end.

use mlo_runner::{
    InvocationBuilder, Protocol, RunClock, RunError, RunSelection, RunnerError, Scheduler,
    SimulatorEntry, Strategy, WorkerPool,
};
use mlo_test_utils::{sample_catalog, MockExecutor};
use std::collections::HashSet;
use std::sync::Arc;

fn scheduler(executor: Arc<MockExecutor>, workers: usize) -> Scheduler {
    Scheduler::new(
        Arc::new(sample_catalog()),
        InvocationBuilder::new(SimulatorEntry::default(), "results.csv"),
        executor,
    )
    .with_pool(WorkerPool::new(workers))
}

/// Panicking runs become worker faults; the rest of the batch completes.
#[tokio::test]
async fn worker_panics_count_as_one_failure_each() {
    let executor = MockExecutor::new()
        .panicking_when(|inv| inv.strategy == Strategy::Reliability && inv.protocol == Protocol::Udp)
        .shared();
    let report = scheduler(Arc::clone(&executor), 4)
        .run(&RunSelection::all().with_categories(["interference"]), RunClock::now())
        .await
        .unwrap();

    assert_eq!(report.submitted, 36);
    assert_eq!(report.summary.completed(), 36);
    assert_eq!(report.summary.failure_count, 3);
    assert_eq!(executor.calls().len(), 36);

    let faults = executor.faults();
    assert_eq!(faults.len(), 3);
    assert!(faults.iter().all(|(_, message)| message.contains("mock panic")));

    let faulted: Vec<_> = report
        .results
        .iter()
        .filter(|r| matches!(r.error, Some(RunError::WorkerFault(_))))
        .collect();
    assert_eq!(faulted.len(), 3);
}

/// Successes plus failures always equal submissions.
#[tokio::test]
async fn summary_accounts_for_every_submission() {
    let executor = MockExecutor::new()
        .failing_when(|inv| inv.seed % 3 == 0)
        .panicking_when(|inv| inv.seed % 7 == 0)
        .shared();
    let report = scheduler(Arc::clone(&executor), 3)
        .run(&RunSelection::all(), RunClock::now())
        .await
        .unwrap();

    assert_eq!(report.submitted, 17 * 12);
    assert_eq!(
        report.summary.success_count + report.summary.failure_count,
        report.submitted
    );

    let ids: HashSet<_> = report.results.iter().map(|r| &r.run_id).collect();
    assert_eq!(ids.len(), report.submitted);
}

/// Nothing is dispatched when the selection resolves to nothing.
#[tokio::test]
async fn empty_selection_dispatches_nothing() {
    let executor = MockExecutor::new().shared();
    let err = scheduler(Arc::clone(&executor), 2)
        .run(
            &RunSelection::all().with_categories(["does_not_exist"]),
            RunClock::now(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::EmptySelection(_)));
    assert!(executor.calls().is_empty());
}

/// Unknown categories are reported and the known ones still run.
#[tokio::test]
async fn unknown_categories_are_reported() {
    let executor = MockExecutor::new().shared();
    let report = scheduler(Arc::clone(&executor), 2)
        .run(
            &RunSelection::all()
                .with_categories(["typo", "mobility"])
                .with_strategies([Strategy::Greedy]),
            RunClock::now(),
        )
        .await
        .unwrap();

    assert_eq!(report.unknown_categories, vec!["typo"]);
    assert_eq!(report.submitted, 2 * 3);
    assert!(report.render_text().contains("Skipped unknown categories: typo"));
}
