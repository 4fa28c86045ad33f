//! Bounded worker pool
//!
//! Provides:
//! - A task queue shared by a fixed number of workers
//! - A completion channel yielding results as runs finish
//! - Fault containment: a panicking run becomes one failed result
//!
//! Completion order is arbitrary. The pool guarantees exactly one result per
//! submitted invocation.

use crate::error::RunError;
use crate::executor::{InvocationExecutor, RunResult};
use crate::invocation::Invocation;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinError, JoinHandle};

type TaskQueue = Arc<Mutex<mpsc::UnboundedReceiver<Arc<Invocation>>>>;

/// Fixed-size pool of workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    workers: usize,
}

/// Pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Invocations handed to the pool
    pub submitted: usize,
    /// Results received so far
    pub completed: usize,
    /// Workers started
    pub workers: usize,
}

/// Handle on a batch submitted to the pool
#[derive(Debug)]
pub struct PoolRun {
    completions: mpsc::UnboundedReceiver<RunResult>,
    handles: Vec<JoinHandle<()>>,
    stats: PoolStats,
}

impl WorkerPool {
    /// Create pool with `workers` workers (at least one)
    #[inline]
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Pool sized to the host's available parallelism
    #[must_use]
    pub fn with_available_parallelism() -> Self {
        Self::new(available_workers())
    }

    /// Configured worker count
    #[inline]
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Submit a batch and start the workers
    ///
    /// Must be called inside a tokio runtime.
    pub fn submit_all(
        &self,
        executor: Arc<dyn InvocationExecutor>,
        invocations: Vec<Invocation>,
    ) -> PoolRun {
        let submitted = invocations.len();

        let (task_tx, task_rx) = mpsc::unbounded_channel();
        for invocation in invocations {
            // Receiver is alive until the workers drain it.
            let _ = task_tx.send(Arc::new(invocation));
        }
        drop(task_tx);
        let queue: TaskQueue = Arc::new(Mutex::new(task_rx));

        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let worker_count = self.workers.min(submitted).max(1);
        let handles = (0..worker_count)
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    Arc::clone(&queue),
                    Arc::clone(&executor),
                    done_tx.clone(),
                ))
            })
            .collect();

        tracing::debug!(submitted, workers = worker_count, "batch submitted to pool");

        PoolRun {
            completions: done_rx,
            handles,
            stats: PoolStats {
                submitted,
                completed: 0,
                workers: worker_count,
            },
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

impl PoolRun {
    /// Next completed result, `None` once every submission is accounted for
    pub async fn next(&mut self) -> Option<RunResult> {
        if self.is_complete() {
            return None;
        }
        let result = self.completions.recv().await?;
        self.stats.completed += 1;
        Some(result)
    }

    /// True once a result has been received for every submission
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stats.completed >= self.stats.submitted
    }

    /// Current statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Wait for all workers to exit
    pub async fn shutdown(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("worker exited abnormally: {e}");
            }
        }
    }
}

/// Host parallelism, falling back to one worker
#[must_use]
pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Worker loop (runs in its own tokio task)
async fn worker_loop(
    worker: usize,
    queue: TaskQueue,
    executor: Arc<dyn InvocationExecutor>,
    done: mpsc::UnboundedSender<RunResult>,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(invocation) = next else { break };

        let result = run_contained(&executor, invocation).await;
        if done.send(result).is_err() {
            // Nobody is collecting any more.
            break;
        }
    }
    tracing::debug!(worker, "worker finished");
}

/// Run one invocation in its own task so a panic stays local to it
async fn run_contained(
    executor: &Arc<dyn InvocationExecutor>,
    invocation: Arc<Invocation>,
) -> RunResult {
    let task_executor = Arc::clone(executor);
    let task_invocation = Arc::clone(&invocation);
    let joined = tokio::spawn(async move { task_executor.execute(&task_invocation).await }).await;

    let fault = match joined {
        Ok(result) => return result,
        Err(e) => describe_join_error(e),
    };
    tracing::error!(run_id = %invocation.run_id, "worker fault: {fault}");

    let task_executor = Arc::clone(executor);
    let task_invocation = Arc::clone(&invocation);
    let task_fault = fault.clone();
    let recorded = tokio::spawn(async move {
        task_executor
            .record_fault(&task_invocation, &task_fault)
            .await
    })
    .await;

    recorded.unwrap_or_else(|_| {
        RunResult::fault(
            invocation.run_id.clone(),
            PathBuf::new(),
            RunError::WorkerFault(fault),
        )
    })
}

fn describe_join_error(error: JoinError) -> String {
    if !error.is_panic() {
        return format!("task cancelled: {error}");
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::{InvocationBuilder, SimulatorEntry};
    use crate::types::{Protocol, Strategy};
    use mlo_catalog::ScenarioDefinition;
    use parking_lot::Mutex as SyncMutex;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn invocations(n: u64) -> Vec<Invocation> {
        let builder = InvocationBuilder::new(SimulatorEntry::default(), "r.csv");
        let scenario = ScenarioDefinition::new("s", "", "");
        (1..=n)
            .map(|seed| builder.build("c", &scenario, Strategy::Greedy, Protocol::Udp, seed))
            .collect()
    }

    fn ok(invocation: &Invocation) -> RunResult {
        RunResult {
            run_id: invocation.run_id.clone(),
            success: true,
            exit_code: Some(0),
            duration_secs: 0.0,
            log_path: PathBuf::new(),
            error: None,
        }
    }

    /// Tracks how many runs are in flight at once
    #[derive(Default)]
    struct ConcurrencyGauge {
        current: AtomicUsize,
        peak: AtomicUsize,
        seen: SyncMutex<Vec<u64>>,
    }

    #[async_trait::async_trait]
    impl InvocationExecutor for ConcurrencyGauge {
        async fn execute(&self, invocation: &Invocation) -> RunResult {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            // Later seeds finish first.
            tokio::time::sleep(Duration::from_millis(40 - invocation.seed * 3)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            self.seen.lock().push(invocation.seed);
            ok(invocation)
        }
    }

    struct PanicsOnEven;

    #[async_trait::async_trait]
    impl InvocationExecutor for PanicsOnEven {
        async fn execute(&self, invocation: &Invocation) -> RunResult {
            assert!(invocation.seed % 2 == 1, "seed {} exploded", invocation.seed);
            ok(invocation)
        }
    }

    #[tokio::test]
    async fn respects_worker_bound() {
        let gauge = Arc::new(ConcurrencyGauge::default());
        let pool = WorkerPool::new(3);
        let mut run = pool.submit_all(gauge.clone(), invocations(10));

        let mut ids = HashSet::new();
        while let Some(result) = run.next().await {
            ids.insert(result.run_id);
        }
        run.shutdown().await;

        assert_eq!(ids.len(), 10);
        assert!(gauge.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(gauge.seen.lock().len(), 10);
    }

    #[tokio::test]
    async fn panics_become_worker_faults() {
        let pool = WorkerPool::new(2);
        let mut run = pool.submit_all(Arc::new(PanicsOnEven), invocations(6));

        let mut faults = 0;
        let mut successes = 0;
        while let Some(result) = run.next().await {
            match result.error {
                Some(RunError::WorkerFault(message)) => {
                    assert!(message.contains("exploded"));
                    faults += 1;
                }
                None => successes += 1,
                Some(other) => panic!("unexpected error {other:?}"),
            }
        }

        assert_eq!(faults, 3);
        assert_eq!(successes, 3);
        assert_eq!(run.stats().completed, 6);
    }

    #[tokio::test]
    async fn empty_batch_completes_immediately() {
        let pool = WorkerPool::new(4);
        let mut run = pool.submit_all(Arc::new(PanicsOnEven), Vec::new());
        assert!(run.is_complete());
        assert!(run.next().await.is_none());
        run.shutdown().await;
    }

    #[test]
    fn worker_count_is_at_least_one() {
        assert_eq!(WorkerPool::new(0).workers(), 1);
        assert!(WorkerPool::with_available_parallelism().workers() >= 1);
    }
}
