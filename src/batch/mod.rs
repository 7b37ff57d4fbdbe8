//! Parallel batch execution: fan-out/fan-in over a bounded worker pool.
//!
//! [`BatchExecutor::execute`] splits an input slice into fixed-size
//! partitions (see [`partition`]), schedules one unit of work per partition
//! on a [`WorkerPool`], waits for every unit to settle, and concatenates the
//! per-partition outputs back into one result in partition order.
//!
//! Failure is all-or-nothing: the first observed failure (task error, task
//! panic, pool saturation, or pool shutdown mid-wait) cancels the run's
//! shared [`CancellationToken`], partitions that have not started become
//! no-ops, and the call returns a single
//! [`BatchError::ExecutionFailed`] wrapping the first cause. No partial
//! result is ever returned. Cancellation is fire-and-forget: the failure
//! path does not wait for partitions that are already running.
//!
//! There is no per-call deadline and no retry; admission control is the
//! pool's concern (a full bounded backlog surfaces through its saturation
//! policy).

mod cancel;
mod observer;
mod partition;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{BatchError, BatchResult, BoxError};
use crate::pool::{TaskHandle, WorkerPool, default_pool};

pub use cancel::CancellationToken;
pub use observer::{
    BatchEvent, BatchMetrics, BatchMetricsSnapshot, BatchObserver, StdErrBatchObserver,
};
pub use partition::partition;

use partition::partition_ranges;

/// How one partition's unit of work settled on its worker.
enum PartitionOutcome<R> {
    Done(Vec<R>),
    Failed(BoxError),
    Skipped,
}

/// A reusable executor binding a [`WorkerPool`] to batch runs.
pub struct BatchExecutor {
    pool: WorkerPool,
    observer: Option<Arc<dyn BatchObserver>>,
    metrics: Arc<BatchMetrics>,
}

impl BatchExecutor {
    pub fn new(pool: WorkerPool) -> Self {
        Self {
            pool,
            observer: None,
            metrics: Arc::new(BatchMetrics::new()),
        }
    }

    /// Attach an observer for execution events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time execution metrics.
    pub fn metrics(&self) -> Arc<BatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run `task` over `items` in partitions of at most `batch_size`
    /// elements, in parallel, and merge the outputs in partition order.
    ///
    /// An empty `items` returns an empty result without touching the pool.
    /// `batch_size == 0` fails with [`BatchError::InvalidArgument`] and never
    /// invokes `task`. Within a partition the output order is whatever
    /// `task` produces.
    pub fn execute<T, R, F>(&self, items: &[T], batch_size: usize, task: F) -> BatchResult<Vec<R>>
    where
        T: Clone + Send + 'static,
        R: Send + 'static,
        F: Fn(&[T]) -> Result<Vec<R>, BoxError> + Send + Sync + 'static,
    {
        if batch_size == 0 {
            return Err(BatchError::InvalidArgument {
                message: "batch_size must be >= 1".to_string(),
            });
        }
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let ranges = partition_ranges(items.len(), batch_size);
        self.metrics.begin_run(items.len());
        emit(
            &self.observer,
            BatchEvent::RunStarted {
                partitions: ranges.len(),
                items: items.len(),
            },
        );

        let token = CancellationToken::new();
        let task = Arc::new(task);
        let mut handles: Vec<TaskHandle<PartitionOutcome<R>>> = Vec::with_capacity(ranges.len());

        for (index, range) in ranges.into_iter().enumerate() {
            let chunk = items[range].to_vec();
            let job_token = token.clone();
            let job_task = Arc::clone(&task);
            let job_metrics = Arc::clone(&self.metrics);
            let job_observer = self.observer.clone();
            let submitted = self.pool.submit(move || {
                run_partition(index, chunk, job_token, job_task, job_metrics, job_observer)
            });
            match submitted {
                Ok(handle) => {
                    self.metrics.on_partition_submitted();
                    handles.push(handle);
                }
                Err(cause) => {
                    token.cancel();
                    return Err(self.fail(cause.into(), start));
                }
            }
        }

        // Fan-in, in partition order. A skipped partition means a sibling
        // cancelled the run; keep scanning for the actual cause.
        let mut merged: Vec<R> = Vec::new();
        let mut failure: Option<BoxError> = None;
        for handle in handles {
            match handle.join() {
                Ok(PartitionOutcome::Done(mut rows)) => merged.append(&mut rows),
                Ok(PartitionOutcome::Skipped) => continue,
                Ok(PartitionOutcome::Failed(cause)) => {
                    failure = Some(cause);
                    break;
                }
                Err(cause) => {
                    failure = Some(cause.into());
                    break;
                }
            }
        }
        if let Some(cause) = failure {
            token.cancel();
            return Err(self.fail(cause, start));
        }

        let elapsed = start.elapsed();
        self.metrics.end_run(elapsed);
        emit(
            &self.observer,
            BatchEvent::RunFinished {
                elapsed,
                metrics: self.metrics.snapshot(),
            },
        );
        Ok(merged)
    }

    fn fail(&self, source: BoxError, start: Instant) -> BatchError {
        let elapsed = start.elapsed();
        self.metrics.end_run(elapsed);
        emit(
            &self.observer,
            BatchEvent::RunFailed {
                elapsed,
                message: source.to_string(),
            },
        );
        BatchError::ExecutionFailed { source }
    }
}

/// Run `task` over `items` on the process-wide
/// [`default_pool`](crate::pool::default_pool).
///
/// Equivalent to `BatchExecutor::new(default_pool().clone()).execute(..)`;
/// see [`BatchExecutor::execute`] for semantics.
pub fn execute<T, R, F>(items: &[T], batch_size: usize, task: F) -> BatchResult<Vec<R>>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(&[T]) -> Result<Vec<R>, BoxError> + Send + Sync + 'static,
{
    BatchExecutor::new(default_pool().clone()).execute(items, batch_size, task)
}

fn run_partition<T, R, F>(
    index: usize,
    chunk: Vec<T>,
    token: CancellationToken,
    task: Arc<F>,
    metrics: Arc<BatchMetrics>,
    observer: Option<Arc<dyn BatchObserver>>,
) -> PartitionOutcome<R>
where
    F: Fn(&[T]) -> Result<Vec<R>, BoxError> + Send + Sync,
{
    if token.is_cancelled() {
        metrics.on_partition_skipped();
        emit(&observer, BatchEvent::PartitionSkipped { index });
        return PartitionOutcome::Skipped;
    }

    metrics.on_partition_start();
    emit(
        &observer,
        BatchEvent::PartitionStarted {
            index,
            len: chunk.len(),
        },
    );

    // Catch panics here rather than relying on the pool's containment: the
    // run must be cancelled the moment the panic happens, not when the
    // fan-in loop eventually joins this partition's handle.
    let settled = match panic::catch_unwind(AssertUnwindSafe(|| task(chunk.as_slice()))) {
        Ok(settled) => settled,
        Err(payload) => {
            token.cancel();
            metrics.on_partition_failed();
            emit(
                &observer,
                BatchEvent::PartitionFailed {
                    index,
                    message: crate::pool::panic_message(payload.as_ref()),
                },
            );
            panic::resume_unwind(payload);
        }
    };

    match settled {
        Ok(rows) => {
            metrics.on_partition_end(rows.len());
            emit(
                &observer,
                BatchEvent::PartitionFinished {
                    index,
                    output_len: rows.len(),
                },
            );
            PartitionOutcome::Done(rows)
        }
        Err(cause) => {
            // First failure cancels the run so queued siblings skip.
            token.cancel();
            metrics.on_partition_failed();
            emit(
                &observer,
                BatchEvent::PartitionFailed {
                    index,
                    message: cause.to_string(),
                },
            );
            PartitionOutcome::Failed(cause)
        }
    }
}

fn emit(observer: &Option<Arc<dyn BatchObserver>>, event: BatchEvent) {
    if let Some(obs) = observer {
        obs.on_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::{BatchEvent, BatchExecutor, BatchObserver};
    use crate::error::BatchError;
    use crate::pool::{PoolOptions, WorkerPool};

    fn executor(workers: usize) -> BatchExecutor {
        BatchExecutor::new(WorkerPool::fixed(workers, PoolOptions::default()))
    }

    #[test]
    fn merges_partition_outputs_in_partition_order() {
        let engine = executor(4);
        let items: Vec<i64> = (0..100).collect();
        let out = engine
            .execute(&items, 7, |chunk| Ok(chunk.iter().map(|v| v * 2).collect()))
            .unwrap();
        let expected: Vec<i64> = items.iter().map(|v| v * 2).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn partitions_run_concurrently() {
        let engine = executor(4);
        let items: Vec<i32> = (0..8).collect();

        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let active2 = Arc::clone(&active);
        let max_active2 = Arc::clone(&max_active);

        let out = engine
            .execute(&items, 1, move |chunk: &[i32]| {
                let now = active2.fetch_add(1, Ordering::SeqCst) + 1;
                max_active2.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                active2.fetch_sub(1, Ordering::SeqCst);
                Ok(chunk.to_vec())
            })
            .unwrap();

        assert_eq!(out, items);
        assert!(max_active.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn metrics_reflect_a_finished_run() {
        let engine = executor(2);
        let metrics = engine.metrics();
        let items: Vec<i32> = (0..10).collect();

        let out = engine
            .execute(&items, 4, |chunk: &[i32]| {
                // one output per pair of inputs
                Ok(chunk.chunks(2).map(|p| p.len() as i32).collect())
            })
            .unwrap();
        assert_eq!(out.len(), 6);

        let snap = metrics.snapshot();
        assert_eq!(snap.items_in, 10);
        assert_eq!(snap.items_out, 6);
        assert_eq!(snap.partitions_submitted, 3);
        assert_eq!(snap.partitions_finished, 3);
        assert_eq!(snap.partitions_failed, 0);
        assert!(snap.elapsed.is_some());
    }

    struct EventLog {
        run_failed: AtomicUsize,
        partition_failed: AtomicUsize,
    }

    impl BatchObserver for EventLog {
        fn on_event(&self, event: &BatchEvent) {
            match event {
                BatchEvent::RunFailed { .. } => {
                    self.run_failed.fetch_add(1, Ordering::SeqCst);
                }
                BatchEvent::PartitionFailed { .. } => {
                    self.partition_failed.fetch_add(1, Ordering::SeqCst);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn observer_sees_failure_events() {
        let log = Arc::new(EventLog {
            run_failed: AtomicUsize::new(0),
            partition_failed: AtomicUsize::new(0),
        });
        let obs_trait: Arc<dyn BatchObserver> = log.clone();
        let engine = executor(1).with_observer(obs_trait);
        let items: Vec<i32> = (0..4).collect();

        let err = engine
            .execute(&items, 2, |_chunk: &[i32]| -> Result<Vec<i32>, _> {
                Err("task refused".into())
            })
            .unwrap_err();
        assert!(matches!(err, BatchError::ExecutionFailed { .. }));
        assert_eq!(log.run_failed.load(Ordering::SeqCst), 1);
        assert!(log.partition_failed.load(Ordering::SeqCst) >= 1);
    }
}
