use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Events emitted by the batch executor during a run.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    RunStarted { partitions: usize, items: usize },
    PartitionStarted { index: usize, len: usize },
    PartitionFinished { index: usize, output_len: usize },
    PartitionFailed { index: usize, message: String },
    /// The partition observed a cancelled run before starting and did not
    /// invoke the task.
    PartitionSkipped { index: usize },
    RunFinished {
        elapsed: Duration,
        metrics: BatchMetricsSnapshot,
    },
    RunFailed { elapsed: Duration, message: String },
}

/// Observer hook for batch execution events.
///
/// Events fire on whichever thread produces them: run-level events on the
/// submitting thread, partition-level events on worker threads.
pub trait BatchObserver: Send + Sync {
    fn on_event(&self, event: &BatchEvent);
}

/// A simple stderr logger for batch events.
#[derive(Default)]
pub struct StdErrBatchObserver;

impl BatchObserver for StdErrBatchObserver {
    fn on_event(&self, event: &BatchEvent) {
        eprintln!("[batch] {event:?}");
    }
}

/// Real-time metrics for a batch run.
///
/// The executor updates these counters during execution; callers can
/// snapshot them at any time.
pub struct BatchMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    items_in: AtomicU64,
    items_out: AtomicU64,
    partitions_submitted: AtomicU64,
    partitions_finished: AtomicU64,
    partitions_failed: AtomicU64,
    partitions_skipped: AtomicU64,

    active_partitions: AtomicUsize,
    max_active_partitions: AtomicUsize,
}

impl BatchMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            elapsed_ns: AtomicU64::new(0),
            items_in: AtomicU64::new(0),
            items_out: AtomicU64::new(0),
            partitions_submitted: AtomicU64::new(0),
            partitions_finished: AtomicU64::new(0),
            partitions_failed: AtomicU64::new(0),
            partitions_skipped: AtomicU64::new(0),
            active_partitions: AtomicUsize::new(0),
            max_active_partitions: AtomicUsize::new(0),
        }
    }

    pub(crate) fn begin_run(&self, items: usize) {
        self.run_id.fetch_add(1, Ordering::SeqCst);
        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.items_in.store(items as u64, Ordering::SeqCst);
        self.items_out.store(0, Ordering::SeqCst);
        self.partitions_submitted.store(0, Ordering::SeqCst);
        self.partitions_finished.store(0, Ordering::SeqCst);
        self.partitions_failed.store(0, Ordering::SeqCst);
        self.partitions_skipped.store(0, Ordering::SeqCst);
        self.active_partitions.store(0, Ordering::SeqCst);
        self.max_active_partitions.store(0, Ordering::SeqCst);
    }

    pub(crate) fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub(crate) fn on_partition_submitted(&self) {
        let _ = self.partitions_submitted.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn on_partition_start(&self) {
        let now = self.active_partitions.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_active_partitions, now);
    }

    pub(crate) fn on_partition_end(&self, output_len: usize) {
        let _ = self.partitions_finished.fetch_add(1, Ordering::SeqCst);
        let _ = self.items_out.fetch_add(output_len as u64, Ordering::SeqCst);
        let _ = self.active_partitions.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn on_partition_failed(&self) {
        let _ = self.partitions_failed.fetch_add(1, Ordering::SeqCst);
        let _ = self.active_partitions.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn on_partition_skipped(&self) {
        let _ = self.partitions_skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> BatchMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        let elapsed = if elapsed_ns > 0 {
            Some(Duration::from_nanos(elapsed_ns))
        } else {
            None
        };

        BatchMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed,
            items_in: self.items_in.load(Ordering::SeqCst),
            items_out: self.items_out.load(Ordering::SeqCst),
            partitions_submitted: self.partitions_submitted.load(Ordering::SeqCst),
            partitions_finished: self.partitions_finished.load(Ordering::SeqCst),
            partitions_failed: self.partitions_failed.load(Ordering::SeqCst),
            partitions_skipped: self.partitions_skipped.load(Ordering::SeqCst),
            max_active_partitions: self.max_active_partitions.load(Ordering::SeqCst),
        }
    }
}

impl Default for BatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    loop {
        let cur = dst.load(Ordering::SeqCst);
        if now <= cur {
            break;
        }
        if dst
            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
}

/// Immutable snapshot of [`BatchMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub items_in: u64,
    pub items_out: u64,
    pub partitions_submitted: u64,
    pub partitions_finished: u64,
    pub partitions_failed: u64,
    pub partitions_skipped: u64,
    pub max_active_partitions: usize,
}

impl fmt::Display for BatchMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, items={}/{}, partitions={}/{} (failed={}, skipped={}), max_active={}, elapsed={:?}",
            self.run_id,
            self.items_out,
            self.items_in,
            self.partitions_finished,
            self.partitions_submitted,
            self.partitions_failed,
            self.partitions_skipped,
            self.max_active_partitions,
            self.elapsed
        )
    }
}
