//! Cooperative cancellation for in-flight batch work.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared cancellation flag.
///
/// The batch executor cancels the run's token when any partition fails;
/// partitions that have not started yet observe the flag and become no-ops.
/// Cancellation is cooperative: a partition task that is already running is
/// never preempted, but long-running tasks can poll a clone of the token to
/// stop early.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
