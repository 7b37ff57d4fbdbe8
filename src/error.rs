use std::time::Duration;

use thiserror::Error;

/// Boxed error type used for caller-supplied failure causes (task errors,
/// handler errors, supplier errors).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience result type for batch execution.
pub type BatchResult<T> = Result<T, BatchError>;

/// Error type returned by the parallel batch executor.
#[derive(Debug, Error)]
pub enum BatchError {
    /// A caller-facing precondition was violated (e.g. `batch_size == 0`).
    ///
    /// No work has been performed when this is returned.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// One or more partition tasks failed, or the aggregate wait ended early.
    ///
    /// Wraps the first observed cause. Sibling partitions are cancelled
    /// best-effort and no partial result is exposed.
    #[error("batch execution failed: {source}")]
    ExecutionFailed {
        #[source]
        source: BoxError,
    },
}

/// Error type for worker pool construction and task admission.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Pool sizing parameters were invalid (e.g. non-positive compute time
    /// for an I/O-bound pool).
    #[error("invalid pool configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The bounded backlog is full, every worker is busy, and the saturation
    /// policy is [`crate::pool::SaturationPolicy::Reject`].
    #[error("pool backlog is full, task rejected")]
    Saturated,

    /// The pool is shutting down and no longer admits work.
    #[error("pool is shut down")]
    ShutDown,
}

/// Error type observed when joining a [`crate::pool::TaskHandle`].
#[derive(Debug, Error)]
pub enum JoinError {
    /// The task panicked on its worker thread.
    ///
    /// The panic is contained by the pool (the worker survives); the payload
    /// message is carried here.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was discarded before producing a result (the pool was shut
    /// down while the task was still queued).
    #[error("task discarded before completion (pool shut down)")]
    Disconnected,

    /// The deadline passed before the task settled.
    ///
    /// Only produced by [`crate::pool::TaskHandle::join_until`]; an unbounded
    /// join never returns this.
    #[error("deadline elapsed before task completed")]
    TimedOut,
}

/// Error type returned by the composite query helper.
///
/// All supplier failures are normalized into one of these variants; the
/// underlying cause travels along as [`std::error::Error::source`] rather
/// than being re-thrown raw.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The shared deadline for the combined wait elapsed.
    #[error("query timed out after {timeout:?}")]
    TimedOut { timeout: Duration },

    /// The wait ended early because the pool was shut down.
    #[error("query interrupted: pool shut down while waiting")]
    Interrupted,

    /// One or more suppliers failed (returned an error or panicked).
    #[error("query failed: {source}")]
    Failed {
        #[source]
        source: BoxError,
    },
}
