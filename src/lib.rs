//! `batch-reconcile` is a small library for running large in-memory
//! workloads as parallel batches over a bounded [`pool::WorkerPool`], and
//! for reconciling two versions of a keyed collection into
//! add/update/delete change sets.
//!
//! The two primary entrypoints are [`batch::BatchExecutor::execute`]
//! (fan-out/fan-in batch execution with all-or-nothing failure) and
//! [`diff::diff`] (pure three-way reconciliation), which compose: a
//! reconciliation handler can itself push a large change set through the
//! batch executor.
//!
//! ## Quick example: batch execution
//!
//! ```rust
//! use batch_reconcile::batch::BatchExecutor;
//! use batch_reconcile::pool::{PoolOptions, WorkerPool};
//!
//! # fn main() -> Result<(), batch_reconcile::BatchError> {
//! let pool = WorkerPool::cpu_bound(PoolOptions::default());
//! let engine = BatchExecutor::new(pool);
//!
//! let items: Vec<i64> = (1..=10).collect();
//! // 4 partitions of at most 3 items each, processed in parallel; the
//! // merged output preserves partition order.
//! let doubled = engine.execute(&items, 3, |chunk| {
//!     Ok(chunk.iter().map(|v| v * 2).collect())
//! })?;
//! assert_eq!(doubled, vec![2, 4, 6, 8, 10, 12, 14, 16, 18, 20]);
//! # Ok(())
//! # }
//! ```
//!
//! Failure is all-or-nothing: if any partition's task fails, in-flight
//! siblings are cancelled cooperatively and the call returns a single
//! [`BatchError::ExecutionFailed`] wrapping the first observed cause.
//!
//! ## Quick example: reconciliation
//!
//! ```rust
//! use batch_reconcile::diff::diff;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct User { id: u32, name: String }
//!
//! let old = vec![
//!     User { id: 1, name: "ada".into() },
//!     User { id: 2, name: "grace".into() },
//! ];
//! let new = vec![
//!     User { id: 1, name: "ada lovelace".into() },
//!     User { id: 3, name: "edsger".into() },
//! ];
//!
//! let changes = diff(&old, &new, |u| Some(u.id));
//! assert_eq!(changes.to_add.len(), 1); // id 3
//! assert_eq!(changes.to_update.len(), 1); // id 1, new-side value
//! assert_eq!(changes.to_delete.len(), 1); // id 2, old-side value
//! assert!(changes.has_changes());
//! ```
//!
//! Driving a diff into side effects, with deletions reported by key:
//!
//! ```rust
//! use batch_reconcile::diff::{batch_crud_by_key, KeyedChangeHandlers};
//!
//! # fn main() -> Result<(), batch_reconcile::BoxError> {
//! let old = vec![(1, "a"), (2, "b")];
//! let new = vec![(1, "a"), (3, "c")];
//!
//! let mut deleted_ids = Vec::new();
//! let handlers = KeyedChangeHandlers::new()
//!     .on_add(|rows: &[(i32, &str)]| {
//!         assert_eq!(rows, &[(3, "c")]);
//!         Ok(())
//!     })
//!     .on_delete_keys(|ids: &[i32]| {
//!         deleted_ids.extend_from_slice(ids);
//!         Ok(())
//!     });
//! batch_crud_by_key(&old, &new, |row| Some(row.0), handlers)?;
//! assert_eq!(deleted_ids, vec![2]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pools
//!
//! [`pool::WorkerPool`] is a shared, long-lived resource: size it for
//! CPU-bound work ([`pool::WorkerPool::cpu_bound`]) or I/O-bound work
//! ([`pool::WorkerPool::io_bound`], which takes the workload's
//! blocking-to-compute ratio), bound its backlog, and pick a saturation
//! policy. [`batch::execute`] uses a lazily-created process-wide default
//! pool; call [`pool::shutdown_default_pool`] during process teardown to
//! drain it.
//!
//! ## Modules
//!
//! - [`pool`]: worker pool provisioning and task handles
//! - [`batch`]: partitioning and the parallel batch executor
//! - [`diff`]: keyed reconciliation and change handlers
//! - [`query`]: composite concurrent queries with a shared timeout
//! - [`error`]: error types used across the crate

pub mod batch;
pub mod diff;
pub mod error;
pub mod pool;
pub mod query;

pub use error::{BatchError, BatchResult, BoxError, JoinError, PoolError, QueryError};
