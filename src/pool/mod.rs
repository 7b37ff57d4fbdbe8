//! Worker pool provisioning: bounded thread pools sized for CPU-bound or
//! I/O-bound workloads.
//!
//! A [`WorkerPool`] is a shared, long-lived unit of concurrency capacity:
//!
//! - Core workers are spawned lazily on demand and persist for the life of
//!   the pool; excess workers (up to [`PoolOptions::max_workers`]) are
//!   spawned when a bounded backlog fills up and retire after
//!   [`PoolOptions::keep_alive`] without work.
//! - Every worker thread is named `"{prefix}-{n}"` with a monotonically
//!   increasing counter, and contains job panics: a panicking job is logged
//!   to stderr and surfaced through its [`TaskHandle`] without taking the
//!   worker down.
//! - Admission control is synchronous: when the backlog is bounded and full
//!   and no excess worker can be spawned, the configured
//!   [`SaturationPolicy`] applies.
//!
//! Pools are cheap to clone (clones share the same workers) and are meant to
//! be created once per logical purpose and shut down explicitly via
//! [`WorkerPool::shutdown`]. A process-wide default is available through
//! [`default_pool`].

mod handle;

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, LazyLock, Mutex, MutexGuard, mpsc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::PoolError;

pub use handle::TaskHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Backlog capacity for queued jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backlog {
    /// FIFO queue with no capacity limit (the default).
    Unbounded,
    /// FIFO queue holding at most this many queued jobs.
    Bounded(usize),
}

/// Behavior applied when the backlog is full and no worker can be added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaturationPolicy {
    /// Reject the job with [`PoolError::Saturated`] (the default).
    Reject,
    /// Run the job synchronously on the submitting thread.
    CallerRuns,
}

/// Configuration for a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Prefix for worker thread names (`"{prefix}-{n}"`).
    pub name_prefix: String,
    /// When true (the default), worker threads are detached and the process
    /// may exit without waiting for them. When false,
    /// [`WorkerPool::shutdown`] joins every worker thread.
    pub daemon: bool,
    /// Upper bound on worker threads, including excess workers.
    ///
    /// If `None`, defaults to twice the core worker count.
    pub max_workers: Option<usize>,
    /// How long an excess worker waits for work before retiring.
    pub keep_alive: Duration,
    /// Backlog capacity for queued jobs.
    pub backlog: Backlog,
    /// Behavior when the backlog is full and the pool is at `max_workers`.
    pub saturation: SaturationPolicy,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            name_prefix: "worker".to_string(),
            daemon: true,
            max_workers: None,
            keep_alive: Duration::from_secs(60),
            backlog: Backlog::Unbounded,
            saturation: SaturationPolicy::Reject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Draining,
    Stopped,
}

struct PoolState {
    queue: VecDeque<Job>,
    workers: usize,
    idle_workers: usize,
    phase: Phase,
    /// Worker join handles, kept only when `daemon == false`.
    joinable: Vec<JoinHandle<()>>,
}

struct PoolInner {
    core_workers: usize,
    max_workers: usize,
    keep_alive: Duration,
    backlog_cap: Option<usize>,
    saturation: SaturationPolicy,
    daemon: bool,
    name_prefix: String,
    next_worker_id: AtomicUsize,
    state: Mutex<PoolState>,
    /// Workers wait here for queued jobs.
    work_available: Condvar,
    /// Shutdown waits here for the queue to drain and workers to exit.
    drained: Condvar,
}

enum Admitted {
    Queued,
    CallerRuns(Job),
}

/// A bounded pool of named worker threads with FIFO job dispatch.
///
/// See the [module docs](self) for the lifecycle and admission rules.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("core_workers", &self.inner.core_workers)
            .field("max_workers", &self.inner.max_workers)
            .field("name_prefix", &self.inner.name_prefix)
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Create a pool sized for CPU-bound work: core workers = available
    /// parallelism.
    pub fn cpu_bound(opts: PoolOptions) -> Self {
        Self::fixed(available_cpus(), opts)
    }

    /// Create a pool sized for I/O-bound work.
    ///
    /// Core workers = `cpus * (1 + wait_time / compute_time)`, rounded, where
    /// `wait_time / compute_time` is the workload's blocking-to-compute
    /// ratio.
    ///
    /// Fails with [`PoolError::InvalidConfiguration`] when
    /// `compute_time <= 0`.
    pub fn io_bound(wait_time: f64, compute_time: f64, opts: PoolOptions) -> Result<Self, PoolError> {
        if !(compute_time > 0.0) {
            return Err(PoolError::InvalidConfiguration {
                message: format!("compute_time must be > 0, got {compute_time}"),
            });
        }
        let cpus = available_cpus() as f64;
        let core = (cpus * (1.0 + wait_time / compute_time)).round().max(1.0) as usize;
        Ok(Self::fixed(core, opts))
    }

    /// Create a pool with an explicit core worker count.
    ///
    /// # Panics
    ///
    /// Panics if `core_workers == 0` or `max_workers == Some(0)`.
    pub fn fixed(core_workers: usize, opts: PoolOptions) -> Self {
        assert!(core_workers > 0, "core_workers must be > 0");
        if let Some(n) = opts.max_workers {
            assert!(n > 0, "max_workers must be > 0 when set");
        }
        let max_workers = opts
            .max_workers
            .unwrap_or_else(|| core_workers.saturating_mul(2))
            .max(core_workers);

        let inner = PoolInner {
            core_workers,
            max_workers,
            keep_alive: opts.keep_alive,
            backlog_cap: match opts.backlog {
                Backlog::Unbounded => None,
                Backlog::Bounded(n) => Some(n),
            },
            saturation: opts.saturation,
            daemon: opts.daemon,
            name_prefix: opts.name_prefix,
            next_worker_id: AtomicUsize::new(0),
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                workers: 0,
                idle_workers: 0,
                phase: Phase::Running,
                joinable: Vec::new(),
            }),
            work_available: Condvar::new(),
            drained: Condvar::new(),
        };
        Self { inner: Arc::new(inner) }
    }

    /// Core worker count this pool was sized with.
    pub fn core_workers(&self) -> usize {
        self.inner.core_workers
    }

    /// Maximum worker count, including excess workers.
    pub fn max_workers(&self) -> usize {
        self.inner.max_workers
    }

    /// Submit a job and get a [`TaskHandle`] for its result.
    ///
    /// Fails with [`PoolError::ShutDown`] after [`Self::shutdown`], or with
    /// [`PoolError::Saturated`] under the `Reject` saturation policy when the
    /// bounded backlog is full and the pool is at `max_workers`. Under
    /// `CallerRuns` the job executes on the submitting thread instead and
    /// the returned handle is already resolved.
    pub fn submit<T, F>(&self, job: F) -> Result<TaskHandle<T>, PoolError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Result<T, String>>();
        let wrapped: Job = Box::new(move || {
            match panic::catch_unwind(AssertUnwindSafe(job)) {
                Ok(value) => {
                    // The submitter may have dropped the handle already.
                    let _ = tx.send(Ok(value));
                }
                Err(payload) => {
                    let msg = panic_message(payload.as_ref());
                    let current = thread::current();
                    eprintln!(
                        "[pool][panic] thread={} id={:?} err={}",
                        current.name().unwrap_or("<unnamed>"),
                        current.id(),
                        msg
                    );
                    let _ = tx.send(Err(msg));
                }
            }
        });

        match self.admit(wrapped)? {
            Admitted::Queued => {}
            Admitted::CallerRuns(job) => job(),
        }
        Ok(TaskHandle { rx })
    }

    fn admit(&self, job: Job) -> Result<Admitted, PoolError> {
        let inner = &self.inner;
        let mut s = inner.state.lock().expect("pool mutex poisoned");
        if s.phase != Phase::Running {
            return Err(PoolError::ShutDown);
        }

        // Below core capacity with nobody idle: grow a core worker.
        if s.workers < inner.core_workers && s.idle_workers == 0 {
            s.queue.push_back(job);
            Self::spawn_worker(inner, &mut s, true);
            return Ok(Admitted::Queued);
        }

        let under_cap = inner.backlog_cap.is_none_or(|cap| s.queue.len() < cap);
        if under_cap {
            s.queue.push_back(job);
            inner.work_available.notify_one();
            return Ok(Admitted::Queued);
        }

        // Bounded backlog is full: add an excess worker if allowed. The
        // queue briefly exceeds its cap while the new worker starts up.
        if s.workers < inner.max_workers {
            s.queue.push_back(job);
            Self::spawn_worker(inner, &mut s, false);
            return Ok(Admitted::Queued);
        }

        match inner.saturation {
            SaturationPolicy::Reject => Err(PoolError::Saturated),
            SaturationPolicy::CallerRuns => Ok(Admitted::CallerRuns(job)),
        }
    }

    fn spawn_worker(inner: &Arc<PoolInner>, s: &mut MutexGuard<'_, PoolState>, is_core: bool) {
        let id = inner.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{}", inner.name_prefix, id);
        let for_worker = Arc::clone(inner);
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || worker_loop(for_worker, is_core))
            .expect("failed to spawn worker thread");
        s.workers += 1;
        if !inner.daemon {
            s.joinable.push(handle);
        }
    }

    /// Stop admitting work, drain the queue for up to `grace`, then discard
    /// whatever is still queued.
    ///
    /// Handles of discarded jobs observe
    /// [`JoinError::Disconnected`](crate::error::JoinError::Disconnected).
    /// When the pool was built with `daemon == false`, worker threads are
    /// joined before returning. Calling `shutdown` twice is a no-op.
    pub fn shutdown(&self, grace: Duration) {
        let inner = &self.inner;
        let mut s = inner.state.lock().expect("pool mutex poisoned");
        if s.phase != Phase::Running {
            return;
        }
        s.phase = Phase::Draining;
        inner.work_available.notify_all();

        let deadline = Instant::now() + grace;
        while !(s.queue.is_empty() && s.workers == 0) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (guard, _timeout) = inner
                .drained
                .wait_timeout(s, deadline - now)
                .expect("pool mutex poisoned");
            s = guard;
        }

        // Grace elapsed (or fully drained): abandon whatever is left.
        s.queue.clear();
        s.phase = Phase::Stopped;
        inner.work_available.notify_all();
        let joinable = std::mem::take(&mut s.joinable);
        drop(s);

        for handle in joinable {
            let _ = handle.join();
        }
    }
}

enum Next {
    Run(Job),
    Exit,
}

fn worker_loop(inner: Arc<PoolInner>, is_core: bool) {
    loop {
        let next = {
            let mut s = inner.state.lock().expect("pool mutex poisoned");
            loop {
                if let Some(job) = s.queue.pop_front() {
                    break Next::Run(job);
                }
                match s.phase {
                    Phase::Running => {}
                    Phase::Draining | Phase::Stopped => break Next::Exit,
                }
                s.idle_workers += 1;
                if is_core {
                    s = inner.work_available.wait(s).expect("pool mutex poisoned");
                    s.idle_workers -= 1;
                } else {
                    let (guard, timeout) = inner
                        .work_available
                        .wait_timeout(s, inner.keep_alive)
                        .expect("pool mutex poisoned");
                    s = guard;
                    s.idle_workers -= 1;
                    if timeout.timed_out() && s.queue.is_empty() && s.phase == Phase::Running {
                        // Idle past keep_alive: this excess worker retires.
                        break Next::Exit;
                    }
                }
            }
        };
        match next {
            Next::Run(job) => job(),
            Next::Exit => break,
        }
    }

    let mut s = inner.state.lock().expect("pool mutex poisoned");
    s.workers -= 1;
    drop(s);
    inner.drained.notify_all();
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

fn available_cpus() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

static DEFAULT_POOL: LazyLock<WorkerPool> = LazyLock::new(|| {
    WorkerPool::cpu_bound(PoolOptions {
        name_prefix: "batch".to_string(),
        ..Default::default()
    })
});

/// Process-wide CPU-bound pool, created lazily on first use.
///
/// Shared by [`crate::batch::execute`] and available to any caller that does
/// not want to manage its own pool. Drain it explicitly at process shutdown
/// with [`shutdown_default_pool`].
pub fn default_pool() -> &'static WorkerPool {
    &DEFAULT_POOL
}

/// Drain and stop the default pool, if it was ever created.
pub fn shutdown_default_pool(grace: Duration) {
    if let Some(pool) = LazyLock::get(&DEFAULT_POOL) {
        pool.shutdown(grace);
    }
}
