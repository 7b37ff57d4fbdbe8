//! Composite concurrent queries: run independent suppliers on a pool and
//! join them under one shared timeout.
//!
//! [`supply_and_get`] runs a single supplier; [`all_supply_and_get2`] through
//! [`all_supply_and_get5`] run 2 to 5 suppliers concurrently and join their
//! outputs into a tuple preserving each supplier's declared type. One
//! timeout bounds the combined wait, not each supplier individually: every
//! join consumes whatever budget the previous joins left over, so a slow
//! supplier causes [`QueryError::TimedOut`] even when its siblings already
//! finished.
//!
//! All failures are normalized into [`QueryError`]; the underlying cause is
//! carried as the error's `source` rather than surfacing as a raw low-level
//! error.
//!
//! Callers that do not manage their own pool can use the `*_default`
//! variants, which run on the process-wide
//! [`default_pool`](crate::pool::default_pool) the same way
//! [`crate::batch::execute`] does.

use std::time::{Duration, Instant};

use crate::error::{BoxError, JoinError, PoolError, QueryError};
use crate::pool::{TaskHandle, WorkerPool, default_pool};

/// Run one supplier on `pool` and wait for its value.
///
/// `timeout` of `None` waits without bound.
pub fn supply_and_get<T, F>(
    pool: &WorkerPool,
    timeout: Option<Duration>,
    supplier: F,
) -> Result<T, QueryError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BoxError> + Send + 'static,
{
    let deadline = timeout.map(|t| Instant::now() + t);
    let handle = submit(pool, supplier)?;
    settle(handle, deadline, timeout)
}

/// Run two suppliers concurrently and join them under one shared timeout.
pub fn all_supply_and_get2<T1, T2, F1, F2>(
    pool: &WorkerPool,
    timeout: Option<Duration>,
    supplier1: F1,
    supplier2: F2,
) -> Result<(T1, T2), QueryError>
where
    T1: Send + 'static,
    T2: Send + 'static,
    F1: FnOnce() -> Result<T1, BoxError> + Send + 'static,
    F2: FnOnce() -> Result<T2, BoxError> + Send + 'static,
{
    let deadline = timeout.map(|t| Instant::now() + t);
    let h1 = submit(pool, supplier1)?;
    let h2 = submit(pool, supplier2)?;
    let v1 = settle(h1, deadline, timeout)?;
    let v2 = settle(h2, deadline, timeout)?;
    Ok((v1, v2))
}

/// Run three suppliers concurrently and join them under one shared timeout.
pub fn all_supply_and_get3<T1, T2, T3, F1, F2, F3>(
    pool: &WorkerPool,
    timeout: Option<Duration>,
    supplier1: F1,
    supplier2: F2,
    supplier3: F3,
) -> Result<(T1, T2, T3), QueryError>
where
    T1: Send + 'static,
    T2: Send + 'static,
    T3: Send + 'static,
    F1: FnOnce() -> Result<T1, BoxError> + Send + 'static,
    F2: FnOnce() -> Result<T2, BoxError> + Send + 'static,
    F3: FnOnce() -> Result<T3, BoxError> + Send + 'static,
{
    let deadline = timeout.map(|t| Instant::now() + t);
    let h1 = submit(pool, supplier1)?;
    let h2 = submit(pool, supplier2)?;
    let h3 = submit(pool, supplier3)?;
    let v1 = settle(h1, deadline, timeout)?;
    let v2 = settle(h2, deadline, timeout)?;
    let v3 = settle(h3, deadline, timeout)?;
    Ok((v1, v2, v3))
}

/// Run four suppliers concurrently and join them under one shared timeout.
pub fn all_supply_and_get4<T1, T2, T3, T4, F1, F2, F3, F4>(
    pool: &WorkerPool,
    timeout: Option<Duration>,
    supplier1: F1,
    supplier2: F2,
    supplier3: F3,
    supplier4: F4,
) -> Result<(T1, T2, T3, T4), QueryError>
where
    T1: Send + 'static,
    T2: Send + 'static,
    T3: Send + 'static,
    T4: Send + 'static,
    F1: FnOnce() -> Result<T1, BoxError> + Send + 'static,
    F2: FnOnce() -> Result<T2, BoxError> + Send + 'static,
    F3: FnOnce() -> Result<T3, BoxError> + Send + 'static,
    F4: FnOnce() -> Result<T4, BoxError> + Send + 'static,
{
    let deadline = timeout.map(|t| Instant::now() + t);
    let h1 = submit(pool, supplier1)?;
    let h2 = submit(pool, supplier2)?;
    let h3 = submit(pool, supplier3)?;
    let h4 = submit(pool, supplier4)?;
    let v1 = settle(h1, deadline, timeout)?;
    let v2 = settle(h2, deadline, timeout)?;
    let v3 = settle(h3, deadline, timeout)?;
    let v4 = settle(h4, deadline, timeout)?;
    Ok((v1, v2, v3, v4))
}

/// Run five suppliers concurrently and join them under one shared timeout.
#[allow(clippy::too_many_arguments)]
pub fn all_supply_and_get5<T1, T2, T3, T4, T5, F1, F2, F3, F4, F5>(
    pool: &WorkerPool,
    timeout: Option<Duration>,
    supplier1: F1,
    supplier2: F2,
    supplier3: F3,
    supplier4: F4,
    supplier5: F5,
) -> Result<(T1, T2, T3, T4, T5), QueryError>
where
    T1: Send + 'static,
    T2: Send + 'static,
    T3: Send + 'static,
    T4: Send + 'static,
    T5: Send + 'static,
    F1: FnOnce() -> Result<T1, BoxError> + Send + 'static,
    F2: FnOnce() -> Result<T2, BoxError> + Send + 'static,
    F3: FnOnce() -> Result<T3, BoxError> + Send + 'static,
    F4: FnOnce() -> Result<T4, BoxError> + Send + 'static,
    F5: FnOnce() -> Result<T5, BoxError> + Send + 'static,
{
    let deadline = timeout.map(|t| Instant::now() + t);
    let h1 = submit(pool, supplier1)?;
    let h2 = submit(pool, supplier2)?;
    let h3 = submit(pool, supplier3)?;
    let h4 = submit(pool, supplier4)?;
    let h5 = submit(pool, supplier5)?;
    let v1 = settle(h1, deadline, timeout)?;
    let v2 = settle(h2, deadline, timeout)?;
    let v3 = settle(h3, deadline, timeout)?;
    let v4 = settle(h4, deadline, timeout)?;
    let v5 = settle(h5, deadline, timeout)?;
    Ok((v1, v2, v3, v4, v5))
}

/// [`supply_and_get`] over the process-wide
/// [`default_pool`](crate::pool::default_pool).
pub fn supply_and_get_default<T, F>(timeout: Option<Duration>, supplier: F) -> Result<T, QueryError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BoxError> + Send + 'static,
{
    supply_and_get(default_pool(), timeout, supplier)
}

/// [`all_supply_and_get2`] over the process-wide
/// [`default_pool`](crate::pool::default_pool).
pub fn all_supply_and_get2_default<T1, T2, F1, F2>(
    timeout: Option<Duration>,
    supplier1: F1,
    supplier2: F2,
) -> Result<(T1, T2), QueryError>
where
    T1: Send + 'static,
    T2: Send + 'static,
    F1: FnOnce() -> Result<T1, BoxError> + Send + 'static,
    F2: FnOnce() -> Result<T2, BoxError> + Send + 'static,
{
    all_supply_and_get2(default_pool(), timeout, supplier1, supplier2)
}

/// [`all_supply_and_get3`] over the process-wide
/// [`default_pool`](crate::pool::default_pool).
pub fn all_supply_and_get3_default<T1, T2, T3, F1, F2, F3>(
    timeout: Option<Duration>,
    supplier1: F1,
    supplier2: F2,
    supplier3: F3,
) -> Result<(T1, T2, T3), QueryError>
where
    T1: Send + 'static,
    T2: Send + 'static,
    T3: Send + 'static,
    F1: FnOnce() -> Result<T1, BoxError> + Send + 'static,
    F2: FnOnce() -> Result<T2, BoxError> + Send + 'static,
    F3: FnOnce() -> Result<T3, BoxError> + Send + 'static,
{
    all_supply_and_get3(default_pool(), timeout, supplier1, supplier2, supplier3)
}

/// [`all_supply_and_get4`] over the process-wide
/// [`default_pool`](crate::pool::default_pool).
pub fn all_supply_and_get4_default<T1, T2, T3, T4, F1, F2, F3, F4>(
    timeout: Option<Duration>,
    supplier1: F1,
    supplier2: F2,
    supplier3: F3,
    supplier4: F4,
) -> Result<(T1, T2, T3, T4), QueryError>
where
    T1: Send + 'static,
    T2: Send + 'static,
    T3: Send + 'static,
    T4: Send + 'static,
    F1: FnOnce() -> Result<T1, BoxError> + Send + 'static,
    F2: FnOnce() -> Result<T2, BoxError> + Send + 'static,
    F3: FnOnce() -> Result<T3, BoxError> + Send + 'static,
    F4: FnOnce() -> Result<T4, BoxError> + Send + 'static,
{
    all_supply_and_get4(
        default_pool(),
        timeout,
        supplier1,
        supplier2,
        supplier3,
        supplier4,
    )
}

/// [`all_supply_and_get5`] over the process-wide
/// [`default_pool`](crate::pool::default_pool).
#[allow(clippy::too_many_arguments)]
pub fn all_supply_and_get5_default<T1, T2, T3, T4, T5, F1, F2, F3, F4, F5>(
    timeout: Option<Duration>,
    supplier1: F1,
    supplier2: F2,
    supplier3: F3,
    supplier4: F4,
    supplier5: F5,
) -> Result<(T1, T2, T3, T4, T5), QueryError>
where
    T1: Send + 'static,
    T2: Send + 'static,
    T3: Send + 'static,
    T4: Send + 'static,
    T5: Send + 'static,
    F1: FnOnce() -> Result<T1, BoxError> + Send + 'static,
    F2: FnOnce() -> Result<T2, BoxError> + Send + 'static,
    F3: FnOnce() -> Result<T3, BoxError> + Send + 'static,
    F4: FnOnce() -> Result<T4, BoxError> + Send + 'static,
    F5: FnOnce() -> Result<T5, BoxError> + Send + 'static,
{
    all_supply_and_get5(
        default_pool(),
        timeout,
        supplier1,
        supplier2,
        supplier3,
        supplier4,
        supplier5,
    )
}

fn submit<T, F>(pool: &WorkerPool, supplier: F) -> Result<TaskHandle<Result<T, BoxError>>, QueryError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BoxError> + Send + 'static,
{
    pool.submit(supplier).map_err(|e| match e {
        PoolError::ShutDown => QueryError::Interrupted,
        other => QueryError::Failed {
            source: other.into(),
        },
    })
}

fn settle<T>(
    handle: TaskHandle<Result<T, BoxError>>,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
) -> Result<T, QueryError> {
    match handle.join_until(deadline) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(QueryError::Failed { source }),
        Err(JoinError::TimedOut) => Err(QueryError::TimedOut {
            timeout: timeout.unwrap_or_default(),
        }),
        Err(JoinError::Disconnected) => Err(QueryError::Interrupted),
        Err(panicked @ JoinError::Panicked(_)) => Err(QueryError::Failed {
            source: panicked.into(),
        }),
    }
}
