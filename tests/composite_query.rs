use std::thread;
use std::time::{Duration, Instant};

use batch_reconcile::QueryError;
use batch_reconcile::pool::{PoolOptions, WorkerPool};
use batch_reconcile::query::{
    all_supply_and_get2, all_supply_and_get2_default, all_supply_and_get3, all_supply_and_get4,
    all_supply_and_get5, supply_and_get, supply_and_get_default,
};

fn pool(workers: usize) -> WorkerPool {
    WorkerPool::fixed(workers, PoolOptions::default())
}

#[test]
fn single_supplier_returns_its_value() {
    let pool = pool(2);
    let value = supply_and_get(&pool, Some(Duration::from_secs(5)), || {
        Ok("backend response".to_string())
    })
    .unwrap();
    assert_eq!(value, "backend response");
}

#[test]
fn single_supplier_error_is_normalized_to_failed() {
    let pool = pool(2);
    let err = supply_and_get::<String, _>(&pool, None, || Err("backend down".into())).unwrap_err();
    match err {
        QueryError::Failed { source } => assert!(source.to_string().contains("backend down")),
        other => panic!("expected failed query, got {other:?}"),
    }
}

#[test]
fn two_suppliers_of_different_types_join_into_a_tuple() {
    let pool = pool(4);
    let (count, label) = all_supply_and_get2(
        &pool,
        Some(Duration::from_secs(5)),
        || {
            thread::sleep(Duration::from_millis(30));
            Ok(7_u64)
        },
        || Ok("orders".to_string()),
    )
    .unwrap();
    assert_eq!(count, 7);
    assert_eq!(label, "orders");
}

#[test]
fn suppliers_run_concurrently_not_sequentially() {
    let pool = pool(4);
    let start = Instant::now();
    all_supply_and_get3(
        &pool,
        Some(Duration::from_secs(5)),
        || {
            thread::sleep(Duration::from_millis(100));
            Ok(1)
        },
        || {
            thread::sleep(Duration::from_millis(100));
            Ok(2)
        },
        || {
            thread::sleep(Duration::from_millis(100));
            Ok(3)
        },
    )
    .unwrap();
    // Run sequentially these would take at least 300ms.
    assert!(start.elapsed() < Duration::from_millis(280));
}

#[test]
fn shared_timeout_bounds_the_combined_wait() {
    let pool = pool(4);
    let start = Instant::now();
    let err = all_supply_and_get2(
        &pool,
        Some(Duration::from_millis(100)),
        || Ok("fast"),
        || {
            thread::sleep(Duration::from_millis(500));
            Ok("slow")
        },
    )
    .unwrap_err();

    // The fast supplier finishing does not buy the slow one more time.
    match err {
        QueryError::TimedOut { timeout } => assert_eq!(timeout, Duration::from_millis(100)),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(start.elapsed() < Duration::from_millis(450));
}

#[test]
fn one_failing_supplier_fails_the_whole_query() {
    let pool = pool(4);
    let err = all_supply_and_get3(
        &pool,
        Some(Duration::from_secs(5)),
        || Ok(1),
        || -> Result<i32, _> { Err("replica unavailable".into()) },
        || Ok(3),
    )
    .unwrap_err();
    match err {
        QueryError::Failed { source } => {
            assert!(source.to_string().contains("replica unavailable"));
        }
        other => panic!("expected failed query, got {other:?}"),
    }
}

#[test]
fn panicking_supplier_is_reported_as_failed_not_a_panic() {
    let pool = pool(2);
    let err = all_supply_and_get2(
        &pool,
        Some(Duration::from_secs(5)),
        || -> Result<i32, _> { panic!("supplier bug") },
        || Ok(2),
    )
    .unwrap_err();
    match err {
        QueryError::Failed { source } => assert!(source.to_string().contains("supplier bug")),
        other => panic!("expected failed query, got {other:?}"),
    }
}

#[test]
fn submitting_to_a_stopped_pool_is_interrupted() {
    let pool = pool(1);
    pool.shutdown(Duration::from_secs(1));
    let err = supply_and_get::<i32, _>(&pool, None, || Ok(1)).unwrap_err();
    assert!(matches!(err, QueryError::Interrupted));
}

#[test]
fn four_and_five_arity_join_in_declaration_order() {
    let pool = pool(8);

    let (a, b, c, d) = all_supply_and_get4(
        &pool,
        Some(Duration::from_secs(5)),
        || Ok(1_u8),
        || Ok(2_u16),
        || Ok(3_u32),
        || Ok(4_u64),
    )
    .unwrap();
    assert_eq!((a, b, c, d), (1, 2, 3, 4));

    let (a, b, c, d, ()) = all_supply_and_get5(
        &pool,
        Some(Duration::from_secs(5)),
        || Ok("a".to_string()),
        || Ok(2_i32),
        || Ok(vec![3_u8]),
        || Ok(Some(4_i64)),
        || Ok(()),
    )
    .unwrap();
    assert_eq!(a, "a");
    assert_eq!(b, 2);
    assert_eq!(c, vec![3]);
    assert_eq!(d, Some(4));
}

#[test]
fn default_pool_variants_need_no_explicit_pool() {
    let value = supply_and_get_default(Some(Duration::from_secs(5)), || Ok(11_i32)).unwrap();
    assert_eq!(value, 11);

    let (count, label) = all_supply_and_get2_default(
        Some(Duration::from_secs(5)),
        || Ok(3_u64),
        || Ok("customers".to_string()),
    )
    .unwrap();
    assert_eq!(count, 3);
    assert_eq!(label, "customers");

    // Same failure normalization as the pooled variants.
    let err =
        supply_and_get_default::<i32, _>(None, || Err("backend down".into())).unwrap_err();
    assert!(matches!(err, QueryError::Failed { .. }));
}

#[test]
fn no_timeout_waits_for_slow_suppliers() {
    let pool = pool(2);
    let (x, y) = all_supply_and_get2(
        &pool,
        None,
        || {
            thread::sleep(Duration::from_millis(150));
            Ok(10)
        },
        || Ok(20),
    )
    .unwrap();
    assert_eq!((x, y), (10, 20));
}
