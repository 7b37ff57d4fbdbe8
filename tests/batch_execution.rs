use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use batch_reconcile::BatchError;
use batch_reconcile::batch::{self, BatchExecutor, partition};
use batch_reconcile::pool::{PoolOptions, WorkerPool};

fn engine(workers: usize) -> BatchExecutor {
    BatchExecutor::new(WorkerPool::fixed(workers, PoolOptions::default()))
}

#[test]
fn result_matches_applying_task_to_each_partition_in_order() {
    let items: Vec<i32> = (0..53).collect();
    for batch_size in [1, 2, 7, 53, 100] {
        let out = engine(4)
            .execute(&items, batch_size, |chunk| {
                Ok(chunk.iter().map(|v| v * 3 + 1).collect())
            })
            .unwrap();

        let mut expected = Vec::new();
        for part in partition(&items, batch_size) {
            expected.extend(part.iter().map(|v| v * 3 + 1));
        }
        assert_eq!(out, expected, "batch_size={batch_size}");
        assert_eq!(out.len(), items.len());
    }
}

#[test]
fn task_may_shrink_or_grow_partitions() {
    let items: Vec<i32> = (0..20).collect();
    // Emit only even inputs, twice each.
    let out = engine(4)
        .execute(&items, 6, |chunk| {
            let mut rows = Vec::new();
            for v in chunk.iter().filter(|v| *v % 2 == 0) {
                rows.push(*v);
                rows.push(*v);
            }
            Ok(rows)
        })
        .unwrap();
    assert_eq!(out.len(), 20);
    assert_eq!(&out[..4], &[0, 0, 2, 2]);
}

#[test]
fn empty_input_returns_empty_without_invoking_task() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls2 = Arc::clone(&calls);
    let out: Vec<i32> = engine(2)
        .execute(&[], 10, move |chunk: &[i32]| {
            calls2.fetch_add(1, Ordering::SeqCst);
            Ok(chunk.to_vec())
        })
        .unwrap();
    assert!(out.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn zero_batch_size_is_an_invalid_argument_and_task_never_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls2 = Arc::clone(&calls);
    let err = engine(2)
        .execute(&[1, 2, 3], 0, move |chunk: &[i32]| {
            calls2.fetch_add(1, Ordering::SeqCst);
            Ok(chunk.to_vec())
        })
        .unwrap_err();
    assert!(matches!(err, BatchError::InvalidArgument { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn one_failing_partition_fails_the_whole_call() {
    let err = engine(4)
        .execute(&(0..40).collect::<Vec<i32>>(), 10, |chunk| {
            if chunk.contains(&25) {
                Err("partition refused".into())
            } else {
                Ok(chunk.to_vec())
            }
        })
        .unwrap_err();

    match err {
        BatchError::ExecutionFailed { source } => {
            assert!(source.to_string().contains("partition refused"));
        }
        other => panic!("expected execution failure, got {other:?}"),
    }
}

#[test]
fn failure_cancels_partitions_that_have_not_started() {
    // One worker runs partitions sequentially: the first partition fails,
    // cancels the run, and every queued sibling skips without invoking the
    // task.
    let calls = Arc::new(AtomicUsize::new(0));
    let calls2 = Arc::clone(&calls);
    let items: Vec<i32> = (0..100).collect();

    let err = engine(1)
        .execute(&items, 10, move |_chunk: &[i32]| -> Result<Vec<i32>, _> {
            calls2.fetch_add(1, Ordering::SeqCst);
            Err("first partition fails".into())
        })
        .unwrap_err();

    assert!(matches!(err, BatchError::ExecutionFailed { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn panic_cancels_partitions_that_have_not_started() {
    // Same shape as the error-path test above, but the first partition
    // panics instead of returning an error. The panic itself must cancel
    // the run, so on a single worker the queued siblings never invoke the
    // task.
    let calls = Arc::new(AtomicUsize::new(0));
    let calls2 = Arc::clone(&calls);
    let items: Vec<i32> = (0..100).collect();

    let err = engine(1)
        .execute(&items, 10, move |_chunk: &[i32]| -> Result<Vec<i32>, _> {
            calls2.fetch_add(1, Ordering::SeqCst);
            panic!("first partition panics");
        })
        .unwrap_err();

    match err {
        BatchError::ExecutionFailed { source } => {
            assert!(source.to_string().contains("first partition panics"));
        }
        other => panic!("expected execution failure, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn failing_again_with_same_inputs_is_deterministic() {
    let items: Vec<i32> = (0..30).collect();
    for _ in 0..3 {
        let engine = engine(2);
        let err = engine
            .execute(&items, 5, |chunk| {
                if chunk[0] % 2 == 1 {
                    Err("odd partition".into())
                } else {
                    Ok(chunk.to_vec())
                }
            })
            .unwrap_err();
        assert!(matches!(err, BatchError::ExecutionFailed { .. }));
    }
}

#[test]
fn panicking_task_surfaces_as_execution_failure() {
    let err = engine(2)
        .execute(&[1, 2, 3, 4], 2, |chunk: &[i32]| {
            if chunk.contains(&3) {
                panic!("task exploded");
            }
            Ok(chunk.to_vec())
        })
        .unwrap_err();
    match err {
        BatchError::ExecutionFailed { source } => {
            assert!(source.to_string().contains("task exploded"));
        }
        other => panic!("expected execution failure, got {other:?}"),
    }
}

#[test]
fn module_level_execute_uses_the_default_pool() {
    let items: Vec<u64> = (0..25).collect();
    let out = batch::execute(&items, 4, |chunk| Ok(chunk.iter().map(|v| v + 1).collect())).unwrap();
    let expected: Vec<u64> = items.iter().map(|v| v + 1).collect();
    assert_eq!(out, expected);
}

#[test]
fn executor_is_reusable_across_runs() {
    let engine = engine(3);
    for round in 0..5u8 {
        let items: Vec<u8> = (0..round * 10).collect();
        let out = engine
            .execute(&items, 3, |chunk| Ok(chunk.to_vec()))
            .unwrap();
        assert_eq!(out, items);
    }
}
