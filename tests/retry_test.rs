//! Integration tests for the bounded retry policy.

use rowscan::DbError;
use rowscan::db::RetryPolicy;
use std::sync::atomic::{AtomicU32, Ordering};

#[tokio::test]
async fn test_always_failing_operation_runs_one_plus_max_tries() {
    for max_tries in 0..5 {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), DbError> = RetryPolicy::new(max_tries)
            .run(|| async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Err(DbError::internal(format!("attempt {}", n)))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1 + max_tries);
        // the last error is the one returned
        let err = result.unwrap_err();
        assert!(err.to_string().contains(&format!("attempt {}", 1 + max_tries)));
    }
}

#[tokio::test]
async fn test_success_at_attempt_k_stops_retrying() {
    let max_tries = 3;

    for k in 1..=max_tries + 1 {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = RetryPolicy::new(max_tries)
            .run(|| async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < k {
                    Err(DbError::connection("refused", "retry"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), k);
        assert_eq!(calls.load(Ordering::SeqCst), k);
    }
}

#[tokio::test]
async fn test_errors_are_not_classified() {
    let calls = AtomicU32::new(0);
    let counter = &calls;

    // even a NoData result is retried; the policy never inspects the error
    let result: Result<(), DbError> = RetryPolicy::default()
        .run(|| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(DbError::NoData)
        })
        .await;

    assert!(matches!(result, Err(DbError::NoData)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
