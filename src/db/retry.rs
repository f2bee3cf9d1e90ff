//! Fixed-count immediate retry.
//!
//! [`RetryPolicy::run`] calls an operation once and, on failure, up to
//! `max_tries` more times. There is no delay between attempts and no error
//! classification here; callers decide what a failure means (see the query
//! facade's reconnect handling).

use crate::config::DEFAULT_MAX_TRIES;
use crate::error::DbResult;
use std::future::Future;

/// Bounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_tries: u32,
}

impl RetryPolicy {
    /// A policy making up to `max_tries` extra attempts after the first.
    pub fn new(max_tries: u32) -> Self {
        Self { max_tries }
    }

    /// Extra attempts after the first failure.
    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }

    /// Upper bound on invocations of the operation.
    pub fn max_attempts(&self) -> u32 {
        self.max_tries.saturating_add(1)
    }

    /// Run `operation`, retrying on failure. Returns the first success or the
    /// last error.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> DbResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let mut result = operation().await;

        for _ in 0..self.max_tries {
            if result.is_ok() {
                break;
            }
            result = operation().await;
        }

        result
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = RetryPolicy::new(3)
            .run(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, DbError>(7)
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_max_tries_runs_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: DbResult<()> = RetryPolicy::new(0)
            .run(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(DbError::NoData)
            })
            .await;

        assert!(matches!(result, Err(DbError::NoData)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_tries(), 1);
        assert_eq!(policy.max_attempts(), 2);
        assert_eq!(RetryPolicy::new(u32::MAX).max_attempts(), u32::MAX);
    }
}
