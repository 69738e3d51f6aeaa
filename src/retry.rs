//! Generic retrying wrapper for remote management-API calls.
//!
//! The reconciler owns no retry logic of its own; every wire call made by the
//! concrete client goes through [`call_with_retry`], which replays transient
//! failures (rate limits, transport hiccups) with exponential backoff and
//! returns the final error unchanged once the attempt budget is spent.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

const DEFAULT_MAX_ATTEMPTS: u32 = 4;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
const MAX_BACKOFF_SHIFT: u32 = 8;

/// Classifies whether a failure is worth retrying.
pub trait Transient {
    /// Returns `true` when a retry may succeed (rate limit, transport error).
    fn is_transient(&self) -> bool;
}

/// Attempt budget and backoff schedule for [`call_with_retry`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with an explicit attempt budget and base delay.
    ///
    /// A budget of zero is treated as one attempt: the call always runs once.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            base_delay,
        }
    }

    /// Backoff before the given retry (1-based), doubling per attempt.
    fn delay_before(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.base_delay.saturating_mul(1 << shift)
    }
}

/// Invokes `operation`, replaying transient failures per `policy`.
///
/// Non-transient failures are returned immediately. The error from the last
/// attempt is surfaced unchanged; no wrapping occurs.
///
/// # Errors
///
/// Returns the underlying operation's error once it is classified as
/// permanent or the attempt budget is exhausted.
pub async fn call_with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    E: Transient,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts || !err.is_transient() {
                    return Err(err);
                }
                sleep(policy.delay_before(attempt)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use thiserror::Error;

    use super::*;

    #[derive(Clone, Debug, Error, Eq, PartialEq)]
    enum FakeError {
        #[error("throttled")]
        Throttled,
        #[error("forbidden")]
        Forbidden,
    }

    impl Transient for FakeError {
        fn is_transient(&self) -> bool {
            matches!(self, Self::Throttled)
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn transient_failures_are_replayed_until_success() {
        let calls = AtomicU32::new(0);
        let result = call_with_retry(&fast_policy(4), || async {
            if calls.fetch_add(1, Ordering::Relaxed) < 2 {
                Err(FakeError::Throttled)
            } else {
                Ok(String::from("done"))
            }
        })
        .await;

        assert_eq!(result, Ok(String::from("done")));
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn permanent_failures_return_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = call_with_retry(&fast_policy(4), || async {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(FakeError::Forbidden)
        })
        .await;

        assert_eq!(result, Err(FakeError::Forbidden));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn exhausted_budget_surfaces_the_final_error_unchanged() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = call_with_retry(&fast_policy(3), || async {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(FakeError::Throttled)
        })
        .await;

        assert_eq!(result, Err(FakeError::Throttled));
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn backoff_doubles_per_retry_and_is_capped() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100));
        assert_eq!(policy.delay_before(1), Duration::from_millis(100));
        assert_eq!(policy.delay_before(2), Duration::from_millis(200));
        assert_eq!(policy.delay_before(3), Duration::from_millis(400));
        assert_eq!(
            policy.delay_before(40),
            Duration::from_millis(100).saturating_mul(1 << MAX_BACKOFF_SHIFT)
        );
    }

    #[test]
    fn zero_attempt_budget_still_runs_once() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
