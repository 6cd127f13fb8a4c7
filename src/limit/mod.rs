//! Request pacing and retry policy
//!
//! A token-bucket limiter keyed per tenant scope keeps each (connection,
//! tenant) pair inside the source's published steady-state rate, blocking
//! the calling path rather than rejecting. The retry policy turns 429/5xx
//! responses into bounded, jittered exponential backoff.

use governor::{DefaultKeyedRateLimiter, Jitter, Quota};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Rate Limiter
// ============================================================================

/// Token-bucket rate limiter, keyed by tenant scope.
///
/// One instance is shared by every table and tenant of a connection; each
/// tenant scope draws from its own bucket so a slow tenant cannot starve
/// the others.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
    jitter: Jitter,
}

impl RateLimiter {
    /// Create a limiter replenished at `requests_per_second` with the given
    /// burst allowance
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::new(1).unwrap()),
        )
        .allow_burst(NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::new(1).unwrap()));

        Self {
            limiter: Arc::new(DefaultKeyedRateLimiter::keyed(quota)),
            jitter: Jitter::up_to(Duration::from_millis(50)),
        }
    }

    /// Consume one unit from the scope's bucket, waiting until one is
    /// replenished if the bucket is empty. Backpressure, not rejection.
    pub async fn acquire(&self, scope: Option<&str>) {
        let key = scope.unwrap_or_default().to_string();
        self.limiter
            .until_key_ready_with_jitter(&key, self.jitter)
            .await;
    }

    /// Check if a request for the scope could proceed immediately
    pub fn check(&self, scope: Option<&str>) -> bool {
        let key = scope.unwrap_or_default().to_string();
        self.limiter.check_key(&key).is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish()
    }
}

// ============================================================================
// Retry Policy
// ============================================================================

/// Backoff schedule for retryable failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum retry count before the operation fails permanently
    pub max_retries: u32,
    /// Base delay for the first retry
    pub base_delay: Duration,
    /// Cap on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Create a retry policy
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Compute the delay before retry number `attempt` (zero-based).
    ///
    /// A server-supplied `Retry-After` is honored as a lower bound;
    /// otherwise the base delay doubles per consecutive failure, capped at
    /// `max_delay`. Jitter is added either way so retries across tenants do
    /// not synchronize.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = match retry_after {
            Some(after) => after,
            None => {
                let factor = 2u32.saturating_pow(attempt);
                std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
            }
        };
        backoff + jitter()
    }

    /// Check whether another retry is allowed after `attempt` failures
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Random jitter in the 0-100ms range, from the stdlib hasher seed
fn jitter() -> Duration {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let hasher = RandomState::new().build_hasher();
    Duration::from_millis(hasher.finish() % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_secs(1), Duration::from_secs(4));

        // Strip jitter by comparing against the known 0-100ms bound
        let d0 = policy.delay_for(0, None);
        assert!(d0 >= Duration::from_secs(1) && d0 < Duration::from_millis(1100));

        let d1 = policy.delay_for(1, None);
        assert!(d1 >= Duration::from_secs(2) && d1 < Duration::from_millis(2100));

        let d4 = policy.delay_for(4, None);
        assert!(d4 >= Duration::from_secs(4) && d4 < Duration::from_millis(4100));
    }

    #[test]
    fn test_retry_after_is_lower_bound() {
        let policy = RetryPolicy::default();
        let delay = policy.delay_for(0, Some(Duration::from_secs(2)));
        assert!(delay >= Duration::from_secs(2));
    }

    #[test]
    fn test_retry_budget() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10), Duration::from_secs(1));
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
    }

    #[tokio::test]
    async fn test_limiter_allows_burst() {
        let limiter = RateLimiter::new(10, 5);
        for _ in 0..5 {
            assert!(limiter.check(Some("t1")));
            limiter.acquire(Some("t1")).await;
        }
    }

    #[tokio::test]
    async fn test_scopes_have_independent_buckets() {
        let limiter = RateLimiter::new(1, 1);
        limiter.acquire(Some("t1")).await;

        // t1's bucket is drained but t2's is untouched
        assert!(!limiter.check(Some("t1")));
        assert!(limiter.check(Some("t2")));
    }

    #[tokio::test]
    async fn test_unscoped_uses_shared_bucket() {
        let limiter = RateLimiter::new(1, 1);
        limiter.acquire(None).await;
        assert!(!limiter.check(None));
    }
}
