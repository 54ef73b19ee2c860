//! Transport retry with exponential backoff.
//!
//! Retries live here and nowhere else: callers of the facilitator see a
//! single logical verify-and-settle per proof.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{FacilitatorError, FacilitatorResult};

/// Retry policy with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt)
    max_attempts: u32,
    /// Base delay between retries
    base_delay: Duration,
    /// Maximum delay between retries
    max_delay: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Create from retry config.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay, config.max_delay)
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Maximum number of attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Calculate the delay for a given attempt (0-indexed).
    ///
    /// Exponential backoff with +-25% jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let multiplier = 2u32.saturating_pow(attempt - 1);
        let capped = self.base_delay.saturating_mul(multiplier).min(self.max_delay);

        let jitter_range = capped.as_millis() as u64 / 4;
        if jitter_range == 0 {
            return capped;
        }
        let jitter = rand::random::<u64>() % (jitter_range * 2);
        let jittered_ms = (capped.as_millis() as u64)
            .saturating_sub(jitter_range)
            .saturating_add(jitter);
        Duration::from_millis(jittered_ms)
    }

    /// Execute an operation, retrying on [`FacilitatorError::is_retryable`].
    pub async fn execute<F, Fut, T>(&self, operation: F) -> FacilitatorResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FacilitatorResult<T>>,
    {
        self.execute_if(FacilitatorError::is_retryable, operation)
            .await
    }

    /// Execute an operation, retrying only errors matching `should_retry`.
    pub async fn execute_if<P, F, Fut, T>(
        &self,
        should_retry: P,
        mut operation: F,
    ) -> FacilitatorResult<T>
    where
        P: Fn(&FacilitatorError) -> bool,
        F: FnMut() -> Fut,
        Fut: Future<Output = FacilitatorResult<T>>,
    {
        let mut attempt = 0;
        loop {
            let delay = self.delay_for_attempt(attempt);
            if !delay.is_zero() {
                debug!(attempt, ?delay, "Retrying after delay");
                sleep(delay).await;
            }

            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if should_retry(&e) && attempt + 1 < self.max_attempts => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Retryable facilitator error, will retry"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_delay_for_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_secs(5));

        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);

        // Base: 100ms, range: [75, 125]
        let d1 = policy.delay_for_attempt(1);
        assert!(
            d1 >= Duration::from_millis(75) && d1 <= Duration::from_millis(125),
            "Attempt 1 delay {:?} should be within +-25% of 100ms",
            d1
        );

        // Base: 400ms, range: [300, 500]
        let d3 = policy.delay_for_attempt(3);
        assert!(
            d3 >= Duration::from_millis(300) && d3 <= Duration::from_millis(500),
            "Attempt 3 delay {:?} should be within +-25% of 400ms",
            d3
        );
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100), Duration::from_millis(500));

        let d10 = policy.delay_for_attempt(10);
        assert!(
            d10 >= Duration::from_millis(375) && d10 <= Duration::from_millis(625),
            "Attempt 10 delay {:?} should be within +-25% of 500ms cap",
            d10
        );
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(
            RetryPolicy::new(0, Duration::ZERO, Duration::ZERO).max_attempts(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_retries_transient_errors() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(100));
        let attempts = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst);
                    if count < 2 {
                        Err(FacilitatorError::timeout("slow"))
                    } else {
                        Ok::<_, FacilitatorError>(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_stops_on_non_retryable() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10), Duration::from_millis(100));
        let attempts = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(FacilitatorError::decode("garbage"))
                }
            })
            .await;

        assert!(matches!(result, Err(FacilitatorError::Decode(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(100));
        let attempts = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(FacilitatorError::network("always fails"))
                }
            })
            .await;

        assert!(matches!(result, Err(FacilitatorError::Network { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_if_unsent_does_not_resend_after_transmission() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(100));
        let attempts = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute_if(FacilitatorError::is_unsent, || {
                let attempts = Arc::clone(&attempts);
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst);
                    if count == 0 {
                        Err::<i32, _>(FacilitatorError::connect("refused"))
                    } else {
                        Err(FacilitatorError::timeout("sent, no answer"))
                    }
                }
            })
            .await;

        assert!(matches!(result, Err(FacilitatorError::Timeout(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
