//! Retry with exponential backoff for venue placement.
//!
//! Only [`VenueError::is_retryable`] errors are retried. A permanent
//! rejection ends the loop on the first attempt.
//!
//! | Retryable | Non-Retryable |
//! |-----------|---------------|
//! | `Transient` (timeouts, rate limits) | `Rejected` |
//! | `Disconnected` | `NotFound` / `AlreadyTerminal` |

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::application::ports::VenueError;

/// Retry settings for venue placement.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueRetryPolicy {
    /// Total attempts including the first (default: 5).
    pub max_attempts: u32,
    /// Delay before the first retry (default: 100ms).
    pub initial_backoff: Duration,
    /// Upper bound for any single delay (default: 30s).
    pub max_backoff: Duration,
    /// Growth per retry (default: 2.0).
    pub backoff_multiplier: f64,
    /// Randomization, 0.2 = ±20% (default: 0.2).
    pub jitter_factor: f64,
}

impl Default for VenueRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl VenueRetryPolicy {
    /// Create a policy with custom settings.
    #[must_use]
    pub const fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        backoff_multiplier: f64,
        jitter_factor: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            backoff_multiplier,
            jitter_factor,
        }
    }

    /// Single attempt, no retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Number of delays between attempts.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_attempts.saturating_sub(1)
    }
}

/// Exponential backoff with jitter.
#[derive(Debug)]
pub struct ExponentialBackoffCalculator {
    current_retry: u32,
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    backoff_multiplier: f64,
    jitter_factor: f64,
}

impl ExponentialBackoffCalculator {
    /// Create a calculator from a policy.
    #[must_use]
    pub const fn new(policy: &VenueRetryPolicy) -> Self {
        Self {
            current_retry: 0,
            max_retries: policy.max_retries(),
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            backoff_multiplier: policy.backoff_multiplier,
            jitter_factor: policy.jitter_factor,
        }
    }

    /// Delay before the next retry, or `None` once retries are used up.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.current_retry >= self.max_retries {
            return None;
        }

        let base_ms = self.base_backoff_ms();
        let capped_ms = self.jittered(base_ms).min(self.max_backoff_ms);
        self.current_retry += 1;

        Some(Duration::from_millis(capped_ms))
    }

    fn base_backoff_ms(&self) -> u64 {
        let exponent = i32::try_from(self.current_retry).unwrap_or(i32::MAX);
        let grown = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        (grown as u64).min(self.max_backoff_ms)
    }

    fn jittered(&self, backoff_ms: u64) -> u64 {
        if self.jitter_factor <= 0.0 || backoff_ms == 0 {
            return backoff_ms;
        }
        let spread = backoff_ms as f64 * self.jitter_factor;
        let low = (backoff_ms as f64 - spread).max(0.0);
        let high = backoff_ms as f64 + spread;
        rand::rng().random_range(low..=high) as u64
    }

    /// Retries handed out so far.
    #[must_use]
    pub const fn current_retry(&self) -> u32 {
        self.current_retry
    }

    /// Whether another retry is allowed.
    #[must_use]
    pub const fn has_remaining_retries(&self) -> bool {
        self.current_retry < self.max_retries
    }

    /// Start over for a new request.
    pub const fn reset(&mut self) {
        self.current_retry = 0;
    }
}

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    /// The venue answered with a non-retryable error.
    #[error("{0}")]
    Permanent(VenueError),

    /// Every attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last: VenueError,
    },
}

/// Run `operation` until it succeeds, fails permanently, or the policy runs out.
///
/// `operation` receives the 1-based attempt number.
///
/// # Errors
///
/// Returns [`RetryError::Permanent`] on the first non-retryable error and
/// [`RetryError::Exhausted`] once all attempts have failed.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &VenueRetryPolicy,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, VenueError>>,
{
    let mut backoff = ExponentialBackoffCalculator::new(policy);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(RetryError::Permanent(err)),
            Err(err) => {
                let Some(delay) = backoff.next_backoff() else {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                };
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Venue call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn no_jitter(max_attempts: u32) -> VenueRetryPolicy {
        VenueRetryPolicy::new(
            max_attempts,
            Duration::from_millis(100),
            Duration::from_secs(1),
            2.0,
            0.0,
        )
    }

    #[test]
    fn default_policy() {
        let policy = VenueRetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.max_retries(), 4);
        assert_eq!(policy.initial_backoff, Duration::from_millis(100));
        assert_eq!(policy.max_backoff, Duration::from_secs(30));
    }

    #[test]
    fn backoff_grows_then_caps() {
        let mut backoff = ExponentialBackoffCalculator::new(&no_jitter(6));

        let delays: Vec<_> = std::iter::from_fn(|| backoff.next_backoff()).collect();

        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
                Duration::from_millis(1000),
            ]
        );
        assert!(!backoff.has_remaining_retries());
    }

    #[test]
    fn jitter_stays_in_band() {
        let policy = VenueRetryPolicy::new(
            10,
            Duration::from_millis(1000),
            Duration::from_secs(60),
            1.0,
            0.2,
        );
        let mut backoff = ExponentialBackoffCalculator::new(&policy);

        while let Some(delay) = backoff.next_backoff() {
            let ms = delay.as_millis();
            assert!((800..=1200).contains(&ms), "delay {ms}ms out of band");
        }
    }

    #[test]
    fn reset_restarts_sequence() {
        let mut backoff = ExponentialBackoffCalculator::new(&no_jitter(3));
        backoff.next_backoff();
        backoff.next_backoff();
        assert_eq!(backoff.next_backoff(), None);

        backoff.reset();

        assert_eq!(backoff.current_retry(), 0);
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn no_retry_policy_never_sleeps() {
        let mut backoff = ExponentialBackoffCalculator::new(&VenueRetryPolicy::no_retry());
        assert_eq!(backoff.next_backoff(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);

        let result = retry_with_backoff(&no_jitter(5), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(VenueError::Transient("busy".to_string()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_stops_immediately() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_with_backoff(&no_jitter(5), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(VenueError::Rejected("bad symbol".to_string())) }
        })
        .await;

        assert_eq!(
            result,
            Err(RetryError::Permanent(VenueError::Rejected(
                "bad symbol".to_string()
            )))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_attempts_and_last_error() {
        let result: Result<(), _> = retry_with_backoff(&no_jitter(3), |attempt| async move {
            Err(VenueError::Disconnected(format!("attempt {attempt}")))
        })
        .await;

        assert_eq!(
            result,
            Err(RetryError::Exhausted {
                attempts: 3,
                last: VenueError::Disconnected("attempt 3".to_string()),
            })
        );
    }
}
