//! Bounded retry with exponential backoff.
//!
//! Every outbound call to a geocoder or feature service goes through
//! [`with_retry`]. The policy is deliberately small: the first attempt runs
//! immediately, then up to [`RetryPolicy::max_retries`] further attempts
//! follow, each preceded by a delay that grows by [`BACKOFF_FACTOR`].
//!
//! # Usage
//!
//! ```ignore
//! use parcel_lookup_http::retry::{RetryPolicy, with_retry};
//!
//! let policy = RetryPolicy::default();
//! let body = with_retry(&policy, "county query", || {
//!     parcel_lookup_http::get_json(&client, &url, &params)
//! })
//! .await?;
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Multiplier applied to the delay after each failed retry.
pub const BACKOFF_FACTOR: u32 = 3;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// How many times to retry a failed call, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (so `2` means at most 3 calls).
    pub max_retries: u32,
    /// Delay before the first retry. Later retries wait
    /// `base_delay × 3^(retry - 1)`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given retry count and base delay.
    #[must_use]
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// A policy that retries without sleeping. Used by tests.
    #[must_use]
    pub const fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO)
    }

    /// Total number of calls this policy allows (first attempt included).
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay to wait before retry number `retry` (1-based).
    ///
    /// Retry 1 waits `base_delay`, retry 2 waits `3 × base_delay`, and so on.
    /// `retry == 0` is the first attempt and never waits.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = BACKOFF_FACTOR.saturating_pow(retry - 1);
        self.base_delay.saturating_mul(factor)
    }
}

/// Classifies an error as worth retrying or permanent.
pub trait Retryable {
    /// Returns `true` when another attempt might succeed.
    fn is_retryable(&self) -> bool {
        true
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the policy
/// runs out of retries.
///
/// `operation` is called once per attempt so that each attempt builds a
/// fresh request. `label` only appears in log messages.
///
/// # Errors
///
/// Returns the error from the last attempt when every attempt failed, or
/// the first error for which [`Retryable::is_retryable`] is `false`.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let mut retry = 0;

    loop {
        if retry > 0 {
            let delay = policy.delay_for(retry);
            log::warn!(
                "{label}: retry {retry}/{} in {delay:?}...",
                policy.max_retries
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && retry < policy.max_retries => {
                log::warn!("{label}: attempt {} failed: {e}", retry + 1);
                retry += 1;
            }
            Err(e) => {
                if retry > 0 {
                    log::warn!("{label}: giving up after {} attempts: {e}", retry + 1);
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Debug)]
    struct Flaky {
        permanent: bool,
    }

    impl Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky (permanent={})", self.permanent)
        }
    }

    impl Retryable for Flaky {
        fn is_retryable(&self) -> bool {
            !self.permanent
        }
    }

    #[test]
    fn delay_grows_by_factor_of_three() {
        let policy = RetryPolicy::new(2, Duration::from_millis(500));
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1500));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4500));
    }

    #[test]
    fn default_allows_three_attempts() {
        assert_eq!(RetryPolicy::default().max_attempts(), 3);
    }

    #[tokio::test]
    async fn stops_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), Flaky> = with_retry(&RetryPolicy::immediate(2), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Flaky { permanent: false }) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn returns_first_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&RetryPolicy::immediate(2), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(Flaky { permanent: false })
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), Flaky> = with_retry(&RetryPolicy::immediate(5), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Flaky { permanent: true }) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
