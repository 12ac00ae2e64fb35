// Retry policy for DEX aggregator adapter calls (C3).
//
// Generalizes the exponential-backoff-with-jitter shape of the original
// fixed-parameter retry loop (`RetryPolicy::execute`) into one
// configurable per adapter, with a pluggable classifier deciding whether
// a given error is worth retrying.
use std::time::Duration;
use tracing::warn;

use crate::error::AdapterErrorKind;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
}

impl RetryPolicy {
    /// spec.md §4.3: max attempts = 3, base delay = 1000ms, cap = 5000ms,
    /// exponential factor = 2, full jitter.
    pub fn adapter_default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
            exponential_base: 2.0,
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.as_secs_f64() * self.exponential_base.powi(attempt as i32);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        let jittered = capped * rand::random::<f64>();
        Duration::from_secs_f64(jittered.max(0.0))
    }

    /// Runs `f` up to `max_attempts` times. `classify` maps the error `E`
    /// to an [`AdapterErrorKind`]; retrying stops as soon as that kind is
    /// not retryable (spec.md §4.3), even on the first attempt.
    pub async fn execute<F, Fut, T, E>(
        &self,
        provider: &str,
        mut f: F,
        classify: impl Fn(&E) -> AdapterErrorKind,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let kind = classify(&e);
                    attempt += 1;
                    if !kind.is_retryable() || attempt >= self.max_attempts {
                        if attempt > 1 {
                            warn!(provider, attempt, %e, "adapter call exhausted retries");
                        }
                        return Err(e);
                    }
                    let delay = self.delay_for_attempt(attempt - 1).max(self.base_delay);
                    warn!(provider, attempt, %e, ?delay, "retrying adapter call");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::adapter_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_retryable_errors_up_to_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            exponential_base: 2.0,
        };
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = policy
            .execute(
                "test",
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("boom") }
                },
                |_| AdapterErrorKind::NetworkError,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_retryable_errors() {
        let policy = RetryPolicy::adapter_default();
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = policy
            .execute(
                "test",
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("no liquidity") }
                },
                |_| AdapterErrorKind::NoLiquidity,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
