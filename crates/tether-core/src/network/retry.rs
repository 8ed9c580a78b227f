//! Exponential backoff for the camera's outbound calls.
//!
//! [`retry_async`] retries one operation a bounded number of times (used for
//! reports, which are safe to repeat). [`Backoff`] tracks consecutive
//! failures for the never-ending poll loop.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::CameraConfig;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// Whether to scale delays by a random factor in `[0.5, 1.5)`.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: CameraConfig::RETRY_BASE_DELAY,
            max_delay: CameraConfig::RETRY_MAX_DELAY,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt` (0-indexed): `base * 2^attempt`,
    /// capped at `max_delay`.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let multiplier = 2f64.powi(attempt.min(31) as i32);
        let capped = (self.base_delay.as_secs_f64() * multiplier).min(self.max_delay.as_secs_f64());

        let secs = if self.jitter {
            let factor = rand::rng().random_range(0.5..1.5);
            (capped * factor).min(self.max_delay.as_secs_f64())
        } else {
            capped
        };

        Duration::from_secs_f64(secs)
    }
}

/// Outcome bookkeeping for [`retry_async`].
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    /// Attempts made, including the first.
    pub attempts: u32,
}

/// Retry an async operation with exponential backoff.
///
/// Stops early when `should_retry` rejects an error.
pub async fn retry_async<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
) -> (Result<T, E>, RetryStats)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut stats = RetryStats::default();
    let mut attempt = 0;

    loop {
        stats.attempts = attempt + 1;
        let err = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("Succeeded after {} attempts", stats.attempts);
                }
                return (Ok(value), stats);
            }
            Err(e) => e,
        };
        if !should_retry(&err) || stats.attempts >= config.max_attempts {
            debug!("Giving up after {} attempts: {}", stats.attempts, err);
            return (Err(err), stats);
        }

        let delay = config.calculate_delay(attempt);
        warn!(
            "Attempt {}/{} failed: {}. Retrying in {:?}",
            stats.attempts, config.max_attempts, err, delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Consecutive-failure tracker for an unbounded retry loop.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    failures: u32,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            failures: 0,
        }
    }

    /// Record a failure and return how long to wait before trying again.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.config.calculate_delay(self.failures);
        self.failures = self.failures.saturating_add(1);
        delay
    }

    /// Forget past failures after a successful exchange.
    pub fn reset(&mut self) {
        self.failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fixed(base_ms: u64) -> RetryConfig {
        RetryConfig::new()
            .with_base_delay(Duration::from_millis(base_ms))
            .with_max_delay(Duration::from_secs(1))
            .with_jitter(false)
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let config = fixed(250);
        assert_eq!(config.calculate_delay(0), Duration::from_millis(250));
        assert_eq!(config.calculate_delay(1), Duration::from_millis(500));
        assert_eq!(config.calculate_delay(2), Duration::from_secs(1));
        assert_eq!(config.calculate_delay(40), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let config = RetryConfig::new()
            .with_base_delay(Duration::from_secs(2))
            .with_max_delay(Duration::from_secs(60))
            .with_jitter(true);
        for _ in 0..20 {
            let delay = config.calculate_delay(0);
            assert!(delay >= Duration::from_secs(1) && delay <= Duration::from_secs(3));
        }
    }

    #[test]
    fn test_backoff_resets() {
        let mut backoff = Backoff::new(fixed(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_failures() {
        let config = fixed(10).with_max_attempts(3);
        let calls = Arc::new(AtomicU32::new(0));
        let started = tokio::time::Instant::now();

        let (result, stats) = retry_async(
            &config,
            || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("connection reset".to_string())
                    } else {
                        Ok("accepted")
                    }
                }
            },
            |_: &String| true,
        )
        .await;

        assert_eq!(result.unwrap(), "accepted");
        assert_eq!(stats.attempts, 3);
        // 10ms + 20ms of backoff on the paused clock
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausted() {
        let config = fixed(10).with_max_attempts(2);
        let (result, stats) = retry_async(
            &config,
            || async { Err::<(), _>("unreachable".to_string()) },
            |_: &String| true,
        )
        .await;

        assert_eq!(result.unwrap_err(), "unreachable");
        assert_eq!(stats.attempts, 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let config = fixed(10).with_max_attempts(5);
        let (result, stats) = retry_async(
            &config,
            || async { Err::<(), _>("bad request".to_string()) },
            |e: &String| !e.starts_with("bad"),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(stats.attempts, 1);
    }
}
