//! Retrying failed requests to rate sources with exponential backoff.

use std::{future::Future, time::Duration};

use crate::exchange::sources::SourceError;

/// How often and how patiently a failed request to a rate source is retried.
///
/// The wait before attempt `n + 1` is `multiplier * 2^(n - 1)` seconds,
/// clamped to `min_wait..=max_wait`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// The total number of attempts, including the first one.
    pub max_attempts: u32,
    pub multiplier: f64,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl RetryPolicy {
    /// The policy for the JSON APIs: three attempts, waiting 4 to 10 seconds.
    pub const API: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        multiplier: 1.0,
        min_wait: Duration::from_secs(4),
        max_wait: Duration::from_secs(10),
    };

    /// The policy for the ECB feed: two attempts, waiting 5 to 15 seconds.
    pub const FEED: RetryPolicy = RetryPolicy {
        max_attempts: 2,
        multiplier: 1.0,
        min_wait: Duration::from_secs(5),
        max_wait: Duration::from_secs(15),
    };

    /// The policy for scraping: two attempts, waiting 4 to 10 seconds with a
    /// steeper backoff.
    pub const SCRAPE: RetryPolicy = RetryPolicy {
        max_attempts: 2,
        multiplier: 2.0,
        min_wait: Duration::from_secs(4),
        max_wait: Duration::from_secs(10),
    };

    /// Make `max_attempts` attempts without waiting in between.
    #[cfg(test)]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            multiplier: 0.0,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
        }
    }

    /// The wait after the failed attempt number `attempt`, counting from one.
    pub fn wait_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30) as i32;
        let seconds = self.multiplier * 2f64.powi(exponent);
        let wait = Duration::try_from_secs_f64(seconds).unwrap_or(self.max_wait);

        wait.clamp(self.min_wait, self.max_wait.max(self.min_wait))
    }

    /// Run `operation` until it succeeds or the attempts run out.
    ///
    /// Only errors are retried. A successful result, including "no rate",
    /// is returned straight away.
    pub async fn run<T, F, Fut>(&self, source: &str, mut operation: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt >= max_attempts => {
                    tracing::debug!("{source}: giving up after {attempt} attempts: {error}");
                    return Err(error);
                }
                Err(error) => {
                    let wait = self.wait_after(attempt);
                    tracing::debug!(
                        "{source}: attempt {attempt} failed ({error}), retrying in {wait:?}"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };

    use crate::exchange::{retry::RetryPolicy, sources::SourceError};

    #[test]
    fn api_waits_are_clamped() {
        let waits: Vec<u64> = (1..=5)
            .map(|attempt| RetryPolicy::API.wait_after(attempt).as_secs())
            .collect();

        assert_eq!(waits, vec![4, 4, 4, 8, 10]);
    }

    #[test]
    fn scrape_waits_are_clamped() {
        assert_eq!(RetryPolicy::SCRAPE.wait_after(1), Duration::from_secs(4));
        assert_eq!(RetryPolicy::SCRAPE.wait_after(3), Duration::from_secs(8));
        assert_eq!(RetryPolicy::SCRAPE.wait_after(4), Duration::from_secs(10));
    }

    #[test]
    fn feed_waits_start_at_minimum() {
        assert_eq!(RetryPolicy::FEED.wait_after(1), Duration::from_secs(5));
        assert_eq!(RetryPolicy::FEED.wait_after(5), Duration::from_secs(15));
    }

    #[tokio::test]
    async fn retries_errors_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = RetryPolicy::immediate(3)
            .run("test", || async move {
                let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if call < 3 {
                    Err(SourceError::Parse("not yet".to_owned()))
                } else {
                    Ok(Some(1.5))
                }
            })
            .await;

        assert!(matches!(result, Ok(Some(1.5))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<Option<f64>, SourceError> = RetryPolicy::immediate(2)
            .run("test", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::Parse("always".to_owned()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_missing_rate() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = RetryPolicy::immediate(3)
            .run("test", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<Option<f64>, SourceError>(None)
            })
            .await;

        assert!(matches!(result, Ok(None)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
