//! Fetch retrier
//!
//! Wraps a single document fetch. In fast mode one attempt is made. In
//! robust mode classified transient failures are waited out and retried:
//!
//! | Failure | Wait before the next attempt |
//! |---------|------------------------------|
//! | Connection | random backoff + penalty step × consecutive failures |
//! | Browser driver | random backoff + penalty step × consecutive failures |
//! | Timeout | fixed timeout backoff |
//! | TLS / other | not retried |
//!
//! Retrying stops after `max_attempts` attempts with `FetchError::Exhausted`.

use crate::config::{FetchConfig, PacingConfig};
use crate::fetch::error::{FailureClass, FetchError};
use crate::fetch::pacing::DelayRange;
use crate::fetch::{DocumentSource, FetchMode};
use std::time::Duration;

/// Backoff policy for robust fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed per target, the first one included
    pub max_attempts: u32,
    /// Random base wait after a connection or driver failure
    pub backoff: DelayRange,
    /// Added once per connection/driver failure seen in the same call
    pub penalty_step: Duration,
    /// Wait after a timeout
    pub timeout_wait: Duration,
}

impl RetryPolicy {
    /// Builds a policy from configuration
    pub fn from_config(fetch: &FetchConfig, pacing: &PacingConfig) -> Self {
        Self {
            max_attempts: fetch.max_attempts,
            backoff: DelayRange::from_secs(
                pacing.connection_backoff_secs.0,
                pacing.connection_backoff_secs.1,
            ),
            penalty_step: Duration::from_secs(pacing.backoff_penalty_secs),
            timeout_wait: Duration::from_secs(pacing.timeout_backoff_secs),
        }
    }

    /// Computes the wait before the next attempt, or `None` if the failure
    /// is not retryable
    ///
    /// `penalty` is the number of connection/driver failures seen so far in
    /// this call, the current one included.
    fn wait_for(&self, class: FailureClass, penalty: u32) -> Option<Duration> {
        match class {
            FailureClass::Connection | FailureClass::Driver => {
                Some(self.backoff.sample() + self.penalty_step * penalty)
            }
            FailureClass::Timeout => Some(self.timeout_wait),
            FailureClass::Fatal | FailureClass::Other => None,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default(), &PacingConfig::default())
    }
}

/// Fetches `target` from `source` under the given mode
///
/// # Arguments
///
/// * `source` - The document source to fetch from
/// * `target` - The URL to fetch
/// * `mode` - `Fast` for a single attempt, `Robust` to retry transient failures
/// * `policy` - Backoff policy used in robust mode
///
/// # Returns
///
/// * `Ok(String)` - The markup of the first successful attempt
/// * `Err(FetchError)` - A non-retryable failure, any failure in fast mode,
///   or `Exhausted` once the attempt bound is reached
pub async fn fetch_with_retry<S>(
    source: &S,
    target: &str,
    mode: FetchMode,
    policy: &RetryPolicy,
) -> Result<String, FetchError>
where
    S: DocumentSource + ?Sized,
{
    if mode == FetchMode::Fast {
        return source.fetch(target).await;
    }

    let mut attempts = 0u32;
    let mut penalty = 0u32;

    loop {
        attempts += 1;

        let error = match source.fetch(target).await {
            Ok(markup) => return Ok(markup),
            Err(error) => error,
        };

        let class = error.class();
        if matches!(class, FailureClass::Connection | FailureClass::Driver) {
            penalty += 1;
        }

        let wait = match policy.wait_for(class, penalty) {
            Some(wait) => wait,
            None => return Err(error),
        };

        if attempts >= policy.max_attempts {
            tracing::error!("Giving up on {} after {} attempts", target, attempts);
            return Err(FetchError::Exhausted {
                url: target.to_string(),
                attempts,
                last: Box::new(error),
            });
        }

        match class {
            FailureClass::Connection => tracing::warn!(
                "Request blocked ({}), waiting {:.0}s and continuing...",
                error,
                wait.as_secs_f64()
            ),
            FailureClass::Timeout => tracing::warn!(
                "Request timed out, waiting {:.0}s and continuing...",
                wait.as_secs_f64()
            ),
            _ => tracing::warn!(
                "Web driver problem ({}), waiting {:.0}s and continuing...",
                error,
                wait.as_secs_f64()
            ),
        }

        tokio::time::sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Replays a fixed script of outcomes, then keeps succeeding
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<String, FetchError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<String, FetchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl DocumentSource for ScriptedSource {
        async fn fetch(&self, _target: &str) -> Result<String, FetchError> {
            *self.calls.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("<html>default</html>".to_string()))
        }
    }

    const URL: &str = "https://portal.example/job/1";

    fn reset() -> Result<String, FetchError> {
        Err(FetchError::Connection {
            url: URL.to_string(),
            message: "connection reset by peer".to_string(),
        })
    }

    fn timeout() -> Result<String, FetchError> {
        Err(FetchError::Timeout {
            url: URL.to_string(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_robust_retries_connection_reset_once() {
        let source = ScriptedSource::new(vec![reset(), Ok("<html>ok</html>".to_string())]);
        let policy = RetryPolicy::default();

        let start = Instant::now();
        let markup = fetch_with_retry(&source, URL, FetchMode::Robust, &policy)
            .await
            .unwrap();
        let waited = start.elapsed();

        assert_eq!(markup, "<html>ok</html>");
        assert_eq!(source.calls(), 2);
        // random(10, 60) + 10 * 1
        assert!(waited >= Duration::from_secs(10));
        assert!(waited < Duration::from_secs(80));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_mode_fails_immediately() {
        let source = ScriptedSource::new(vec![reset()]);

        let start = Instant::now();
        let result = fetch_with_retry(&source, URL, FetchMode::Fast, &RetryPolicy::default()).await;

        assert!(matches!(result, Err(FetchError::Connection { .. })));
        assert_eq!(source.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_waits_fixed_backoff() {
        let source = ScriptedSource::new(vec![timeout(), Ok("<html>ok</html>".to_string())]);

        let start = Instant::now();
        fetch_with_retry(&source, URL, FetchMode::Robust, &RetryPolicy::default())
            .await
            .unwrap();

        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(60));
        assert!(waited < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_penalty_grows_with_consecutive_failures() {
        let policy = RetryPolicy {
            backoff: DelayRange::ZERO,
            ..RetryPolicy::default()
        };
        let source = ScriptedSource::new(vec![reset(), reset(), reset()]);

        let start = Instant::now();
        fetch_with_retry(&source, URL, FetchMode::Robust, &policy)
            .await
            .unwrap();

        // 10 + 20 + 30 seconds of penalty
        assert_eq!(source.calls(), 4);
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert!(start.elapsed() < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_failures_are_retried() {
        let policy = RetryPolicy {
            backoff: DelayRange::ZERO,
            penalty_step: Duration::from_secs(1),
            ..RetryPolicy::default()
        };
        let source = ScriptedSource::new(vec![Err(FetchError::Driver {
            url: URL.to_string(),
            message: "session not created".to_string(),
        })]);

        let markup = fetch_with_retry(&source, URL, FetchMode::Robust, &policy)
            .await
            .unwrap();

        assert_eq!(markup, "<html>default</html>");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unclassified_errors_are_not_retried() {
        let source = ScriptedSource::new(vec![Err(FetchError::Other {
            url: URL.to_string(),
            message: "invalid redirect".to_string(),
        })]);

        let result =
            fetch_with_retry(&source, URL, FetchMode::Robust, &RetryPolicy::default()).await;

        assert!(matches!(result, Err(FetchError::Other { .. })));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tls_failure_is_not_retried() {
        let source = ScriptedSource::new(vec![Err(FetchError::Tls {
            url: URL.to_string(),
            message: "invalid peer certificate".to_string(),
        })]);

        let result =
            fetch_with_retry(&source, URL, FetchMode::Robust, &RetryPolicy::default()).await;

        assert!(result.unwrap_err().is_fatal());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_bound_yields_exhausted() {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff: DelayRange::ZERO,
            penalty_step: Duration::ZERO,
            timeout_wait: Duration::ZERO,
        };
        let source = ScriptedSource::new(vec![reset(), timeout(), reset(), reset()]);

        let result = fetch_with_retry(&source, URL, FetchMode::Robust, &policy).await;

        match result {
            Err(FetchError::Exhausted { attempts, last, .. }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Connection { .. }));
            }
            other => panic!("expected Exhausted, got {:?}", other),
        }
        assert_eq!(source.calls(), 3);
    }
}
