//! Bounded retry with exponential backoff for remote calls.
//!
//! Both remote collaborators (the reference-manager API and the LLM API)
//! throttle aggressively, so every call goes through a `RetryPolicy` that
//! retries transient failures a bounded number of times and then returns the
//! last error for the caller to contain at the per-item level.

use crate::{Error, Result};
use std::time::{Duration, Instant};

/// Retry configuration for remote calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first call. Minimum 1.
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles on each subsequent retry.
    pub base_backoff: Duration,
    /// Upper bound on a single backoff sleep.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries, useful in tests.
    #[must_use]
    pub const fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Runs `call`, retrying on `RateLimited` and `RemoteUnavailable` until
    /// the attempt budget is exhausted.
    ///
    /// A `RateLimited` error carrying a server-suggested delay sleeps for
    /// that long instead of the computed backoff. Non-retryable errors
    /// return immediately.
    ///
    /// # Errors
    ///
    /// Returns the last error once the budget is exhausted, or the first
    /// non-retryable error.
    pub fn run<T, F>(&self, operation: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let start = Instant::now();
            match call() {
                Ok(value) => {
                    record_outcome(operation, "success", start.elapsed());
                    return Ok(value);
                },
                Err(err) => {
                    let retryable = err.is_retryable() && attempt < max_attempts;
                    record_outcome(operation, outcome_label(&err), start.elapsed());
                    if !retryable {
                        return Err(err);
                    }

                    let delay = self.backoff_for(attempt, &err);
                    metrics::counter!("remote_retries_total", "operation" => operation)
                        .increment(1);
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retrying remote call"
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                },
            }
        }
    }

    /// Backoff before the retry following `attempt` (1-based).
    fn backoff_for(&self, attempt: u32, err: &Error) -> Duration {
        if let Error::RateLimited {
            retry_after_secs: Some(secs),
            ..
        } = err
        {
            return Duration::from_secs(*secs).min(self.max_backoff);
        }
        let exp = attempt.saturating_sub(1).min(16);
        self.base_backoff
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max_backoff)
    }
}

const fn outcome_label(err: &Error) -> &'static str {
    match err {
        Error::RateLimited { .. } => "rate_limited",
        Error::RemoteUnavailable { .. } => "unavailable",
        _ => "error",
    }
}

fn record_outcome(operation: &'static str, status: &'static str, elapsed: Duration) {
    metrics::counter!(
        "remote_requests_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "remote_request_duration_ms",
        "operation" => operation,
        "status" => status
    )
    .record(elapsed.as_secs_f64() * 1000.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    #[test]
    fn test_success_on_first_attempt() {
        let calls = Cell::new(0u32);
        let result = fast_policy(3).run("op", || {
            calls.set(calls.get() + 1);
            Ok(42)
        });
        assert_eq!(result.ok(), Some(42));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_retries_transient_then_succeeds() {
        let calls = Cell::new(0u32);
        let result = fast_policy(3).run("op", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(Error::RemoteUnavailable {
                    operation: "op".to_string(),
                    cause: "503".to_string(),
                })
            } else {
                Ok("done")
            }
        });
        assert_eq!(result.ok(), Some("done"));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_exhausted_budget_returns_last_error() {
        let calls = Cell::new(0u32);
        let result: Result<()> = fast_policy(2).run("op", || {
            calls.set(calls.get() + 1);
            Err(Error::RateLimited {
                operation: "op".to_string(),
                retry_after_secs: None,
            })
        });
        assert!(matches!(result, Err(Error::RateLimited { .. })));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_non_retryable_error_fails_immediately() {
        let calls = Cell::new(0u32);
        let result: Result<()> = fast_policy(5).run("op", || {
            calls.set(calls.get() + 1);
            Err(Error::MalformedResponse {
                cause: "bad json".to_string(),
                response: String::new(),
            })
        });
        assert!(matches!(result, Err(Error::MalformedResponse { .. })));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_backoff_honors_retry_after_and_cap() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        };
        let rate_limited = Error::RateLimited {
            operation: "op".to_string(),
            retry_after_secs: Some(60),
        };
        // Server-suggested delay is capped by max_backoff.
        assert_eq!(policy.backoff_for(1, &rate_limited), Duration::from_secs(2));

        let unavailable = Error::RemoteUnavailable {
            operation: "op".to_string(),
            cause: "503".to_string(),
        };
        assert_eq!(
            policy.backoff_for(1, &unavailable),
            Duration::from_millis(100)
        );
        assert_eq!(
            policy.backoff_for(2, &unavailable),
            Duration::from_millis(200)
        );
        assert_eq!(policy.backoff_for(10, &unavailable), Duration::from_secs(2));
    }
}
