use crate::error::{BackendError, ErrorKind};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Jitter band applied to every backoff delay
const JITTER_MIN: f64 = 0.8;
const JITTER_MAX: f64 = 1.2;

/// Exponential backoff policy for [`with_retry`]
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (total attempts = max_retries + 1)
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    /// Error kinds that trigger another attempt; everything else propagates at once
    pub retryable_kinds: Vec<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
            retryable_kinds: vec![ErrorKind::Connection],
        }
    }
}

impl RetryPolicy {
    /// Policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Cancellation is never retried, whatever the policy lists
    pub fn is_retryable(&self, error: &BackendError) -> bool {
        let kind = error.kind();
        kind != ErrorKind::Cancelled && self.retryable_kinds.contains(&kind)
    }

    /// Delay before the next attempt given the delay used last time
    ///
    /// `min(previous * backoff_factor * jitter, max_delay)` with jitter drawn
    /// uniformly from `[0.8, 1.2]`.
    pub fn next_delay(&self, previous: Duration) -> Duration {
        let jitter = rand::thread_rng().gen_range(JITTER_MIN..=JITTER_MAX);
        self.scaled_delay(previous, jitter)
    }

    fn scaled_delay(&self, previous: Duration, jitter: f64) -> Duration {
        let secs = previous.as_secs_f64() * self.backoff_factor * jitter;
        let capped = secs.min(self.max_delay.as_secs_f64()).max(0.0);
        // as_secs_f64 can round past Duration::MAX for huge caps
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, runs
/// out of retries, or `cancel` fires
///
/// - Retryable failures with attempts left: sleep for the next backoff delay and try again
/// - Retry budget spent: `RetryExhausted` wrapping the last error, with the total attempt count
/// - Non-retryable failures: returned unchanged on first occurrence
/// - Cancellation (during an attempt or during a backoff sleep): `Cancelled`, with no further attempt
///
/// The executor holds no state between calls; each invocation starts from
/// `policy.initial_delay`.
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, BackendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(operation = operation_name, attempt, "Operation cancelled");
                return Err(BackendError::cancelled(operation_name));
            }
            result = operation() => result,
        };

        let error = match outcome {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempts = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !policy.is_retryable(&error) {
            return Err(error);
        }

        if attempt > policy.max_retries {
            tracing::error!(
                operation = operation_name,
                attempts = attempt,
                max_retries = policy.max_retries,
                error = %error,
                "Max retries exceeded"
            );
            return Err(BackendError::RetryExhausted {
                operation: operation_name.to_string(),
                attempts: attempt,
                source: Box::new(error),
            });
        }

        delay = policy.next_delay(delay);

        tracing::warn!(
            operation = operation_name,
            attempt,
            max_retries = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying after backoff"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(operation = operation_name, attempt, "Cancelled during backoff");
                return Err(BackendError::cancelled(operation_name));
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
