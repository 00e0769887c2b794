use std::future::Future;
use std::time::Duration;

use crate::LeoError;

/// Exponential backoff: `multiplier * 2^(attempt - 1)` clamped to `[min_delay, max_delay]`.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub multiplier: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier: Duration::from_secs(1),
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        let delay = self.multiplier.saturating_mul(2u32.saturating_pow(exponent));
        delay.clamp(self.min_delay, self.max_delay.max(self.min_delay))
    }
}

/// Retries `op` while `is_retryable` accepts the error.
///
/// Non-retryable errors are returned unchanged; running out of attempts yields
/// [`LeoError::MaxRetriesExceeded`].
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    mut op: F,
    is_retryable: R,
) -> Result<T, LeoError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<LeoError> + std::fmt::Display,
    R: Fn(&E) -> bool,
{
    if policy.max_attempts == 0 {
        return Err(LeoError::MaxRetriesExceeded { max: 0 });
    }

    for attempt in 1..=policy.max_attempts {
        match op().await {
            Ok(output) => return Ok(output),
            Err(error) => {
                if !is_retryable(&error) {
                    return Err(error.into());
                }
                if attempt == policy.max_attempts {
                    tracing::warn!(attempts = attempt, %error, "giving up after retries");
                    break;
                }
                let delay = policy.delay_for(attempt);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, %error, "retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }

    Err(LeoError::MaxRetriesExceeded {
        max: policy.max_attempts,
    })
}
