//! Bounded retries for the narrative capability.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;

use super::types::{NarrativeCapability, NarrativeContext, NarrativeError, NarrativeOutput};
use crate::config::NarrativeSettings;

/// Exponential backoff with a cap and additive random jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&NarrativeSettings::default())
    }
}

impl From<&NarrativeSettings> for RetryPolicy {
    fn from(settings: &NarrativeSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            attempt_timeout: settings.attempt_timeout(),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            jitter: Duration::from_millis(settings.jitter_ms),
        }
    }
}

impl RetryPolicy {
    /// Backoff before `retry` (1 = first retry), without jitter.
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff)
    }

    /// Backoff plus a uniform jitter in `[0, jitter]`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.base_delay(retry) + Duration::from_millis(extra)
    }
}

/// Runs `capability` on the blocking pool, each attempt bounded by the policy
/// timeout. A timed-out attempt is abandoned, not interrupted.
pub async fn generate_with_retry(
    capability: Arc<dyn NarrativeCapability>,
    context: Arc<NarrativeContext>,
    policy: &RetryPolicy,
) -> Result<NarrativeOutput, NarrativeError> {
    let start = Instant::now();
    let mut last_error = NarrativeError::Aborted("no attempt made".into());

    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            let delay = policy.delay_for(attempt - 1);
            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "Narrative attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }

        let cap = Arc::clone(&capability);
        let ctx = Arc::clone(&context);
        let handle = tokio::task::spawn_blocking(move || cap.generate(&ctx));

        let outcome = match tokio::time::timeout(policy.attempt_timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(NarrativeError::Aborted(join_error.to_string())),
            Err(_) => Err(NarrativeError::Timeout(policy.attempt_timeout.as_millis() as u64)),
        };

        match outcome {
            Ok(mut output) => {
                if output.processing_time_ms == 0 {
                    output.processing_time_ms = start.elapsed().as_millis() as u64;
                }
                tracing::debug!(attempt, insights = output.insights.len(), "Narrative generated");
                return Ok(output);
            }
            Err(e) if e.is_retryable() => last_error = e,
            Err(e) => return Err(e),
        }
    }

    Err(NarrativeError::Exhausted {
        attempts: policy.max_attempts,
        last: last_error.to_string(),
    })
}
