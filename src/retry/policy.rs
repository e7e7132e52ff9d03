//! Resilience Policy
//!
//! One retry state machine shared by every adapter:
//!
//! - 401/403: fail immediately with `AuthenticationError`
//! - 429: wait for `Retry-After` (60s when absent), then retry
//! - 5xx: exponential backoff (`2^attempt` seconds), then retry
//! - timeout: wait 1s, then retry
//! - connection failure: exponential backoff, then retry
//!
//! When the budget is spent the last error is surfaced. Delays are driven by
//! `backoff` with a deterministic exponential schedule.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use backoff::exponential::ExponentialBackoffBuilder;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::providers::ProviderKind;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);
pub const DEFAULT_TIMEOUT_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// What the policy does with a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Terminal; surface the error now
    Fail,
    /// Retry after the next exponential backoff interval
    Backoff,
    /// Retry after a fixed wait
    After(Duration),
}

/// Retry/backoff configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ResiliencePolicy {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// First exponential interval; doubles per attempt
    pub base_delay: Duration,
    /// Cap for exponential intervals
    pub max_delay: Duration,
    /// Wait after a timed-out attempt
    pub timeout_delay: Duration,
    /// Wait after a 429 without `Retry-After`
    pub default_retry_after: Duration,
    /// Randomization applied to exponential intervals (0.0 = deterministic)
    pub jitter_factor: f64,
}

impl Default for ResiliencePolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            timeout_delay: DEFAULT_TIMEOUT_DELAY,
            default_retry_after: DEFAULT_RETRY_AFTER,
            jitter_factor: 0.0,
        }
    }
}

impl ResiliencePolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub const fn with_timeout_delay(mut self, delay: Duration) -> Self {
        self.timeout_delay = delay;
        self
    }

    pub const fn with_default_retry_after(mut self, delay: Duration) -> Self {
        self.default_retry_after = delay;
        self
    }

    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Same delays scaled for tests and local development
    pub fn fast() -> Self {
        let tick = Duration::from_millis(1);
        Self::default()
            .with_base_delay(tick)
            .with_max_delay(tick * 8)
            .with_timeout_delay(tick)
            .with_default_retry_after(tick)
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Classify an attempt failure
    pub fn decide(&self, error: &LlmError) -> RetryDecision {
        match error {
            LlmError::RateLimitError { retry_after, .. } => {
                RetryDecision::After(retry_after.unwrap_or(self.default_retry_after))
            }
            LlmError::ResponseError { code, .. } if *code >= 500 => RetryDecision::Backoff,
            LlmError::ConnectionError {
                timed_out: true, ..
            } => RetryDecision::After(self.timeout_delay),
            LlmError::ConnectionError { .. } => RetryDecision::Backoff,
            _ => RetryDecision::Fail,
        }
    }

    /// Exponential interval for a zero-based retry index, without jitter
    pub fn backoff_delay(&self, retry_index: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry_index);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.base_delay)
            .with_multiplier(2.0)
            .with_randomization_factor(self.jitter_factor)
            .with_max_interval(self.max_delay)
            .with_max_elapsed_time(None)
            .build()
    }

    fn finalize(&self, error: LlmError) -> LlmError {
        match error {
            LlmError::RateLimitError {
                message,
                retry_after: None,
            } => LlmError::RateLimitError {
                message,
                retry_after: Some(self.default_retry_after),
            },
            other => other,
        }
    }

    fn transition(
        &self,
        error: LlmError,
        attempt: u32,
        max_attempts: u32,
    ) -> backoff::Error<LlmError> {
        match self.decide(&error) {
            RetryDecision::Fail => backoff::Error::permanent(error),
            _ if attempt >= max_attempts => backoff::Error::permanent(self.finalize(error)),
            RetryDecision::Backoff => backoff::Error::transient(error),
            RetryDecision::After(wait) => backoff::Error::retry_after(error, wait),
        }
    }

    /// Run `operation` under this policy
    pub async fn execute<F, Fut, T>(&self, provider: ProviderKind, mut operation: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let max_attempts = self.max_attempts();
        let attempts = AtomicU32::new(0);

        let result = backoff::future::retry_notify(
            self.backoff(),
            || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                let call = operation();
                async move {
                    call.await
                        .map_err(|error| self.transition(error, attempt, max_attempts))
                }
            },
            |error: LlmError, wait: Duration| {
                warn!(
                    provider = %provider,
                    attempt = attempts.load(Ordering::SeqCst),
                    max_attempts,
                    wait_ms = wait.as_millis() as u64,
                    error = %error,
                    "provider call failed, retrying"
                );
            },
        )
        .await;

        if let Err(error) = &result {
            debug!(
                provider = %provider,
                attempts = attempts.load(Ordering::SeqCst),
                error = %error,
                "provider call failed permanently"
            );
        }
        result
    }
}

/// First `retries` exponential intervals the policy would wait
pub fn schedule(policy: &ResiliencePolicy, retries: usize) -> Vec<Duration> {
    let mut backoff = policy.backoff();
    backoff.reset();
    (0..retries).filter_map(|_| backoff.next_backoff()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn counting<T: Clone + Send + 'static>(
        counter: Arc<AtomicU32>,
        responses: Vec<Result<T, LlmError>>,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<T, LlmError>> + Send>> {
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) as usize;
            let response = responses
                .get(n)
                .cloned()
                .unwrap_or_else(|| responses.last().cloned().expect("responses"));
            Box::pin(async move { response })
        }
    }

    #[tokio::test]
    async fn rate_limit_then_success_takes_two_calls() {
        let counter = Arc::new(AtomicU32::new(0));
        let policy = ResiliencePolicy::fast();
        let op = counting(
            counter.clone(),
            vec![
                Err(LlmError::rate_limited("slow down", Some(Duration::ZERO))),
                Ok("done"),
            ],
        );
        let result = policy.execute(ProviderKind::OpenAi, op).await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn server_errors_exhaust_budget() {
        let counter = Arc::new(AtomicU32::new(0));
        let policy = ResiliencePolicy::fast().with_max_retries(2);
        let op = counting::<()>(
            counter.clone(),
            vec![Err(LlmError::response_error(500, "boom"))],
        );
        let err = policy.execute(ProviderKind::Gemini, op).await.unwrap_err();
        assert!(matches!(err, LlmError::ResponseError { code: 500, .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn authentication_is_never_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let policy = ResiliencePolicy::fast().with_max_retries(5);
        let op = counting::<()>(
            counter.clone(),
            vec![Err(LlmError::AuthenticationError("bad key".into()))],
        );
        let err = policy.execute(ProviderKind::Anthropic, op).await.unwrap_err();
        assert!(matches!(err, LlmError::AuthenticationError(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let policy = ResiliencePolicy::fast();
        let op = counting::<()>(
            counter.clone(),
            vec![Err(LlmError::response_error(400, "bad request"))],
        );
        assert!(policy.execute(ProviderKind::Mistral, op).await.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_rate_limit_carries_default_retry_after() {
        let counter = Arc::new(AtomicU32::new(0));
        let policy = ResiliencePolicy::fast().with_max_retries(1);
        let op = counting::<()>(
            counter.clone(),
            vec![Err(LlmError::rate_limited("slow down", None))],
        );
        let err = policy.execute(ProviderKind::OpenRouter, op).await.unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_millis(1)));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn connection_failures_recover() {
        let counter = Arc::new(AtomicU32::new(0));
        let policy = ResiliencePolicy::fast();
        let op = counting(
            counter.clone(),
            vec![
                Err(LlmError::timeout("timed out")),
                Err(LlmError::connection("refused")),
                Ok(7),
            ],
        );
        assert_eq!(policy.execute(ProviderKind::Ollama, op).await.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn decisions_follow_error_class() {
        let policy = ResiliencePolicy::default();
        assert_eq!(
            policy.decide(&LlmError::rate_limited("x", None)),
            RetryDecision::After(DEFAULT_RETRY_AFTER)
        );
        assert_eq!(
            policy.decide(&LlmError::rate_limited("x", Some(Duration::from_secs(3)))),
            RetryDecision::After(Duration::from_secs(3))
        );
        assert_eq!(
            policy.decide(&LlmError::timeout("x")),
            RetryDecision::After(DEFAULT_TIMEOUT_DELAY)
        );
        assert_eq!(
            policy.decide(&LlmError::response_error(502, "x")),
            RetryDecision::Backoff
        );
        assert_eq!(
            policy.decide(&LlmError::AuthenticationError("x".into())),
            RetryDecision::Fail
        );
    }

    #[test]
    fn exponential_schedule_doubles() {
        let policy = ResiliencePolicy::default();
        assert_eq!(
            schedule(&policy, 3),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
        assert_eq!(policy.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(8));
        assert_eq!(policy.backoff_delay(10), DEFAULT_MAX_DELAY);
    }
}
