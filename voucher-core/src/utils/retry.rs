use crate::error::NetworkError;
use crate::metrics::RunMetrics;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Additional tries after the first: total tries = retry_budget + 1.
    pub retry_budget: u32,
    /// Fixed rate-limit backoff, also the fallback when the server
    /// sends no wait hint.
    pub rate_limit_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_budget: 3,
            rate_limit_delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    pub fn new(retry_budget: u32, rate_limit_delay_ms: u64) -> Self {
        Self {
            retry_budget,
            rate_limit_delay_ms,
        }
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }
}

/// Result of one attempt of an external call.
#[derive(Debug)]
pub enum CallOutcome<T> {
    /// Structurally valid response with the expected payload.
    Success(T),
    /// Upstream backpressure, with the server wait hint when present.
    RateLimited(Option<Duration>),
    /// Network, transport, or decode failure.
    Transient(NetworkError),
    /// Structurally valid response missing the expected field.
    Unparseable,
}

/// How a rate-limit cycle picks its sleep duration.
///
/// The two pipelines deliberately diverge here: acquisition always
/// sleeps the fixed configured delay, validation honors the
/// server-supplied hint. Neither consumes the attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitPolicy {
    /// Acquisition: fixed configured delay.
    FixedDelay,
    /// Validation: server hint, fixed delay as fallback.
    ServerHint,
}

/// Terminal state of one call chain.
#[derive(Debug)]
pub enum ChainOutcome<T> {
    Success(T),
    /// All `retry_budget + 1` attempts consumed.
    Exhausted,
    /// Cancellation observed at an attempt boundary or during backoff.
    Cancelled,
}

impl<T> ChainOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ChainOutcome::Success(_))
    }
}

/// Drives one call chain through `Idle -> Attempting -> terminal`.
///
/// Attempts are strictly sequential. `Transient` and `Unparseable`
/// consume one attempt each and retry immediately with no added
/// delay; `RateLimited` sleeps per `policy`, increments the retry
/// metric, and leaves the attempt budget untouched.
pub async fn drive<T, F, Fut>(
    config: &RetryConfig,
    policy: RateLimitPolicy,
    metrics: &RunMetrics,
    token: &CancellationToken,
    operation_name: &str,
    mut operation: F,
) -> ChainOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CallOutcome<T>>,
{
    let mut attempt: u32 = 0;

    while attempt <= config.retry_budget {
        if token.is_cancelled() {
            return ChainOutcome::Cancelled;
        }

        match operation().await {
            CallOutcome::Success(value) => {
                if attempt > 0 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt + 1);
                }
                return ChainOutcome::Success(value);
            }
            CallOutcome::RateLimited(hint) => {
                metrics.record_retry();
                let delay = match policy {
                    RateLimitPolicy::ServerHint => hint.unwrap_or(config.rate_limit_delay()),
                    RateLimitPolicy::FixedDelay => config.rate_limit_delay(),
                };
                debug!(
                    "{} rate limited, waiting {:?} (attempt budget untouched)",
                    operation_name, delay
                );
                tokio::select! {
                    _ = token.cancelled() => return ChainOutcome::Cancelled,
                    _ = sleep(delay) => {}
                }
            }
            CallOutcome::Transient(e) => {
                metrics.record_error();
                debug!(
                    "{} failed (attempt {}/{}): {}",
                    operation_name,
                    attempt + 1,
                    config.retry_budget + 1,
                    e
                );
                attempt += 1;
            }
            CallOutcome::Unparseable => {
                metrics.record_miss();
                debug!(
                    "{} returned no usable payload (attempt {}/{})",
                    operation_name,
                    attempt + 1,
                    config.retry_budget + 1
                );
                attempt += 1;
            }
        }
    }

    debug!(
        "{} exhausted after {} attempts",
        operation_name,
        config.retry_budget + 1
    );
    ChainOutcome::Exhausted
}
