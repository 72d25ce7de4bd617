use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use voucher_core::{
    drive, CallOutcome, ChainOutcome, NetworkError, RateLimitPolicy, RetryConfig, RunMetrics,
};

fn transient() -> NetworkError {
    NetworkError::ConnectionFailed {
        endpoint: "http://upstream.test".to_string(),
        reason: "connection reset".to_string(),
    }
}

#[tokio::test]
async fn success_on_first_try() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10);
    let metrics = RunMetrics::new();
    let token = CancellationToken::new();

    let result = drive(&config, RateLimitPolicy::FixedDelay, &metrics, &token, "op", || {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            CallOutcome::Success("code".to_string())
        }
    })
    .await;

    assert!(result.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn always_transient_exhausts_after_budget_plus_one() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10);
    let metrics = RunMetrics::new();
    let token = CancellationToken::new();

    let result: ChainOutcome<String> =
        drive(&config, RateLimitPolicy::FixedDelay, &metrics, &token, "op", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                CallOutcome::Transient(transient())
            }
        })
        .await;

    assert!(matches!(result, ChainOutcome::Exhausted));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(metrics.errors(), 4);
}

#[tokio::test]
async fn rate_limit_cycles_do_not_consume_budget() {
    // More 429 cycles than the whole attempt budget, then success.
    let calls = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(1, 10);
    let metrics = RunMetrics::new();
    let token = CancellationToken::new();
    let cycles = 5usize;

    let start = tokio::time::Instant::now();
    let result = drive(&config, RateLimitPolicy::ServerHint, &metrics, &token, "op", || {
        let calls = calls.clone();
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < cycles {
                CallOutcome::RateLimited(Some(Duration::from_millis(30)))
            } else {
                CallOutcome::Success(())
            }
        }
    })
    .await;
    let elapsed = start.elapsed();

    assert!(result.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), cycles + 1);
    assert_eq!(metrics.retries(), cycles as u64);
    // Elapsed time tracks the sum of the server hints.
    assert!(elapsed >= Duration::from_millis(30 * cycles as u64));
}

#[tokio::test]
async fn server_hint_policy_prefers_the_hint() {
    let calls = Arc::new(AtomicUsize::new(0));
    // Fixed delay is long; the hint must win under ServerHint.
    let config = RetryConfig::new(2, 5000);
    let metrics = RunMetrics::new();
    let token = CancellationToken::new();

    let start = tokio::time::Instant::now();
    let result = drive(&config, RateLimitPolicy::ServerHint, &metrics, &token, "op", || {
        let calls = calls.clone();
        async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                CallOutcome::RateLimited(Some(Duration::from_millis(20)))
            } else {
                CallOutcome::Success(())
            }
        }
    })
    .await;

    assert!(result.is_success());
    assert!(start.elapsed() < Duration::from_millis(1000));
}

#[tokio::test]
async fn fixed_delay_policy_ignores_the_hint() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(2, 40);
    let metrics = RunMetrics::new();
    let token = CancellationToken::new();

    let start = tokio::time::Instant::now();
    let result = drive(&config, RateLimitPolicy::FixedDelay, &metrics, &token, "op", || {
        let calls = calls.clone();
        async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                CallOutcome::RateLimited(Some(Duration::from_secs(10)))
            } else {
                CallOutcome::Success(())
            }
        }
    })
    .await;

    let elapsed = start.elapsed();
    assert!(result.is_success());
    assert!(elapsed >= Duration::from_millis(40));
    assert!(elapsed < Duration::from_secs(5));
}

#[tokio::test]
async fn unparseable_consumes_budget_without_delay() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(2, 10_000);
    let metrics = RunMetrics::new();
    let token = CancellationToken::new();

    let start = tokio::time::Instant::now();
    let result: ChainOutcome<String> =
        drive(&config, RateLimitPolicy::FixedDelay, &metrics, &token, "op", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                CallOutcome::Unparseable
            }
        })
        .await;

    assert!(matches!(result, ChainOutcome::Exhausted));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // Fast retry: the configured rate-limit delay never applies here.
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn cancellation_during_backoff_stops_the_chain() {
    let config = RetryConfig::new(3, 60_000);
    let metrics = RunMetrics::new();
    let token = CancellationToken::new();

    let cancel = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
    });

    let start = tokio::time::Instant::now();
    let result: ChainOutcome<()> =
        drive(&config, RateLimitPolicy::FixedDelay, &metrics, &token, "op", || async {
            CallOutcome::RateLimited(None)
        })
        .await;

    assert!(matches!(result, ChainOutcome::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(10));
}
