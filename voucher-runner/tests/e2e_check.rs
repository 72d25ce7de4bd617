//! Validation pipeline against a mocked upstream service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use voucher_core::config::ServiceConfig;
use voucher_core::{ProxyPool, ResultSink, RetryConfig, RunMetrics, Worker, WorkerPool};
use voucher_runner::client::UpstreamClient;
use voucher_runner::jobs::ValidateWorker;
use voucher_runner::output::FileResultWriter;

/// Rate limits the first call with a wait hint, then answers.
struct LimitedThenValid {
    calls: AtomicUsize,
    body: &'static str,
}

impl Respond for LimitedThenValid {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            ResponseTemplate::new(429).set_body_string(r#"{"retry_after": 0.05}"#)
        } else {
            ResponseTemplate::new(200).set_body_string(self.body)
        }
    }
}

fn service_for(server: &MockServer, results_dir: &std::path::Path) -> ServiceConfig {
    ServiceConfig {
        probe_url: format!("{}/member", server.uri()),
        claim_url: format!("{}/claim", server.uri()),
        check_url: format!("{}/check", server.uri()),
        campaign_id: "camp-1".to_string(),
        redeem_url_prefix: "https://redeem.test/".to_string(),
        rate_limit_delay_ms: 5000,
        request_timeout_ms: 5000,
        results_dir: results_dir.to_string_lossy().into_owned(),
    }
}

fn spawn_workers(
    codes: &[&str],
    client: &Arc<UpstreamClient>,
    retry: RetryConfig,
    metrics: &Arc<RunMetrics>,
    sink: &ResultSink,
) -> Vec<Box<dyn Worker>> {
    codes
        .iter()
        .map(|code| {
            Box::new(ValidateWorker::new(
                code.to_string(),
                client.clone(),
                retry,
                metrics.clone(),
                sink.clone(),
            )) as Box<dyn Worker>
        })
        .collect()
}

#[tokio::test]
async fn classifies_codes_into_their_tier_files() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let results_dir = dir.path().join("results");

    Mock::given(method("GET"))
        .and(path("/check/c1"))
        .and(header("authorization", "token-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"uses": 3}"#))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/check/c2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"uses": 0, "plan": {"id": 7, "name": "Premium Monthly"}}"#),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/check/c3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"message": "Unknown Code"}"#))
        .mount(&server)
        .await;

    let service = service_for(&server, &results_dir);
    let client = Arc::new(UpstreamClient::new(
        service.clone(),
        "token-abc".to_string(),
        Arc::new(ProxyPool::empty()),
    ));

    let retry = RetryConfig::new(1, 50);
    let metrics = Arc::new(RunMetrics::new());
    let writer = Arc::new(FileResultWriter::new(
        results_dir.clone(),
        service.redeem_url_prefix.clone(),
    ));
    let (sink, sink_handle) = ResultSink::spawn(writer);

    let workers = spawn_workers(&["c1", "c2", "c3"], &client, retry, &metrics, &sink);
    let stats = WorkerPool::run_with_token(workers, 2, CancellationToken::new()).await;

    drop(sink);
    sink_handle.await.unwrap();

    assert_eq!(stats.success, 1);
    assert_eq!(stats.failed, 2);
    assert_eq!(metrics.invalid(), 2);

    let monthly = std::fs::read_to_string(results_dir.join("monthly.txt")).unwrap();
    assert_eq!(monthly, "https://redeem.test/c2\n");

    let invalid = std::fs::read_to_string(results_dir.join("invalid.txt")).unwrap();
    let mut lines: Vec<&str> = invalid.lines().collect();
    lines.sort_unstable();
    assert_eq!(lines, vec!["c1", "c3"]);
}

#[tokio::test]
async fn rate_limit_hint_is_honored_without_spending_the_budget() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let results_dir = dir.path().join("results");

    Mock::given(method("GET"))
        .and(path("/check/c9"))
        .respond_with(LimitedThenValid {
            calls: AtomicUsize::new(0),
            body: r#"{"uses": 0, "plan": {"name": "Premium Yearly"}}"#,
        })
        .mount(&server)
        .await;

    // Zero retry budget: only the hint keeps the chain alive, and the
    // configured fixed delay is far too long for this test to pass if
    // it were used instead.
    let service = service_for(&server, &results_dir);
    let client = Arc::new(UpstreamClient::new(
        service.clone(),
        String::new(),
        Arc::new(ProxyPool::empty()),
    ));

    let retry = RetryConfig::new(0, 5000);
    let metrics = Arc::new(RunMetrics::new());
    let writer = Arc::new(FileResultWriter::new(
        results_dir.clone(),
        service.redeem_url_prefix.clone(),
    ));
    let (sink, sink_handle) = ResultSink::spawn(writer);

    let start = std::time::Instant::now();
    let workers = spawn_workers(&["c9"], &client, retry, &metrics, &sink);
    let stats = WorkerPool::run_with_token(workers, 1, CancellationToken::new()).await;

    drop(sink);
    sink_handle.await.unwrap();

    assert_eq!(stats.success, 1);
    assert_eq!(metrics.retries(), 1);
    assert!(start.elapsed() < std::time::Duration::from_secs(2));

    let yearly = std::fs::read_to_string(results_dir.join("yearly.txt")).unwrap();
    assert_eq!(yearly, "https://redeem.test/c9\n");
}
