//! Acquisition worker: seek codes until the shared goal is met.

use crate::client::UpstreamClient;
use crate::handle::HandleGenerator;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Local;
use colored::Colorize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use voucher_core::{
    drive, ChainOutcome, DedupRegistry, OutcomeClass, RateLimitPolicy, ResultEvent, ResultSink,
    RetryConfig, RunMetrics, TargetCounter, Worker, WorkerStats,
};

/// One pooled acquisition job.
///
/// Resolves an identity once, then loops claim attempts until the
/// shared counter is met or the run is cancelled. Duplicate codes are
/// swallowed and the loop keeps seeking; only confirmed-unique codes
/// decrement the counter.
pub struct AcquireWorker {
    client: Arc<UpstreamClient>,
    retry: RetryConfig,
    counter: Arc<TargetCounter>,
    registry: Arc<DedupRegistry>,
    metrics: Arc<RunMetrics>,
    sink: ResultSink,
    handles: Arc<HandleGenerator>,
    redeem_prefix: String,
}

impl AcquireWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Arc<UpstreamClient>,
        retry: RetryConfig,
        counter: Arc<TargetCounter>,
        registry: Arc<DedupRegistry>,
        metrics: Arc<RunMetrics>,
        sink: ResultSink,
        handles: Arc<HandleGenerator>,
        redeem_prefix: String,
    ) -> Self {
        Self {
            client,
            retry,
            counter,
            registry,
            metrics,
            sink,
            handles,
            redeem_prefix,
        }
    }
}

#[async_trait]
impl Worker for AcquireWorker {
    fn name(&self) -> &str {
        "acquire"
    }

    async fn run(&self, token: CancellationToken) -> Result<WorkerStats> {
        let mut stats = WorkerStats::default();

        if token.is_cancelled() || self.counter.is_met() {
            return Ok(stats);
        }

        let handle = self.handles.next();
        let identity = match drive(
            &self.retry,
            RateLimitPolicy::FixedDelay,
            &self.metrics,
            &token,
            "identity probe",
            || self.client.probe_identity(&handle),
        )
        .await
        {
            ChainOutcome::Success(identity) => identity,
            ChainOutcome::Exhausted => {
                return Err(anyhow!("No account identity found for handle '{}'", handle))
            }
            ChainOutcome::Cancelled => return Ok(stats),
        };

        debug!("Resolved identity for handle '{}'", handle);

        loop {
            if token.is_cancelled() || self.counter.is_met() {
                break;
            }

            match drive(
                &self.retry,
                RateLimitPolicy::FixedDelay,
                &self.metrics,
                &token,
                "claim",
                || self.client.claim_code(&identity),
            )
            .await
            {
                ChainOutcome::Success(code) => {
                    if self.registry.insert_if_absent(&code) {
                        self.counter.record_success();
                        self.metrics.record_acquired();
                        stats.success += 1;

                        info!(
                            target: "job_result",
                            "[{}] Claimed -----> {}{}",
                            Local::now().format("%H:%M:%S"),
                            self.redeem_prefix,
                            code.bright_green()
                        );
                        self.sink.emit(ResultEvent::new(code, OutcomeClass::Acquired));
                    } else {
                        // Already claimed by a sibling; keep seeking.
                        debug!("Duplicate code '{}', continuing", code);
                    }
                }
                ChainOutcome::Exhausted => {
                    stats.failed += 1;
                }
                ChainOutcome::Cancelled => break,
            }
        }

        Ok(stats)
    }
}
