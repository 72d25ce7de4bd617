//! Validation worker: classify exactly one code, then exit.

use crate::client::UpstreamClient;
use crate::extract::{CheckVerdict, PlanTier};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use colored::Colorize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use voucher_core::{
    drive, ChainOutcome, OutcomeClass, RateLimitPolicy, ResultEvent, ResultSink, RetryConfig,
    RunMetrics, Worker, WorkerStats,
};

pub struct ValidateWorker {
    code: String,
    client: Arc<UpstreamClient>,
    retry: RetryConfig,
    metrics: Arc<RunMetrics>,
    sink: ResultSink,
}

impl ValidateWorker {
    pub fn new(
        code: String,
        client: Arc<UpstreamClient>,
        retry: RetryConfig,
        metrics: Arc<RunMetrics>,
        sink: ResultSink,
    ) -> Self {
        Self {
            code,
            client,
            retry,
            metrics,
            sink,
        }
    }
}

#[async_trait]
impl Worker for ValidateWorker {
    fn name(&self) -> &str {
        "validate"
    }

    async fn run(&self, token: CancellationToken) -> Result<WorkerStats> {
        let mut stats = WorkerStats::default();

        // Validation honors the server wait hint on 429s.
        match drive(
            &self.retry,
            RateLimitPolicy::ServerHint,
            &self.metrics,
            &token,
            "check",
            || self.client.check_code(&self.code),
        )
        .await
        {
            ChainOutcome::Success(CheckVerdict::Valid(tier)) => {
                match tier {
                    PlanTier::Monthly => self.metrics.record_monthly(),
                    PlanTier::Quarterly => self.metrics.record_quarterly(),
                    PlanTier::Yearly => self.metrics.record_yearly(),
                }
                stats.success += 1;

                info!(
                    target: "job_result",
                    "[{}] Valid - {} | {}",
                    Local::now().format("%H:%M:%S"),
                    self.code.bright_magenta(),
                    tier.label().bright_green()
                );
                self.sink
                    .emit(ResultEvent::new(self.code.clone(), outcome_for(tier)));
            }
            ChainOutcome::Success(verdict) => {
                self.metrics.record_invalid();
                stats.failed += 1;

                let reason = match verdict {
                    CheckVerdict::Used => "used",
                    _ => "unknown",
                };
                info!(
                    target: "job_result",
                    "[{}] Invalid ({}) - {}",
                    Local::now().format("%H:%M:%S"),
                    reason,
                    self.code.bright_red()
                );
                self.sink
                    .emit(ResultEvent::new(self.code.clone(), OutcomeClass::Invalid));
            }
            ChainOutcome::Exhausted => {
                stats.failed += 1;
                warn!(
                    target: "job_result",
                    "[{}] Failed to classify {} after all attempts",
                    Local::now().format("%H:%M:%S"),
                    self.code
                );
            }
            ChainOutcome::Cancelled => {}
        }

        Ok(stats)
    }
}

fn outcome_for(tier: PlanTier) -> OutcomeClass {
    match tier {
        PlanTier::Monthly => OutcomeClass::Monthly,
        PlanTier::Quarterly => OutcomeClass::Quarterly,
        PlanTier::Yearly => OutcomeClass::Yearly,
    }
}
