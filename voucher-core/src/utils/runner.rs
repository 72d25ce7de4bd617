use crate::traits::Worker;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};

/// Aggregated run outcome across all workers.
#[derive(Debug, Default, Clone)]
pub struct PoolStats {
    pub success: u64,
    pub failed: u64,
    /// Workers that exited through an unexpected error or panic.
    pub worker_errors: u64,
}

pub struct WorkerPool;

impl WorkerPool {
    /// Spawns the workers gated by a counting semaphore of capacity
    /// `concurrency_limit` and waits for all of them, with a Ctrl+C
    /// listener wired to the shared cancellation token.
    pub async fn run(workers: Vec<Box<dyn Worker>>, concurrency_limit: usize) -> PoolStats {
        let token = CancellationToken::new();
        let cloned_token = token.clone();

        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C. Initiating graceful shutdown...");
                    cloned_token.cancel();
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });

        Self::run_with_token(workers, concurrency_limit, token).await
    }

    /// As [`WorkerPool::run`] but with a caller-supplied token, so an
    /// embedding context (or a test) controls cancellation itself.
    ///
    /// A worker that errors or panics is counted and releases its
    /// concurrency slot; sibling workers are never terminated.
    pub async fn run_with_token(
        workers: Vec<Box<dyn Worker>>,
        concurrency_limit: usize,
        token: CancellationToken,
    ) -> PoolStats {
        let semaphore = Arc::new(Semaphore::new(concurrency_limit.max(1)));
        let mut set = JoinSet::new();

        let start_time = std::time::Instant::now();
        info!(
            "Starting {} workers (concurrency limit {})...",
            workers.len(),
            concurrency_limit
        );

        for (i, worker) in workers.into_iter().enumerate() {
            let id = i + 1;
            let span = tracing::info_span!("worker", worker_id = format!("{:03}", id));
            let child_token = token.clone();
            let sem = semaphore.clone();

            set.spawn(
                async move {
                    let _permit = sem
                        .acquire_owned()
                        .await
                        .map_err(|_| anyhow!("worker pool semaphore closed"))?;

                    match worker.run(child_token).await {
                        Ok(stats) => Ok(stats),
                        Err(e) => {
                            error!("Worker {} failed: {:?}", id, e);
                            Err(e)
                        }
                    }
                }
                .instrument(span),
            );
        }

        let mut totals = PoolStats::default();

        while let Some(res) = set.join_next().await {
            match res {
                Ok(Ok(stats)) => {
                    totals.success += stats.success;
                    totals.failed += stats.failed;
                }
                Ok(Err(_)) => {
                    // Already logged in the worker task.
                    totals.worker_errors += 1;
                }
                Err(e) => {
                    error!("A worker task panicked or failed to join: {:?}", e);
                    totals.worker_errors += 1;
                }
            }
        }

        let total_duration = start_time.elapsed();
        let total = totals.success + totals.failed;
        let rate = if total > 0 {
            (totals.success as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        info!("Shutdown complete.");
        info!(
            "Total Time: {:.1}s | Total Success: {} | Total Fail: {} | Success Rate: {:.2}%",
            total_duration.as_secs_f64(),
            totals.success,
            totals.failed,
            rate
        );

        totals
    }
}
