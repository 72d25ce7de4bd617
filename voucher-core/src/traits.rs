use anyhow::Result;
use async_trait::async_trait;

/// Per-worker completion tally, aggregated by the pool.
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    pub success: u64,
    pub failed: u64,
}

/// One unit of pooled work.
///
/// An acquisition worker loops until the target counter is met; a
/// validation worker handles exactly one code and exits. Either way
/// the worker absorbs its own per-call failures and reports the tally;
/// an `Err` return is an unexpected job-level failure that the pool
/// counts without touching sibling workers.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Short identifier used in log spans.
    fn name(&self) -> &str;

    /// Runs the worker to completion. Must observe `token` at loop
    /// tops and around backoff sleeps; in-flight calls are allowed to
    /// finish.
    async fn run(&self, token: tokio_util::sync::CancellationToken) -> Result<WorkerStats>;
}
