//! Single-consumer channel for completion events.
//!
//! Every worker holds a cheap sender clone; one consumer task drains
//! the channel and hands each event to a [`ResultWriter`]. Keeping the
//! writer on its own task means a slow filesystem never blocks a
//! worker inside its network-call section.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Classification of a completed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeClass {
    /// Freshly acquired, confirmed unique.
    Acquired,
    /// Valid, monthly plan tier.
    Monthly,
    /// Valid, quarterly plan tier (the default bucket).
    Quarterly,
    /// Valid, yearly plan tier.
    Yearly,
    /// Used or unknown code.
    Invalid,
}

/// Emitted once per unique acquisition success, or once per
/// classified validation outcome.
#[derive(Debug, Clone)]
pub struct ResultEvent {
    pub code: String,
    pub outcome: OutcomeClass,
    pub at: DateTime<Utc>,
}

impl ResultEvent {
    pub fn new(code: impl Into<String>, outcome: OutcomeClass) -> Self {
        Self {
            code: code.into(),
            outcome,
            at: Utc::now(),
        }
    }
}

/// Destination for result events. The runner implements this over
/// categorized append-only files.
#[async_trait]
pub trait ResultWriter: Send + Sync {
    async fn write(&self, event: &ResultEvent) -> Result<()>;
}

/// Cloneable producer handle to the sink channel.
#[derive(Clone)]
pub struct ResultSink {
    tx: mpsc::UnboundedSender<ResultEvent>,
}

impl ResultSink {
    /// Spawns the consumer task. The returned handle completes once
    /// every sink clone has been dropped and the channel is drained.
    pub fn spawn(writer: Arc<dyn ResultWriter>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ResultEvent>();

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = writer.write(&event).await {
                    warn!("Failed to record result for {}: {:#}", event.code, e);
                }
            }
        });

        (Self { tx }, handle)
    }

    /// Emits one event. A closed channel only happens during teardown
    /// and is not an error for the emitting worker.
    pub fn emit(&self, event: ResultEvent) {
        if self.tx.send(event).is_err() {
            warn!("Result sink closed before all events were emitted");
        }
    }
}
