use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
pub struct RunMetricsSnapshot {
    pub timestamp: String,
    pub elapsed_secs: f64,
    pub acquisition: AcquisitionMetrics,
    pub validation: ValidationMetrics,
    pub errors: u64,
    pub retries: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcquisitionMetrics {
    pub acquired: u64,
    pub misses: u64,
    pub per_minute: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationMetrics {
    pub monthly: u64,
    pub quarterly: u64,
    pub yearly: u64,
    pub invalid: u64,
}

/// Run-scoped metrics aggregate.
///
/// Replaces ambient process-wide counters: one instance is created per
/// run and passed into workers as `Arc`. All updates are single atomic
/// operations with `SeqCst` ordering; a snapshot taken while workers
/// are live is internally consistent per counter, not across counters.
#[derive(Debug)]
pub struct RunMetrics {
    acquired: AtomicU64,
    misses: AtomicU64,
    invalid: AtomicU64,
    errors: AtomicU64,
    retries: AtomicU64,
    monthly: AtomicU64,
    quarterly: AtomicU64,
    yearly: AtomicU64,
    start_time: Instant,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self {
            acquired: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalid: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            monthly: AtomicU64::new(0),
            quarterly: AtomicU64::new(0),
            yearly: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_acquired(&self) {
        self.acquired.fetch_add(1, Ordering::SeqCst);
    }

    /// A structurally valid response that carried no usable code.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_invalid(&self) {
        self.invalid.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    /// One upstream rate-limit cycle (sleep-and-retry).
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_monthly(&self) {
        self.monthly.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_quarterly(&self) {
        self.quarterly.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_yearly(&self) {
        self.yearly.fetch_add(1, Ordering::SeqCst);
    }

    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::SeqCst)
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::SeqCst)
    }

    pub fn invalid(&self) -> u64 {
        self.invalid.load(Ordering::SeqCst)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> RunMetricsSnapshot {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let acquired = self.acquired.load(Ordering::SeqCst);

        RunMetricsSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            elapsed_secs: elapsed,
            acquisition: AcquisitionMetrics {
                acquired,
                misses: self.misses.load(Ordering::SeqCst),
                per_minute: if elapsed > 0.0 {
                    acquired as f64 / elapsed * 60.0
                } else {
                    0.0
                },
            },
            validation: ValidationMetrics {
                monthly: self.monthly.load(Ordering::SeqCst),
                quarterly: self.quarterly.load(Ordering::SeqCst),
                yearly: self.yearly.load(Ordering::SeqCst),
                invalid: self.invalid.load(Ordering::SeqCst),
            },
            errors: self.errors.load(Ordering::SeqCst),
            retries: self.retries.load(Ordering::SeqCst),
        }
    }

    pub fn to_json(&self) -> String {
        let snapshot = self.snapshot();
        serde_json::to_string_pretty(&snapshot).unwrap_or_else(|_| "{}".to_string())
    }

    pub async fn export_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = self.to_json();
        tokio::fs::write(path, json).await
    }
}
