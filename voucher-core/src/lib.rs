//! # Voucher Core - Shared Engine for the Voucher Pipelines
//!
//! This crate provides the bounded-concurrency engine shared by the
//! acquisition and validation pipelines.
//!
//! ## Modules
//!
//! - [`config`] - Configuration structures for a pipeline run
//! - [`counter`] - Shared goal countdown and termination protocol
//! - [`dedup`] - Global uniqueness registry for emitted codes
//! - [`error`] - Typed error handling with thiserror
//! - [`metrics`] - Run-scoped metrics aggregate
//! - [`sink`] - Single-consumer result channel
//! - [`traits`] - Core trait definitions
//! - [`utils`] - Utility modules (retry, proxy, runner, logging)

// Module declarations - internal modules marked pub(crate)
pub mod config;
pub mod counter;
pub mod dedup;
pub mod error;
pub mod metrics;
pub mod sink;
pub mod traits;
pub(crate) mod utils;

// Selective exports - only public API types
pub use config::{RunConfig, ServiceConfig};
pub use counter::TargetCounter;
pub use dedup::DedupRegistry;
pub use error::{ConfigError, CoreError, NetworkError, ParseError};
pub use metrics::{RunMetrics, RunMetricsSnapshot};
pub use sink::{OutcomeClass, ResultEvent, ResultSink, ResultWriter};
pub use traits::{Worker, WorkerStats};

// Utils are pub(crate) - only export specific public utilities
pub use utils::{setup_logger, PoolStats, ProxyEndpoint, ProxyPool, WorkerPool};

// Export retry utilities for testing
pub use utils::retry::{drive, CallOutcome, ChainOutcome, RateLimitPolicy, RetryConfig};
