//! # Utilities Module
//!
//! Internal utility modules for the voucher-core crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

// Internal modules - not part of public API
pub(crate) mod logger;
pub(crate) mod proxy;
pub(crate) mod retry;
pub(crate) mod runner;

// Selective exports - only public utilities
pub use logger::setup_logger;
pub use proxy::{ProxyEndpoint, ProxyPool};
pub use runner::{PoolStats, WorkerPool};
