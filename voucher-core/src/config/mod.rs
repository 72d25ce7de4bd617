use serde::{Deserialize, Serialize};

/// Engine-level settings shared by both pipelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub use_proxies: bool,
    pub proxy_file: String,
    pub target_file: String,
    pub concurrency_limit: usize,
    pub retry_budget: u32,
    pub goal_count: i64,
    pub auth_token: String,
    pub service: ServiceConfig,
}

/// Upstream service endpoints and knobs. The engine only ever sees
/// these as opaque strings; the runner crate owns the wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub probe_url: String,
    pub claim_url: String,
    pub check_url: String,
    pub campaign_id: String,
    #[serde(default)]
    pub redeem_url_prefix: String,
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
}

fn default_rate_limit_delay_ms() -> u64 {
    2000
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_results_dir() -> String {
    "results".to_string()
}

impl RunConfig {
    /// Derives the retry driver knobs for this run.
    pub fn retry_config(&self) -> crate::utils::retry::RetryConfig {
        crate::utils::retry::RetryConfig::new(
            self.retry_budget,
            self.service.rate_limit_delay_ms,
        )
    }
}
