use anyhow::Result;
use config::{Config, File};
use serde::Deserialize;
use voucher_core::config::{RunConfig, ServiceConfig};
use voucher_core::ConfigError;

/// On-disk configuration (TOML or JSON, resolved by the `config`
/// crate). Field names match the recognized operator options.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub use_proxies: bool,
    #[serde(default = "default_proxy_file")]
    pub proxy_file: String,
    #[serde(default = "default_target_file")]
    pub target_file: String,
    pub concurrency_limit: usize,
    pub retry_budget: u32,
    pub goal_count: i64,
    #[serde(default)]
    pub auth_token: String,
    pub service: ServiceConfig,
}

fn default_proxy_file() -> String {
    "proxies.txt".to_string()
}

fn default_target_file() -> String {
    "targets.txt".to_string()
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .build()?;

        let cfg: AppConfig = settings.try_deserialize().map_err(|e| anyhow::anyhow!(e))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "concurrency_limit".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.goal_count < 0 {
            return Err(ConfigError::InvalidValue {
                field: "goal_count".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        for (field, value) in [
            ("service.probe_url", &self.service.probe_url),
            ("service.claim_url", &self.service.claim_url),
            ("service.check_url", &self.service.check_url),
        ] {
            if value.is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn to_run_config(&self) -> RunConfig {
        RunConfig {
            use_proxies: self.use_proxies,
            proxy_file: self.proxy_file.clone(),
            target_file: self.target_file.clone(),
            concurrency_limit: self.concurrency_limit,
            retry_budget: self.retry_budget,
            goal_count: self.goal_count,
            auth_token: self.auth_token.clone(),
            service: self.service.clone(),
        }
    }
}
