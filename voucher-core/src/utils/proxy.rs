use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// One egress descriptor: a proxy base URL plus optional basic-auth
/// credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Immutable pool of egress descriptors, loaded once at startup.
///
/// Selection is stateless: every attempt re-rolls a uniform index, so
/// retries of the same job may exit through different proxies. An
/// empty pool means direct egress.
#[derive(Debug, Default)]
pub struct ProxyPool {
    endpoints: Vec<ProxyEndpoint>,
}

impl ProxyPool {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_endpoints(endpoints: Vec<ProxyEndpoint>) -> Self {
        Self { endpoints }
    }

    /// Loads proxies from a newline-delimited file.
    /// Accepted line formats: `ip:port`, `ip:port:username:password`,
    /// or a full URL with a scheme. Blank lines and `#` comments are
    /// skipped; malformed lines are skipped with a warning.
    pub fn load(path: &str) -> Result<Self> {
        let file_path = Path::new(path);
        if !file_path.exists() {
            warn!("{} not found. Running without proxies.", path);
            return Ok(Self::empty());
        }

        let content =
            fs::read_to_string(file_path).with_context(|| format!("Failed to read {}", path))?;
        let mut endpoints = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.contains("://") {
                endpoints.push(ProxyEndpoint {
                    url: line.to_string(),
                    username: None,
                    password: None,
                });
                continue;
            }

            let parts: Vec<&str> = line.split(':').collect();
            if parts.len() < 2 {
                warn!("Skipping invalid proxy line: {}", line);
                continue;
            }

            // ip:port:user:pass -> 4 parts
            // ip:port -> 2 parts
            let url = format!("http://{}:{}", parts[0], parts[1]);

            let (username, password) = if parts.len() >= 4 {
                (Some(parts[2].to_string()), Some(parts[3].to_string()))
            } else {
                (None, None)
            };

            endpoints.push(ProxyEndpoint {
                url,
                username,
                password,
            });
        }

        info!("Loaded {} proxies from {}", endpoints.len(), path);
        Ok(Self { endpoints })
    }

    /// Picks one descriptor uniformly at random, or `None` for direct
    /// egress when the pool is empty.
    pub fn select(&self) -> Option<&ProxyEndpoint> {
        if self.endpoints.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..self.endpoints.len());
        self.endpoints.get(idx)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
