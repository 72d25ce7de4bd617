//! Per-call HTTP transport.
//!
//! Every attempt builds a fresh `reqwest::Client` carrying that
//! attempt's proxy selection, so transport configuration is an
//! immutable per-call descriptor and one worker's proxy can never
//! leak into a concurrent request. Compressed bodies (gzip/deflate)
//! are decoded transparently by reqwest.

use crate::extract::{self, CheckVerdict};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use voucher_core::config::ServiceConfig;
use voucher_core::{CallOutcome, NetworkError, ProxyEndpoint, ProxyPool};

pub struct UpstreamClient {
    service: ServiceConfig,
    auth_token: String,
    proxies: Arc<ProxyPool>,
}

impl UpstreamClient {
    pub fn new(service: ServiceConfig, auth_token: String, proxies: Arc<ProxyPool>) -> Self {
        Self {
            service,
            auth_token,
            proxies,
        }
    }

    /// Builds the transport for one attempt: fresh client, freshly
    /// rolled proxy. A descriptor that cannot be turned into a proxy
    /// aborts the attempt as a counted transport error.
    fn per_call_client(&self) -> Result<reqwest::Client, NetworkError> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_millis(self.service.request_timeout_ms));

        if let Some(endpoint) = self.proxies.select() {
            builder = builder.proxy(build_proxy(endpoint)?);
        }

        builder.build().map_err(|e| NetworkError::ConnectionFailed {
            endpoint: "<client build>".to_string(),
            reason: e.to_string(),
        })
    }

    /// Identity probe: fetches the public page for a synthetic handle
    /// and extracts the embedded account identity.
    pub async fn probe_identity(&self, handle: &str) -> CallOutcome<String> {
        let client = match self.per_call_client() {
            Ok(c) => c,
            Err(e) => return CallOutcome::Transient(e),
        };

        let url = format!(
            "{}/{}",
            self.service.probe_url.trim_end_matches('/'),
            handle
        );

        let response = match client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => return CallOutcome::Transient(transport_error(&url, self.service.request_timeout_ms, e)),
        };

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return CallOutcome::RateLimited(None);
        }
        if response.status().is_server_error() {
            return CallOutcome::Transient(NetworkError::HttpError {
                status_code: response.status().as_u16(),
                endpoint: url,
            });
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                return CallOutcome::Transient(NetworkError::DecodeFailed {
                    endpoint: url,
                    reason: e.to_string(),
                })
            }
        };

        match extract::identity(&body) {
            Some(identity) => CallOutcome::Success(identity),
            None => CallOutcome::Unparseable,
        }
    }

    /// Acquisition call: requests one fresh code for an identity.
    pub async fn claim_code(&self, identity: &str) -> CallOutcome<String> {
        let client = match self.per_call_client() {
            Ok(c) => c,
            Err(e) => return CallOutcome::Transient(e),
        };

        let url = self.service.claim_url.clone();
        let payload = serde_json::json!({
            "userId": identity,
            "campaignId": self.service.campaign_id,
        });

        let response = match client.post(&url).json(&payload).send().await {
            Ok(r) => r,
            Err(e) => return CallOutcome::Transient(transport_error(&url, self.service.request_timeout_ms, e)),
        };

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return CallOutcome::RateLimited(None);
        }
        if response.status().is_server_error() {
            return CallOutcome::Transient(NetworkError::HttpError {
                status_code: response.status().as_u16(),
                endpoint: url,
            });
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                return CallOutcome::Transient(NetworkError::DecodeFailed {
                    endpoint: url,
                    reason: e.to_string(),
                })
            }
        };

        match extract::claim_code(&body) {
            Some(code) => CallOutcome::Success(code),
            None => CallOutcome::Unparseable,
        }
    }

    /// Validation call: fetches the state of one code. A 429 carries
    /// the server's suggested wait when the payload provides one.
    pub async fn check_code(&self, code: &str) -> CallOutcome<CheckVerdict> {
        let client = match self.per_call_client() {
            Ok(c) => c,
            Err(e) => return CallOutcome::Transient(e),
        };

        let url = format!(
            "{}/{}",
            self.service.check_url.trim_end_matches('/'),
            code
        );

        let mut request = client.get(&url);
        if !self.auth_token.is_empty() {
            request = request.header("authorization", &self.auth_token);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => return CallOutcome::Transient(transport_error(&url, self.service.request_timeout_ms, e)),
        };

        let rate_limited = response.status() == StatusCode::TOO_MANY_REQUESTS;
        if !rate_limited && response.status().is_server_error() {
            return CallOutcome::Transient(NetworkError::HttpError {
                status_code: response.status().as_u16(),
                endpoint: url,
            });
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                return CallOutcome::Transient(NetworkError::DecodeFailed {
                    endpoint: url,
                    reason: e.to_string(),
                })
            }
        };

        if rate_limited {
            return CallOutcome::RateLimited(extract::retry_after_hint(&body));
        }

        match extract::check_verdict(&body) {
            Some(verdict) => CallOutcome::Success(verdict),
            None => CallOutcome::Unparseable,
        }
    }
}

fn build_proxy(endpoint: &ProxyEndpoint) -> Result<reqwest::Proxy, NetworkError> {
    let mut proxy = reqwest::Proxy::all(&endpoint.url).map_err(|_| NetworkError::InvalidProxy {
        descriptor: endpoint.url.clone(),
    })?;
    if let (Some(user), Some(pass)) = (&endpoint.username, &endpoint.password) {
        proxy = proxy.basic_auth(user, pass);
    }
    Ok(proxy)
}

fn transport_error(endpoint: &str, timeout_ms: u64, e: reqwest::Error) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout {
            timeout_ms,
            endpoint: endpoint.to_string(),
        }
    } else {
        NetworkError::ConnectionFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    }
}
