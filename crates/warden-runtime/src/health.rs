//! HTTP health checks against the local server.
//!
//! Intentionally minimal: one GET, one timeout, no domain logic.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use warden_core::ports::{HealthCheck, ProbeOutcome};

/// Per-request timeout for health checks.
pub const HEALTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// [`HealthCheck`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpHealthCheck {
    client: Client,
}

impl HttpHealthCheck {
    /// Create a checker with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthCheck for HttpHealthCheck {
    async fn check(&self, url: &str) -> ProbeOutcome {
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => ProbeOutcome::Healthy,
            Ok(response) => {
                let code = response.status().as_u16();
                debug!(%url, code, "health check returned non-success status");
                ProbeOutcome::BadStatus { code }
            }
            Err(e) => {
                let error = if e.is_timeout() {
                    "Health check timeout".to_string()
                } else if e.is_connect() {
                    "Connection refused".to_string()
                } else {
                    format!("Health check failed: {e}")
                };
                ProbeOutcome::Unreachable { error }
            }
        }
    }
}

/// Join a base URL and an endpoint path without doubling the slash.
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
