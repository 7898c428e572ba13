//! Single-shot HTTP health check port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of one health request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ProbeOutcome {
    /// The endpoint answered with a 2xx status.
    Healthy,
    /// The endpoint answered, but not with success (e.g. 503 while loading).
    BadStatus { code: u16 },
    /// No answer: connection refused, timeout, DNS failure.
    Unreachable { error: String },
}

impl ProbeOutcome {
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Issues a single GET-style request with a bounded timeout.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self, url: &str) -> ProbeOutcome;
}
