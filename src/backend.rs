use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::payload::OutboundPayload;

/// Outcome of one backend call. Invocation never returns an `Err`; every
/// failure mode is a variant here.
#[derive(Debug, Clone)]
pub enum BackendResult {
    Success {
        status: u16,
        /// Best-effort structured parse of the body; `None` when the body is
        /// not valid JSON, which is not itself an error.
        parsed: Option<serde_json::Value>,
        raw: String,
    },
    Failure(BackendFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendFailure {
    Timeout,
    /// Non-2xx HTTP status.
    Status(u16),
    Network(String),
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn invoke(&self, payload: &OutboundPayload) -> BackendResult;
}

/// Posts payloads to the configured webhook. Exactly one attempt per
/// message; a failed or timed-out call is final.
pub struct HttpBackend {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(url: String, timeout_ms: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn invoke(&self, payload: &OutboundPayload) -> BackendResult {
        let response = match self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return BackendResult::Failure(BackendFailure::Timeout),
            Err(e) => return BackendResult::Failure(BackendFailure::Network(e.to_string())),
        };

        let status = response.status();

        // Body is read as text first; structured parse is best-effort.
        let raw = match response.text().await {
            Ok(t) => t,
            Err(e) if e.is_timeout() => return BackendResult::Failure(BackendFailure::Timeout),
            Err(e) => return BackendResult::Failure(BackendFailure::Network(e.to_string())),
        };

        if !status.is_success() {
            debug!(status = status.as_u16(), body = %raw, "backend returned non-2xx");
            return BackendResult::Failure(BackendFailure::Status(status.as_u16()));
        }

        let parsed = serde_json::from_str(&raw).ok();
        BackendResult::Success {
            status: status.as_u16(),
            parsed,
            raw,
        }
    }
}
