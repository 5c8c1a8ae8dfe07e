//! Remediation trigger client
//!
//! Refresh operations and the redeploy hook are both fire-and-forget POSTs.
//! Every call carries the invocation's run id so receivers can drop repeats
//! when the external scheduler retries an invocation.

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::error::RemediationError;

/// Header carrying the invocation id on outbound trigger calls
pub const RUN_ID_HEADER: &str = "X-Sentinel-Run-Id";

/// Delivers remediation triggers to external collaborators
#[async_trait]
pub trait TriggerClient: Send + Sync {
    /// POST to `url`; returns the HTTP status the collaborator answered with
    async fn trigger(
        &self,
        url: &str,
        run_id: Uuid,
        timeout: Duration,
    ) -> Result<u16, RemediationError>;
}

/// HTTP implementation
#[derive(Clone)]
pub struct HttpTriggerClient {
    http: reqwest::Client,
    bearer: Option<String>,
}

impl HttpTriggerClient {
    pub fn new(http: reqwest::Client, bearer: Option<String>) -> Self {
        Self { http, bearer }
    }
}

#[async_trait]
impl TriggerClient for HttpTriggerClient {
    async fn trigger(
        &self,
        url: &str,
        run_id: Uuid,
        timeout: Duration,
    ) -> Result<u16, RemediationError> {
        if timeout.is_zero() {
            return Err(RemediationError::Timeout(0));
        }

        let mut request = self
            .http
            .post(url)
            .header(RUN_ID_HEADER, run_id.to_string())
            .json(&serde_json::json!({ "source": "sentinel", "runId": run_id }))
            .timeout(timeout);

        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => Ok(response.status().as_u16()),
            Err(e) if e.is_timeout() => Err(RemediationError::Timeout(timeout.as_millis() as u64)),
            Err(e) => Err(RemediationError::Transport(e.to_string())),
        }
    }
}
