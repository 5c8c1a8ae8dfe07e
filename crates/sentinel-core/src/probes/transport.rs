//! Transport-security heuristic
//!
//! HEAD the primary site and look for a Strict-Transport-Security header.
//! This is a header check only; certificates are not inspected.

use async_trait::async_trait;
use reqwest::header::STRICT_TRANSPORT_SECURITY;
use std::time::{Duration, Instant};

use super::{elapsed_ms, Probe};
use crate::contracts::{CheckType, ProbeResult};
use crate::error::ProbeError;

pub const TRANSPORT_CHECK: &str = "ssl_hsts";

pub struct TransportSecurityProbe {
    url: String,
    http: reqwest::Client,
}

impl TransportSecurityProbe {
    pub fn new(url: String, http: reqwest::Client) -> Self {
        Self { url, http }
    }
}

#[async_trait]
impl Probe for TransportSecurityProbe {
    fn name(&self) -> &str {
        TRANSPORT_CHECK
    }

    fn check_type(&self) -> CheckType {
        CheckType::Transport
    }

    async fn probe(&self, timeout: Duration) -> ProbeResult {
        let start = Instant::now();
        match self.http.head(&self.url).timeout(timeout).send().await {
            Ok(response) => {
                let latency = elapsed_ms(start);
                let hsts = response
                    .headers()
                    .get(STRICT_TRANSPORT_SECURITY)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let result = match &hsts {
                    Some(_) => ProbeResult::pass(latency),
                    None => ProbeResult::warn(latency, "Strict-Transport-Security header missing"),
                };
                result
                    .with_detail("hsts", hsts)
                    .with_detail("statusCode", response.status().as_u16())
            }
            Err(e) => ProbeResult::fail(
                elapsed_ms(start),
                &ProbeError::from_reqwest(&e, timeout.as_millis() as u64),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::CheckStatus;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_hsts_present_passes() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("strict-transport-security", "max-age=31536000"),
            )
            .mount(&server)
            .await;

        let probe = TransportSecurityProbe::new(server.uri(), reqwest::Client::new());
        let result = probe.probe(Duration::from_secs(2)).await;
        assert_eq!(result.status, CheckStatus::Pass);
        assert_eq!(result.details["hsts"], "max-age=31536000");
    }

    #[tokio::test]
    async fn test_hsts_missing_warns() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = TransportSecurityProbe::new(server.uri(), reqwest::Client::new());
        assert_eq!(probe.probe(Duration::from_secs(2)).await.status, CheckStatus::Warn);
    }
}
