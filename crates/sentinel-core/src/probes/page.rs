//! Page reachability probe

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, STRICT_TRANSPORT_SECURITY};
use std::time::{Duration, Instant};

use super::{elapsed_ms, Probe};
use crate::contracts::{CheckType, ProbeResult};
use crate::error::ProbeError;

/// GET a page, following redirects
pub struct PageProbe {
    name: String,
    url: String,
    http: reqwest::Client,
}

impl PageProbe {
    pub fn new(name: String, url: String, http: reqwest::Client) -> Self {
        Self { name, url, http }
    }
}

#[async_trait]
impl Probe for PageProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_type(&self) -> CheckType {
        CheckType::Page
    }

    async fn probe(&self, timeout: Duration) -> ProbeResult {
        let start = Instant::now();

        let response = match self.http.get(&self.url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                let error = ProbeError::from_reqwest(&e, timeout.as_millis() as u64);
                return ProbeResult::fail(elapsed_ms(start), &error)
                    .with_detail("url", self.url.as_str());
            }
        };

        let latency = elapsed_ms(start);
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let has_hsts = response.headers().contains_key(STRICT_TRANSPORT_SECURITY);

        let result = if status.is_success() {
            ProbeResult::pass(latency)
        } else if status.is_server_error() {
            ProbeResult::fail(
                latency,
                &ProbeError::Logical(format!("Server error: {}", status)),
            )
        } else {
            // Client errors point at configuration, not an outage
            ProbeResult::warn(latency, format!("Non-success status: {}", status))
        };

        result
            .with_detail("url", self.url.as_str())
            .with_detail("statusCode", status.as_u16())
            .with_detail("contentType", content_type)
            .with_detail("hasHsts", has_hsts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::CheckStatus;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn probe_status(code: u16) -> ProbeResult {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/regulations"))
            .respond_with(
                ResponseTemplate::new(code)
                    .insert_header("content-type", "text/html")
                    .insert_header("strict-transport-security", "max-age=63072000"),
            )
            .mount(&server)
            .await;

        let probe = PageProbe::new(
            "regulations".into(),
            format!("{}/regulations", server.uri()),
            reqwest::Client::new(),
        );
        probe.probe(Duration::from_secs(2)).await
    }

    #[tokio::test]
    async fn test_success_passes_with_details() {
        let result = probe_status(200).await;
        assert_eq!(result.status, CheckStatus::Pass);
        assert_eq!(result.details["statusCode"], 200);
        assert_eq!(result.details["contentType"], "text/html");
        assert_eq!(result.details["hasHsts"], true);
    }

    #[tokio::test]
    async fn test_client_error_warns() {
        assert_eq!(probe_status(404).await.status, CheckStatus::Warn);
    }

    #[tokio::test]
    async fn test_server_error_fails() {
        let result = probe_status(503).await;
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.details["errorKind"], "probe_logical_failure");
    }

    #[tokio::test]
    async fn test_redirect_is_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("location", format!("{}/new", server.uri()).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let url = format!("{}/old", server.uri());
        let probe = PageProbe::new("old".into(), url, reqwest::Client::new());
        assert_eq!(probe.probe(Duration::from_secs(2)).await.status, CheckStatus::Pass);
    }

    #[tokio::test]
    async fn test_connection_refused_fails() {
        let probe =
            PageProbe::new("dead".into(), "http://127.0.0.1:9/".into(), reqwest::Client::new());
        let result = probe.probe(Duration::from_secs(2)).await;
        assert_eq!(result.status, CheckStatus::Fail);
        assert!(result.details.contains_key("error"));
    }
}
