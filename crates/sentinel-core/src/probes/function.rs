//! Function liveness probe
//!
//! Sends a CORS preflight: the cheapest request a deployed function answers
//! without running its business logic. A function can pass this and still
//! fail on a real invocation; the probe only infers "deployed and reachable
//! with the right CORS configuration".

use async_trait::async_trait;
use reqwest::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN};
use reqwest::Method;
use std::time::{Duration, Instant};

use super::{elapsed_ms, Probe};
use crate::contracts::{CheckType, ProbeResult};
use crate::error::ProbeError;

pub struct FunctionLivenessProbe {
    name: String,
    url: String,
    expected_origin: String,
    http: reqwest::Client,
}

impl FunctionLivenessProbe {
    pub fn new(name: String, url: String, expected_origin: String, http: reqwest::Client) -> Self {
        Self {
            name,
            url,
            expected_origin,
            http,
        }
    }

    fn origin_matches(&self, allowed: Option<&str>) -> bool {
        match allowed {
            Some(value) => {
                let value = value.trim();
                value == "*" || value.trim_end_matches('/') == self.expected_origin
            }
            None => false,
        }
    }
}

#[async_trait]
impl Probe for FunctionLivenessProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_type(&self) -> CheckType {
        CheckType::Function
    }

    async fn probe(&self, timeout: Duration) -> ProbeResult {
        let start = Instant::now();

        let response = match self
            .http
            .request(Method::OPTIONS, &self.url)
            .header(ORIGIN, self.expected_origin.as_str())
            .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .timeout(timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let error = ProbeError::from_reqwest(&e, timeout.as_millis() as u64);
                return ProbeResult::fail(elapsed_ms(start), &error);
            }
        };

        let latency = elapsed_ms(start);
        let status = response.status();
        let allowed_origin = response
            .headers()
            .get(ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let cors_ok = self.origin_matches(allowed_origin.as_deref());

        let result = if status.is_success() && cors_ok {
            ProbeResult::pass(latency)
        } else if !status.is_success() {
            ProbeResult::warn(latency, format!("Preflight returned status {}", status))
        } else {
            ProbeResult::warn(latency, "Preflight did not echo the expected origin")
        };

        result
            .with_detail("statusCode", status.as_u16())
            .with_detail("corsOrigin", allowed_origin)
            .with_detail("expectedOrigin", self.expected_origin.as_str())
    }
}
