//! Sentinel contracts
//!
//! Data model shared by the probes, the engine, the audit log and the HTTP
//! surface. Everything here serializes with camelCase field names, the shape
//! the dashboard consumes.

mod remediation;
mod report;

pub use remediation::*;
pub use report::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::ProbeError;

/// Free-form diagnostic map attached to checks and remediations
pub type Details = HashMap<String, serde_json::Value>;

/// Surface a check targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    /// Public page reachability
    Page,
    /// Backend function liveness
    Function,
    /// Backing store connectivity, freshness and volume
    Database,
    /// Strict-transport header heuristic
    Transport,
}

impl CheckType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::Page => "page",
            CheckType::Function => "function",
            CheckType::Database => "database",
            CheckType::Transport => "transport",
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a probe hands back to the orchestrator
///
/// Deliberately carries no timestamp: only the orchestrator stamps results,
/// once, after every probe in the batch has finished.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub status: CheckStatus,
    pub response_time_ms: u64,
    pub details: Details,
}

impl ProbeResult {
    /// Create passing result
    pub fn pass(response_time_ms: u64) -> Self {
        Self {
            status: CheckStatus::Pass,
            response_time_ms,
            details: Details::new(),
        }
    }

    /// Create warning result
    pub fn warn(response_time_ms: u64, reason: impl Into<String>) -> Self {
        let mut details = Details::new();
        details.insert("reason".to_string(), serde_json::Value::String(reason.into()));
        Self {
            status: CheckStatus::Warn,
            response_time_ms,
            details,
        }
    }

    /// Create failing result from a probe error
    pub fn fail(response_time_ms: u64, error: &ProbeError) -> Self {
        let mut details = Details::new();
        details.insert(
            "error".to_string(),
            serde_json::Value::String(error.to_string()),
        );
        details.insert(
            "errorKind".to_string(),
            serde_json::Value::String(error.kind().to_string()),
        );
        Self {
            status: CheckStatus::Fail,
            response_time_ms,
            details,
        }
    }

    /// Add a diagnostic entry
    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn is_pass(&self) -> bool {
        self.status == CheckStatus::Pass
    }
}

/// One stamped entry of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub check_type: CheckType,
    pub check_name: String,
    pub status: CheckStatus,
    pub response_time_ms: u64,
    #[serde(default)]
    pub details: Details,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheck {
    /// Stamp a probe result with the batch timestamp
    pub fn stamped(
        check_type: CheckType,
        check_name: impl Into<String>,
        result: ProbeResult,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            check_type,
            check_name: check_name.into(),
            status: result.status,
            response_time_ms: result.response_time_ms,
            details: result.details,
            checked_at,
        }
    }

    /// Whether this entry was upgraded to pass by a remediation retry
    pub fn is_healed(&self) -> bool {
        self.details
            .get("healed")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_result_captures_error() {
        let result = ProbeResult::fail(12, &ProbeError::Transport("connection refused".into()));
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(
            result.details["error"],
            serde_json::json!("Transport error: connection refused")
        );
        assert_eq!(result.details["errorKind"], serde_json::json!("probe_transport_error"));
    }

    #[test]
    fn test_health_check_wire_format() {
        let check = HealthCheck::stamped(
            CheckType::Page,
            "home",
            ProbeResult::pass(40).with_detail("statusCode", 200),
            Utc::now(),
        );
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["checkType"], "page");
        assert_eq!(json["checkName"], "home");
        assert_eq!(json["status"], "pass");
        assert_eq!(json["responseTimeMs"], 40);
        assert_eq!(json["details"]["statusCode"], 200);
        assert!(json.get("checkedAt").is_some());
    }

    #[test]
    fn test_is_healed_defaults_false() {
        let check =
            HealthCheck::stamped(CheckType::Function, "sync", ProbeResult::pass(5), Utc::now());
        assert!(!check.is_healed());
    }
}
