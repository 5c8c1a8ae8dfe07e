//! Remediation audit records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Details;
use crate::error::RemediationError;

/// Issue signatures the classifier can raise
pub mod issue {
    pub const STALE_DATA: &str = "stale_data";
    pub const PAGE_DOWN: &str = "page_down";
    pub const FUNCTION_UNHEALTHY: &str = "function_unhealthy";
    pub const DATABASE_UNREACHABLE: &str = "database_unreachable";
}

/// Outcome of one remediation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationStatus {
    /// Accepted by the collaborator, outcome not observable yet
    Triggered,
    /// Completed and verified (retry passed, refresh accepted)
    Success,
    Failed,
    /// Not attempted; `details.reason` says why
    Skipped,
}

impl RemediationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemediationStatus::Triggered => "triggered",
            RemediationStatus::Success => "success",
            RemediationStatus::Failed => "failed",
            RemediationStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for RemediationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record per remediation attempt. Never merged or deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remediation {
    pub issue: String,
    pub action: String,
    pub status: RemediationStatus,
    #[serde(default)]
    pub details: Details,
    pub triggered_at: DateTime<Utc>,
}

impl Remediation {
    pub fn new(
        issue: impl Into<String>,
        action: impl Into<String>,
        status: RemediationStatus,
        triggered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            issue: issue.into(),
            action: action.into(),
            status,
            details: Details::new(),
            triggered_at,
        }
    }

    /// Record for an action that could not be delivered
    pub fn errored(
        issue: impl Into<String>,
        action: impl Into<String>,
        error: &RemediationError,
        triggered_at: DateTime<Utc>,
    ) -> Self {
        let status = match error {
            RemediationError::PrerequisiteMissing(_) => RemediationStatus::Skipped,
            _ => RemediationStatus::Failed,
        };
        let key = if status == RemediationStatus::Skipped {
            "reason"
        } else {
            "error"
        };
        Self::new(issue, action, status, triggered_at)
            .with_detail(key, error.to_string())
            .with_detail("errorKind", error.kind())
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn succeeded(&self) -> bool {
        self.status == RemediationStatus::Success
    }
}
