//! Summary and response body

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{HealthCheck, Remediation};

/// Overall verdict for an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Healthy,
    Warning,
    Degraded,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Healthy => "healthy",
            OverallStatus::Warning => "warning",
            OverallStatus::Degraded => "degraded",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived view of the final batch and the remediation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Degraded on any fail, warning on any warn, otherwise healthy
    pub status: OverallStatus,
    /// round(100 * passed / total); 100 for an empty batch
    pub score: u8,
    /// Number of checks in the final batch
    pub total_checks: u32,
    /// Checks passing after healing
    pub passed: u32,
    /// Checks left at warn
    pub warnings: u32,
    /// Checks left at fail
    pub failures: u32,
    /// Checks whose retry passed (`details.healed`)
    pub healed: u32,
    /// Whether remediation ran for this invocation
    pub self_healing_enabled: bool,
    /// Remediation records written, whatever their status
    pub remediations_taken: u32,
    /// Remediation records with status `success`
    pub remediations_succeeded: u32,
    /// Wall time of the whole invocation
    pub execution_time_ms: u64,
    /// Batch timestamp shared by every check
    pub checked_at: DateTime<Utc>,
}

/// Response body of one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Per-invocation id, also sent on outbound triggers and audit rows
    pub run_id: Uuid,
    /// Summary fields, flattened into the top level of the body
    #[serde(flatten)]
    pub summary: Summary,
    /// Final, post-healing batch in registration order
    pub checks: Vec<HealthCheck>,
    /// One record per remediation attempt, in execution order
    pub remediations: Vec<Remediation>,
}

impl HealthReport {
    pub fn is_degraded(&self) -> bool {
        self.summary.status == OverallStatus::Degraded
    }
}
