//! Issue classification
//!
//! Maps a raw batch to the remediation intents it warrants. Output order is
//! the execution order: database retry, function retries in batch order,
//! page redeploy, stale-data refresh.

use crate::contracts::{issue, CheckStatus, CheckType, HealthCheck};
use crate::probes::{CONNECTIVITY_CHECK, FRESHNESS_CHECK};

/// One remediation the engine should attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationIntent {
    /// Back off, then re-run the connectivity probe once
    RetryDatabase,
    /// Re-run one function liveness probe once
    RetryFunction { name: String },
    /// Fire the redeploy hook once for all failing pages
    Redeploy { pages: Vec<String> },
    /// Run the configured refresh operations in sequence
    RefreshData,
}

impl RemediationIntent {
    pub fn issue(&self) -> &'static str {
        match self {
            RemediationIntent::RetryDatabase => issue::DATABASE_UNREACHABLE,
            RemediationIntent::RetryFunction { .. } => issue::FUNCTION_UNHEALTHY,
            RemediationIntent::Redeploy { .. } => issue::PAGE_DOWN,
            RemediationIntent::RefreshData => issue::STALE_DATA,
        }
    }
}

pub fn classify(batch: &[HealthCheck]) -> Vec<RemediationIntent> {
    let mut intents = Vec::new();

    let db_down = batch
        .iter()
        .any(|c| c.check_name == CONNECTIVITY_CHECK && c.status == CheckStatus::Fail);
    if db_down {
        intents.push(RemediationIntent::RetryDatabase);
    }

    intents.extend(
        batch
            .iter()
            .filter(|c| c.check_type == CheckType::Function && c.status != CheckStatus::Pass)
            .map(|c| RemediationIntent::RetryFunction {
                name: c.check_name.clone(),
            }),
    );

    let failing_pages: Vec<String> = batch
        .iter()
        .filter(|c| c.check_type == CheckType::Page && c.status == CheckStatus::Fail)
        .map(|c| c.check_name.clone())
        .collect();
    if !failing_pages.is_empty() {
        intents.push(RemediationIntent::Redeploy {
            pages: failing_pages,
        });
    }

    let stale = batch
        .iter()
        .any(|c| c.check_name == FRESHNESS_CHECK && c.status != CheckStatus::Pass);
    if stale {
        intents.push(RemediationIntent::RefreshData);
    }

    intents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::ProbeResult;
    use crate::error::ProbeError;
    use chrono::Utc;

    fn check(check_type: CheckType, name: &str, status: CheckStatus) -> HealthCheck {
        let result = match status {
            CheckStatus::Pass => ProbeResult::pass(1),
            CheckStatus::Warn => ProbeResult::warn(1, "degraded"),
            CheckStatus::Fail => ProbeResult::fail(1, &ProbeError::Transport("refused".into())),
        };
        HealthCheck::stamped(check_type, name, result, Utc::now())
    }

    #[test]
    fn test_healthy_batch_has_no_intents() {
        let batch = vec![
            check(CheckType::Page, "home", CheckStatus::Pass),
            check(CheckType::Function, "sync", CheckStatus::Pass),
            check(CheckType::Database, FRESHNESS_CHECK, CheckStatus::Pass),
        ];
        assert!(classify(&batch).is_empty());
    }

    #[test]
    fn test_priority_order() {
        let batch = vec![
            check(CheckType::Page, "home", CheckStatus::Fail),
            check(CheckType::Page, "about", CheckStatus::Fail),
            check(CheckType::Function, "sync", CheckStatus::Warn),
            check(CheckType::Function, "notify", CheckStatus::Fail),
            check(CheckType::Database, CONNECTIVITY_CHECK, CheckStatus::Fail),
            check(CheckType::Database, FRESHNESS_CHECK, CheckStatus::Warn),
        ];

        assert_eq!(
            classify(&batch),
            vec![
                RemediationIntent::RetryDatabase,
                RemediationIntent::RetryFunction { name: "sync".into() },
                RemediationIntent::RetryFunction { name: "notify".into() },
                RemediationIntent::Redeploy {
                    pages: vec!["home".into(), "about".into()]
                },
                RemediationIntent::RefreshData,
            ]
        );
    }

    #[test]
    fn test_page_warning_does_not_redeploy() {
        let batch = vec![check(CheckType::Page, "home", CheckStatus::Warn)];
        assert!(classify(&batch).is_empty());
    }

    #[test]
    fn test_volume_warning_is_not_stale_data() {
        let batch = vec![check(CheckType::Database, "data_volume", CheckStatus::Warn)];
        assert!(classify(&batch).is_empty());
    }

    #[test]
    fn test_issue_signatures() {
        assert_eq!(RemediationIntent::RetryDatabase.issue(), "database_unreachable");
        assert_eq!(RemediationIntent::RefreshData.issue(), "stale_data");
    }
}
