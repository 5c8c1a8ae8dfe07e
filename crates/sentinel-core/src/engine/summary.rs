//! Summary builder

use chrono::{DateTime, Utc};

use crate::contracts::{CheckStatus, HealthCheck, OverallStatus, Remediation, Summary};

/// Derive the summary from the final batch and the remediation list
pub fn build(
    checks: &[HealthCheck],
    remediations: &[Remediation],
    self_healing_enabled: bool,
    execution_time_ms: u64,
    checked_at: DateTime<Utc>,
) -> Summary {
    let count = |status: CheckStatus| checks.iter().filter(|c| c.status == status).count() as u32;
    let total_checks = checks.len() as u32;
    let passed = count(CheckStatus::Pass);
    let warnings = count(CheckStatus::Warn);
    let failures = count(CheckStatus::Fail);

    let status = if failures > 0 {
        OverallStatus::Degraded
    } else if warnings > 0 {
        OverallStatus::Warning
    } else {
        OverallStatus::Healthy
    };

    Summary {
        status,
        score: score(passed, total_checks),
        total_checks,
        passed,
        warnings,
        failures,
        healed: checks.iter().filter(|c| c.is_healed()).count() as u32,
        self_healing_enabled,
        remediations_taken: remediations.len() as u32,
        remediations_succeeded: remediations.iter().filter(|r| r.succeeded()).count() as u32,
        execution_time_ms,
        checked_at,
    }
}

/// round(100 * passed / total), half away from zero; 100 for an empty batch
pub fn score(passed: u32, total: u32) -> u8 {
    if total == 0 {
        return 100;
    }
    let (passed, total) = (u64::from(passed), u64::from(total));
    ((200 * passed + total) / (2 * total)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{issue, CheckType, ProbeResult, RemediationStatus};
    use crate::error::ProbeError;
    use proptest::prelude::*;

    fn check(status: CheckStatus) -> HealthCheck {
        let result = match status {
            CheckStatus::Pass => ProbeResult::pass(1),
            CheckStatus::Warn => ProbeResult::warn(1, "slow"),
            CheckStatus::Fail => ProbeResult::fail(1, &ProbeError::Timeout(10)),
        };
        HealthCheck::stamped(CheckType::Page, "p", result, Utc::now())
    }

    #[test]
    fn test_score_rounding() {
        assert_eq!(score(5, 6), 83);
        assert_eq!(score(4, 6), 67);
        assert_eq!(score(1, 2), 50);
        assert_eq!(score(1, 8), 13);
        assert_eq!(score(0, 3), 0);
        assert_eq!(score(0, 0), 100);
    }

    #[test]
    fn test_empty_batch_is_healthy() {
        let summary = build(&[], &[], true, 5, Utc::now());
        assert_eq!(summary.status, OverallStatus::Healthy);
        assert_eq!(summary.score, 100);
        assert_eq!(summary.total_checks, 0);
    }

    #[test]
    fn test_only_success_counts_as_succeeded() {
        use RemediationStatus::{Failed, Success, Triggered};

        let now = Utc::now();
        let remediations = vec![
            Remediation::new(issue::PAGE_DOWN, "trigger_redeploy", Triggered, now),
            Remediation::new(issue::STALE_DATA, "trigger_refresh:a", Success, now),
            Remediation::new(issue::STALE_DATA, "trigger_refresh:b", Failed, now),
        ];
        let summary = build(&[check(CheckStatus::Pass)], &remediations, true, 5, now);
        assert_eq!(summary.remediations_taken, 3);
        assert_eq!(summary.remediations_succeeded, 1);
    }

    #[test]
    fn test_counts_healed_entries() {
        let mut healed = check(CheckStatus::Pass);
        healed.details.insert("healed".into(), true.into());
        let summary = build(&[healed, check(CheckStatus::Warn)], &[], true, 5, Utc::now());
        assert_eq!(summary.healed, 1);
        assert_eq!(summary.status, OverallStatus::Warning);
    }

    fn status_strategy() -> impl Strategy<Value = CheckStatus> {
        prop_oneof![
            Just(CheckStatus::Pass),
            Just(CheckStatus::Warn),
            Just(CheckStatus::Fail)
        ]
    }

    proptest! {
        #[test]
        fn prop_status_follows_worst_check(
            statuses in prop::collection::vec(status_strategy(), 0..40)
        ) {
            let checks: Vec<HealthCheck> = statuses.iter().map(|s| check(*s)).collect();
            let summary = build(&checks, &[], false, 0, Utc::now());

            let expected = if statuses.contains(&CheckStatus::Fail) {
                OverallStatus::Degraded
            } else if statuses.contains(&CheckStatus::Warn) {
                OverallStatus::Warning
            } else {
                OverallStatus::Healthy
            };
            prop_assert_eq!(summary.status, expected);
            prop_assert_eq!(
                summary.passed + summary.warnings + summary.failures,
                summary.total_checks
            );
        }

        #[test]
        fn prop_score_matches_ratio(passed in 0u32..500, extra in 0u32..500) {
            let total = passed + extra;
            let s = score(passed, total);
            prop_assert!(s <= 100);
            if total > 0 {
                let exact = 100.0 * f64::from(passed) / f64::from(total);
                prop_assert!((f64::from(s) - exact).abs() <= 0.5);
            }
        }
    }
}
