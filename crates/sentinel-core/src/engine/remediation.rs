//! Remediation execution and healing
//!
//! Intents run one category at a time in classifier order. Every attempt
//! produces exactly one [`Remediation`] record; retries that pass also
//! produce a [`HealOutcome`] which [`apply_heals`] folds into a copy of the
//! raw batch.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::classifier::RemediationIntent;
use crate::config::RemediationPolicy;
use crate::contracts::{issue, HealthCheck, ProbeResult, Remediation, RemediationStatus};
use crate::delay::{Deadline, Sleeper};
use crate::error::RemediationError;
use crate::probes::{run_isolated, ProbeSet, CONNECTIVITY_CHECK};
use crate::triggers::TriggerClient;

const DEADLINE_EXCEEDED: &str = "deadline exceeded";

/// A retry that passed, to be applied to the batch entry of the same name
#[derive(Debug, Clone, PartialEq)]
pub struct HealOutcome {
    pub check_name: String,
    pub retry: ProbeResult,
}

/// Records and heals produced by one remediation pass
#[derive(Debug, Clone, Default)]
pub struct RemediationOutcome {
    pub remediations: Vec<Remediation>,
    pub heals: Vec<HealOutcome>,
}

/// Refresh operation with its resolved URL
#[derive(Debug, Clone)]
pub struct RefreshTarget {
    pub name: String,
    pub url: String,
}

/// Executes remediation intents against the collaborators
pub struct Remediator {
    policy: RemediationPolicy,
    refresh_targets: Vec<RefreshTarget>,
    probe_timeout: Duration,
    trigger: Arc<dyn TriggerClient>,
    sleeper: Arc<dyn Sleeper>,
}

impl Remediator {
    pub fn new(
        policy: RemediationPolicy,
        refresh_targets: Vec<RefreshTarget>,
        probe_timeout: Duration,
        trigger: Arc<dyn TriggerClient>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            policy,
            refresh_targets,
            probe_timeout,
            trigger,
            sleeper,
        }
    }

    pub async fn execute(
        &self,
        intents: &[RemediationIntent],
        probes: &ProbeSet,
        run_id: Uuid,
        deadline: &Deadline,
    ) -> RemediationOutcome {
        let mut outcome = RemediationOutcome::default();

        for intent in intents {
            match intent {
                RemediationIntent::RetryDatabase => {
                    let backoff = deadline.clamp(self.policy.database_unreachable.backoff());
                    self.sleeper.sleep(backoff).await;
                    self.retry(
                        issue::DATABASE_UNREACHABLE,
                        "retry_database_connection".to_string(),
                        CONNECTIVITY_CHECK,
                        probes,
                        deadline,
                        &mut outcome,
                    )
                    .await;
                }
                RemediationIntent::RetryFunction { name } => {
                    let backoff = deadline.clamp(self.policy.function_unhealthy.backoff());
                    self.sleeper.sleep(backoff).await;
                    self.retry(
                        issue::FUNCTION_UNHEALTHY,
                        format!("retry_edge_function:{}", name),
                        name,
                        probes,
                        deadline,
                        &mut outcome,
                    )
                    .await;
                }
                RemediationIntent::Redeploy { pages } => {
                    let record = self.redeploy(pages, run_id, deadline).await;
                    outcome.remediations.push(record);
                }
                RemediationIntent::RefreshData => {
                    let records = self.refresh(run_id, deadline).await;
                    outcome.remediations.extend(records);
                }
            }
        }

        outcome
    }

    async fn retry(
        &self,
        issue: &str,
        action: String,
        check_name: &str,
        probes: &ProbeSet,
        deadline: &Deadline,
        outcome: &mut RemediationOutcome,
    ) {
        if deadline.expired() {
            outcome.remediations.push(deadline_skip(issue, action));
            return;
        }

        let Some(probe) = probes.find(check_name) else {
            let error =
                RemediationError::PrerequisiteMissing(format!("no probe named {}", check_name));
            outcome
                .remediations
                .push(Remediation::errored(issue, action, &error, Utc::now()));
            return;
        };

        let triggered_at = Utc::now();
        let retry = run_isolated(probe, deadline.clamp(self.probe_timeout)).await;

        tracing::info!(
            check = check_name,
            action = %action,
            retry_status = %retry.status,
            "Retried failing check"
        );

        let status = if retry.is_pass() {
            RemediationStatus::Success
        } else {
            RemediationStatus::Failed
        };
        let mut record = Remediation::new(issue, action, status, triggered_at)
            .with_detail("retryStatus", retry.status.as_str())
            .with_detail("retryResponseTimeMs", retry.response_time_ms);
        if let Some(error) = retry.details.get("error") {
            record = record.with_detail("error", error.clone());
        }
        outcome.remediations.push(record);

        if retry.is_pass() {
            outcome.heals.push(HealOutcome {
                check_name: check_name.to_string(),
                retry,
            });
        }
    }

    async fn redeploy(&self, pages: &[String], run_id: Uuid, deadline: &Deadline) -> Remediation {
        let action = "trigger_redeploy";
        let Some(hook) = &self.policy.page_failure.hook_url else {
            let error = RemediationError::PrerequisiteMissing("no redeploy hook configured".into());
            return Remediation::errored(issue::PAGE_DOWN, action, &error, Utc::now())
                .with_detail("pages", pages.to_vec());
        };
        if deadline.expired() {
            return deadline_skip(issue::PAGE_DOWN, action.to_string())
                .with_detail("pages", pages.to_vec());
        }

        let triggered_at = Utc::now();
        let timeout = deadline.clamp(Duration::from_millis(self.policy.page_failure.timeout_ms));
        let record = match self.trigger.trigger(hook, run_id, timeout).await {
            Ok(code) if (200..300).contains(&code) => Remediation::new(
                issue::PAGE_DOWN,
                action,
                RemediationStatus::Triggered,
                triggered_at,
            )
            .with_detail("statusCode", code),
            Ok(code) => {
                Remediation::new(issue::PAGE_DOWN, action, RemediationStatus::Failed, triggered_at)
                    .with_detail("statusCode", code)
                    .with_detail("error", format!("redeploy hook answered {}", code))
            }
            Err(e) => Remediation::errored(issue::PAGE_DOWN, action, &e, triggered_at),
        };

        tracing::info!(status = %record.status, pages = pages.len(), "Redeploy hook dispatched");
        record.with_detail("pages", pages.to_vec())
    }

    async fn refresh(&self, run_id: Uuid, deadline: &Deadline) -> Vec<Remediation> {
        if self.refresh_targets.is_empty() {
            let error =
                RemediationError::PrerequisiteMissing("no refresh operations configured".into());
            return vec![Remediation::errored(
                issue::STALE_DATA,
                "trigger_refresh",
                &error,
                Utc::now(),
            )];
        }

        let policy = &self.policy.stale_data;
        let mut records = Vec::with_capacity(self.refresh_targets.len());

        for (index, target) in self.refresh_targets.iter().enumerate() {
            let action = format!("trigger_refresh:{}", target.name);

            if index > 0 {
                self.sleeper
                    .sleep(deadline.clamp(Duration::from_millis(policy.delay_ms)))
                    .await;
            }
            if deadline.expired() {
                records.push(deadline_skip(issue::STALE_DATA, action));
                continue;
            }

            let triggered_at = Utc::now();
            let timeout = deadline.clamp(Duration::from_millis(policy.timeout_ms));
            let record = match self.trigger.trigger(&target.url, run_id, timeout).await {
                Ok(code) if (200..300).contains(&code) => Remediation::new(
                    issue::STALE_DATA,
                    action,
                    RemediationStatus::Success,
                    triggered_at,
                )
                .with_detail("statusCode", code),
                Ok(code) => Remediation::new(
                    issue::STALE_DATA,
                    action,
                    RemediationStatus::Failed,
                    triggered_at,
                )
                .with_detail("statusCode", code)
                .with_detail("error", format!("refresh operation answered {}", code)),
                Err(e) => Remediation::errored(issue::STALE_DATA, action, &e, triggered_at),
            };

            tracing::info!(
                operation = %target.name,
                status = %record.status,
                "Refresh operation dispatched"
            );
            records.push(record);
        }

        records
    }
}

fn deadline_skip(issue: &str, action: String) -> Remediation {
    tracing::warn!(issue, action = %action, "Skipping remediation, run deadline exceeded");
    Remediation::new(issue, action, RemediationStatus::Skipped, Utc::now())
        .with_detail("reason", DEADLINE_EXCEEDED)
}

/// Copy the raw batch with every passing retry applied
///
/// Healed entries keep their batch timestamp and gain `healed` and
/// `originalStatus` details. Each entry heals at most once.
pub fn apply_heals(raw: &[HealthCheck], heals: &[HealOutcome]) -> Vec<HealthCheck> {
    raw.iter()
        .map(|check| {
            let Some(heal) = heals.iter().find(|h| h.check_name == check.check_name) else {
                return check.clone();
            };

            let mut details = heal.retry.details.clone();
            details.insert("healed".into(), true.into());
            details.insert("originalStatus".into(), check.status.as_str().into());
            if let Some(error) = check.details.get("error") {
                details.insert("originalError".into(), error.clone());
            }

            HealthCheck {
                status: heal.retry.status,
                response_time_ms: heal.retry.response_time_ms,
                details,
                ..check.clone()
            }
        })
        .collect()
}
