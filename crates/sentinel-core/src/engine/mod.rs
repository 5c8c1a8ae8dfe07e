//! Sentinel engine
//!
//! One invocation: probe everything in parallel, optionally remediate, build
//! the summary and hand the final batch to the audit log.

mod classifier;
mod orchestrator;
mod remediation;
mod summary;

pub use classifier::{classify, RemediationIntent};
pub use orchestrator::run_batch;
pub use remediation::{apply_heals, HealOutcome, RefreshTarget, RemediationOutcome, Remediator};
pub use summary::{build as build_summary, score};

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::audit::{AuditLog, AuditRecord, AuditSink, NoopAuditSink, RestAuditSink};
use crate::config::SentinelConfig;
use crate::contracts::HealthReport;
use crate::delay::{Deadline, Sleeper, TokioSleeper};
use crate::error::ConfigError;
use crate::metrics::SentinelMetrics;
use crate::probes::ProbeSet;
use crate::store::{DataStore, RestDataStore};
use crate::triggers::{HttpTriggerClient, TriggerClient};

const USER_AGENT: &str = concat!("platform-sentinel/", env!("CARGO_PKG_VERSION"));
const AUDIT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-invocation options
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub self_healing: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { self_healing: true }
    }
}

/// Health-check and self-healing engine
pub struct SentinelEngine {
    config: Arc<SentinelConfig>,
    fingerprint: String,
    probes: ProbeSet,
    remediator: Remediator,
    audit: AuditLog,
    metrics: SentinelMetrics,
}

impl SentinelEngine {
    pub fn builder(config: SentinelConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Build with production collaborators. Must be called inside a tokio runtime.
    pub fn new(config: SentinelConfig) -> Result<Self, ConfigError> {
        EngineBuilder::new(config).build()
    }

    /// Run one invocation
    ///
    /// Never fails: every probe, remediation and audit problem is reported
    /// inside the returned report or the logs.
    pub async fn run(&self, options: RunOptions) -> HealthReport {
        let run_id = Uuid::new_v4();
        let deadline = Deadline::after(self.config.execution.run_deadline());

        tracing::info!(
            run_id = %run_id,
            self_healing = options.self_healing,
            probes = self.probes.len(),
            "Starting health check run"
        );

        let raw = run_batch(&self.probes, self.config.execution.probe_timeout()).await;
        let checked_at = raw.first().map(|c| c.checked_at).unwrap_or_else(Utc::now);

        let (checks, remediations) = if options.self_healing {
            let intents = classify(&raw);
            tracing::debug!(run_id = %run_id, intents = intents.len(), "Classified raw batch");

            let outcome = self
                .remediator
                .execute(&intents, &self.probes, run_id, &deadline)
                .await;
            (apply_heals(&raw, &outcome.heals), outcome.remediations)
        } else {
            (raw, Vec::new())
        };

        let summary = build_summary(
            &checks,
            &remediations,
            options.self_healing,
            deadline.elapsed().as_millis() as u64,
            checked_at,
        );

        tracing::info!(
            run_id = %run_id,
            status = %summary.status,
            score = summary.score,
            failures = summary.failures,
            healed = summary.healed,
            remediations = summary.remediations_taken,
            execution_time_ms = summary.execution_time_ms,
            "Health check run complete"
        );

        let report = HealthReport {
            run_id,
            summary,
            checks,
            remediations,
        };

        self.metrics.record_report(&report);
        self.audit.record(AuditRecord {
            run_id,
            config_fingerprint: self.fingerprint.clone(),
            checks: report.checks.clone(),
            remediations: report.remediations.clone(),
        });

        report
    }

    /// Flush pending audit writes; call before the runtime shuts down
    pub async fn shutdown(self) {
        self.audit.close(AUDIT_DRAIN_TIMEOUT).await;
    }

    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }

    pub fn metrics(&self) -> &SentinelMetrics {
        &self.metrics
    }

    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }
}

/// Assembles an engine, with every collaborator replaceable
pub struct EngineBuilder {
    config: SentinelConfig,
    probes: Option<ProbeSet>,
    store: Option<Arc<dyn DataStore>>,
    trigger: Option<Arc<dyn TriggerClient>>,
    sleeper: Option<Arc<dyn Sleeper>>,
    audit_sink: Option<Arc<dyn AuditSink>>,
    metrics: Option<SentinelMetrics>,
}

impl EngineBuilder {
    pub fn new(config: SentinelConfig) -> Self {
        Self {
            config,
            probes: None,
            store: None,
            trigger: None,
            sleeper: None,
            audit_sink: None,
            metrics: None,
        }
    }

    /// Replace the probe set derived from the configuration
    pub fn with_probes(mut self, probes: ProbeSet) -> Self {
        self.probes = Some(probes);
        self
    }

    pub fn with_data_store(mut self, store: Arc<dyn DataStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_trigger_client(mut self, trigger: Arc<dyn TriggerClient>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    pub fn with_metrics(mut self, metrics: SentinelMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validate the configuration and wire the engine
    ///
    /// Spawns the audit writer, so this must run inside a tokio runtime.
    pub fn build(self) -> Result<SentinelEngine, ConfigError> {
        let config = self.config;
        config.validate()?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        let db = &config.database;
        let probes = match self.probes {
            Some(probes) => probes,
            None => {
                let store = self.store.unwrap_or_else(|| {
                    let rest = RestDataStore::new(http.clone(), &db.url, db.api_key.clone());
                    Arc::new(rest) as Arc<dyn DataStore>
                });
                ProbeSet::from_config(&config, http.clone(), store)?
            }
        };

        let refresh_targets = config
            .remediation
            .stale_data
            .operations
            .iter()
            .map(|op| {
                Ok(RefreshTarget {
                    name: op.name.clone(),
                    url: config.function_url(op)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let trigger = self.trigger.unwrap_or_else(|| {
            let client = HttpTriggerClient::new(http.clone(), db.api_key.clone());
            Arc::new(client) as Arc<dyn TriggerClient>
        });
        let sleeper = self
            .sleeper
            .unwrap_or_else(|| Arc::new(TokioSleeper) as Arc<dyn Sleeper>);

        let remediator = Remediator::new(
            config.remediation.clone(),
            refresh_targets,
            config.execution.probe_timeout(),
            trigger,
            sleeper,
        );

        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => SentinelMetrics::new()?,
        };

        let audit_sink: Arc<dyn AuditSink> = match self.audit_sink {
            Some(sink) => sink,
            None if config.audit.enabled => Arc::new(RestAuditSink::new(
                http,
                &db.url,
                db.api_key.clone(),
                config.audit.checks_table.clone(),
                config.audit.remediations_table.clone(),
            )
            .with_timeout(config.audit.timeout())),
            None => Arc::new(NoopAuditSink),
        };
        let audit = AuditLog::spawn(audit_sink, config.audit.queue_size, Some(metrics.clone()));

        tracing::info!(
            probes = probes.len(),
            refresh_operations = config.remediation.stale_data.operations.len(),
            audit = config.audit.enabled,
            "Sentinel engine ready"
        );

        Ok(SentinelEngine {
            fingerprint: config.fingerprint(),
            config: Arc::new(config),
            probes,
            remediator,
            audit,
            metrics,
        })
    }
}
