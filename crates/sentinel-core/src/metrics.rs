//! Prometheus metrics for the sentinel
//!
//! - `sentinel_runs_total` (counter) - invocations by overall status
//! - `sentinel_checks_total` (counter) - final check outcomes by type and status
//! - `sentinel_remediations_total` (counter) - remediation records by issue and status
//! - `sentinel_run_duration_seconds` (histogram) - wall time of an invocation
//! - `sentinel_audit_failures_total` (counter) - audit writes dropped or rejected

use prometheus::{Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry};
use std::sync::Arc;

use crate::contracts::HealthReport;

/// Metric handles registered on one registry
#[derive(Clone)]
pub struct SentinelMetrics {
    registry: Arc<Registry>,
    runs_total: CounterVec,
    checks_total: CounterVec,
    remediations_total: CounterVec,
    run_duration_seconds: Histogram,
    audit_failures_total: Counter,
}

impl SentinelMetrics {
    /// Create a fresh registry with every sentinel metric registered
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Arc::new(Registry::new()))
    }

    pub fn with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let runs_total = CounterVec::new(
            Opts::new("runs_total", "Health-check invocations by overall status")
                .namespace("sentinel"),
            &["status"],
        )?;

        let checks_total = CounterVec::new(
            Opts::new("checks_total", "Final check outcomes by type and status")
                .namespace("sentinel"),
            &["check_type", "status"],
        )?;

        let remediations_total = CounterVec::new(
            Opts::new("remediations_total", "Remediation records by issue and status")
                .namespace("sentinel"),
            &["issue", "status"],
        )?;

        let run_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("run_duration_seconds", "Invocation wall time in seconds")
                .namespace("sentinel")
                .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        )?;

        let audit_failures_total = Counter::new(
            "sentinel_audit_failures_total",
            "Audit writes that were dropped or rejected",
        )?;

        registry.register(Box::new(runs_total.clone()))?;
        registry.register(Box::new(checks_total.clone()))?;
        registry.register(Box::new(remediations_total.clone()))?;
        registry.register(Box::new(run_duration_seconds.clone()))?;
        registry.register(Box::new(audit_failures_total.clone()))?;

        Ok(Self {
            registry,
            runs_total,
            checks_total,
            remediations_total,
            run_duration_seconds,
            audit_failures_total,
        })
    }

    /// Record everything a finished invocation tells us
    pub fn record_report(&self, report: &HealthReport) {
        self.runs_total
            .with_label_values(&[report.summary.status.as_str()])
            .inc();

        for check in &report.checks {
            self.checks_total
                .with_label_values(&[check.check_type.as_str(), check.status.as_str()])
                .inc();
        }

        for remediation in &report.remediations {
            self.remediations_total
                .with_label_values(&[remediation.issue.as_str(), remediation.status.as_str()])
                .inc();
        }

        self.run_duration_seconds
            .observe(report.summary.execution_time_ms as f64 / 1000.0);
    }

    pub fn record_audit_failure(&self) {
        self.audit_failures_total.inc();
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Encode metrics as text for scraping
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
