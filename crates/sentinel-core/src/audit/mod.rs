//! Audit log
//!
//! Append-only record of every final batch and every remediation attempt.
//! Writes are handed to a background task over a bounded channel; a full
//! queue or a rejected insert is logged and counted, never surfaced to the
//! caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::contracts::{Details, HealthCheck, Remediation};
use crate::error::PersistenceError;
use crate::metrics::SentinelMetrics;

/// Everything written for one invocation
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub run_id: Uuid,
    pub config_fingerprint: String,
    /// Post-heal batch
    pub checks: Vec<HealthCheck>,
    pub remediations: Vec<Remediation>,
}

/// Append-only destination for audit records
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn write(&self, record: &AuditRecord) -> Result<(), PersistenceError>;
}

/// Sink used when auditing is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn write(&self, _record: &AuditRecord) -> Result<(), PersistenceError> {
        Ok(())
    }
}

#[derive(Serialize)]
struct CheckRow<'a> {
    run_id: Uuid,
    config_fingerprint: &'a str,
    check_type: &'a str,
    check_name: &'a str,
    status: &'a str,
    response_time_ms: u64,
    details: &'a Details,
    checked_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct RemediationRow<'a> {
    run_id: Uuid,
    issue: &'a str,
    action: &'a str,
    status: &'a str,
    details: &'a Details,
    triggered_at: DateTime<Utc>,
}

/// Inserts rows into two tables over a PostgREST interface
#[derive(Clone)]
pub struct RestAuditSink {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    checks_table: String,
    remediations_table: String,
    timeout: Duration,
}

impl RestAuditSink {
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
        checks_table: impl Into<String>,
        remediations_table: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            checks_table: checks_table.into(),
            remediations_table: remediations_table.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Timeout applied to each insert request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=minimal"));
        if let Some(key) = &self.api_key {
            if let Ok(value) = HeaderValue::from_str(key) {
                headers.insert("apikey", value);
            }
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", key)) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    async fn insert<T: Serialize + Sync>(
        &self,
        table: &str,
        rows: &[T],
    ) -> Result<(), PersistenceError> {
        if rows.is_empty() {
            return Ok(());
        }

        let response = self
            .http
            .post(format!("{}/rest/v1/{}", self.base_url, table))
            .headers(self.headers())
            .timeout(self.timeout)
            .json(rows)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PersistenceError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AuditSink for RestAuditSink {
    async fn write(&self, record: &AuditRecord) -> Result<(), PersistenceError> {
        let checks: Vec<CheckRow<'_>> = record
            .checks
            .iter()
            .map(|c| CheckRow {
                run_id: record.run_id,
                config_fingerprint: &record.config_fingerprint,
                check_type: c.check_type.as_str(),
                check_name: &c.check_name,
                status: c.status.as_str(),
                response_time_ms: c.response_time_ms,
                details: &c.details,
                checked_at: c.checked_at,
            })
            .collect();

        let remediations: Vec<RemediationRow<'_>> = record
            .remediations
            .iter()
            .map(|r| RemediationRow {
                run_id: record.run_id,
                issue: &r.issue,
                action: &r.action,
                status: r.status.as_str(),
                details: &r.details,
                triggered_at: r.triggered_at,
            })
            .collect();

        self.insert(&self.checks_table, &checks).await?;
        self.insert(&self.remediations_table, &remediations).await
    }
}

/// Non-blocking front of an [`AuditSink`]
pub struct AuditLog {
    sender: mpsc::Sender<AuditRecord>,
    writer: JoinHandle<()>,
    metrics: Option<SentinelMetrics>,
}

impl AuditLog {
    /// Spawn the background writer. Must be called inside a tokio runtime.
    pub fn spawn(
        sink: Arc<dyn AuditSink>,
        queue_size: usize,
        metrics: Option<SentinelMetrics>,
    ) -> Self {
        let (sender, mut receiver) = mpsc::channel::<AuditRecord>(queue_size.max(1));
        let writer_metrics = metrics.clone();

        let writer = tokio::spawn(async move {
            while let Some(record) = receiver.recv().await {
                match sink.write(&record).await {
                    Ok(()) => tracing::debug!(
                        run_id = %record.run_id,
                        checks = record.checks.len(),
                        remediations = record.remediations.len(),
                        "Audit record written"
                    ),
                    Err(e) => {
                        tracing::warn!(
                            run_id = %record.run_id,
                            error = %e,
                            "Failed to write audit record"
                        );
                        if let Some(m) = &writer_metrics {
                            m.record_audit_failure();
                        }
                    }
                }
            }
        });

        Self {
            sender,
            writer,
            metrics,
        }
    }

    /// Queue a record without waiting
    pub fn record(&self, record: AuditRecord) {
        let run_id = record.run_id;
        if let Err(e) = self.sender.try_send(record) {
            let error = PersistenceError::QueueUnavailable(e.to_string());
            tracing::warn!(run_id = %run_id, error = %error, "Dropping audit record");
            if let Some(m) = &self.metrics {
                m.record_audit_failure();
            }
        }
    }

    /// Stop accepting records and wait for queued ones to be written
    pub async fn close(self, timeout: Duration) {
        drop(self.sender);
        if tokio::time::timeout(timeout, self.writer).await.is_err() {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                "Audit writer did not drain in time"
            );
        }
    }
}
