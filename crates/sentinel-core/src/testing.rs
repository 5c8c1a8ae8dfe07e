//! In-memory collaborators
//!
//! Scripted probes, a static data store and recording fakes for the
//! sleeper, trigger client and audit sink. Compiled for this crate's tests
//! and for dependents that enable the `testing` feature.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::audit::{AuditRecord, AuditSink};
use crate::contracts::{CheckType, ProbeResult};
use crate::delay::Sleeper;
use crate::error::{PersistenceError, ProbeError, RemediationError};
use crate::probes::Probe;
use crate::store::DataStore;
use crate::triggers::TriggerClient;

/// Probe that replays a fixed sequence of results, repeating the last one
pub struct ScriptedProbe {
    name: String,
    check_type: CheckType,
    script: Mutex<VecDeque<ProbeResult>>,
    last: Mutex<Option<ProbeResult>>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(name: impl Into<String>, check_type: CheckType, script: Vec<ProbeResult>) -> Self {
        Self {
            name: name.into(),
            check_type,
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn passing(name: impl Into<String>, check_type: CheckType) -> Self {
        Self::new(name, check_type, vec![ProbeResult::pass(1)])
    }

    pub fn failing(name: impl Into<String>, check_type: CheckType) -> Self {
        Self::new(
            name,
            check_type,
            vec![ProbeResult::fail(1, &ProbeError::Transport("connection refused".into()))],
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_type(&self) -> CheckType {
        self.check_type
    }

    async fn probe(&self, _timeout: Duration) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match next {
            Some(result) => {
                *last = Some(result.clone());
                result
            }
            None => last.clone().unwrap_or_else(|| {
                ProbeResult::fail(0, &ProbeError::Logical("empty script".into()))
            }),
        }
    }
}

/// Probe that panics, for exercising the orchestrator's isolation
pub struct PanickingProbe {
    pub name: String,
}

#[async_trait]
impl Probe for PanickingProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_type(&self) -> CheckType {
        CheckType::Function
    }

    async fn probe(&self, _timeout: Duration) -> ProbeResult {
        panic!("probe {} blew up", self.name);
    }
}

/// Data store answering from fixed values
#[derive(Debug, Clone)]
pub struct StaticStore {
    pub sample_rows: usize,
    pub recent_rows: usize,
    pub total_rows: u64,
    pub error: Option<ProbeError>,
}

impl StaticStore {
    pub fn healthy() -> Self {
        Self {
            sample_rows: 1,
            recent_rows: 1,
            total_rows: 1_250,
            error: None,
        }
    }

    pub fn unreachable(error: ProbeError) -> Self {
        Self {
            error: Some(error),
            ..Self::healthy()
        }
    }

    fn check(&self) -> Result<(), ProbeError> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DataStore for StaticStore {
    async fn sample(&self, _table: &str, limit: u32) -> Result<usize, ProbeError> {
        self.check()?;
        Ok(self.sample_rows.min(limit as usize))
    }

    async fn rows_since(
        &self,
        _table: &str,
        _column: &str,
        _since: DateTime<Utc>,
        limit: u32,
    ) -> Result<usize, ProbeError> {
        self.check()?;
        Ok(self.recent_rows.min(limit as usize))
    }

    async fn exact_count(&self, _table: &str) -> Result<u64, ProbeError> {
        self.check()?;
        Ok(self.total_rows)
    }
}

/// Sleeper that returns immediately and remembers what it was asked
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}

/// Trigger client that records every call and answers from a fixed outcome
pub struct RecordingTrigger {
    outcome: Result<u16, RemediationError>,
    calls: Mutex<Vec<(String, Uuid)>>,
}

impl RecordingTrigger {
    pub fn accepting() -> Self {
        Self::answering(Ok(202))
    }

    pub fn answering(outcome: Result<u16, RemediationError>) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// URLs triggered, in call order
    pub fn urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|c| c.iter().map(|(url, _)| url.clone()).collect())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl TriggerClient for RecordingTrigger {
    async fn trigger(
        &self,
        url: &str,
        run_id: Uuid,
        _timeout: Duration,
    ) -> Result<u16, RemediationError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((url.to_string(), run_id));
        }
        self.outcome.clone()
    }
}

/// Audit sink keeping records in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn write(&self, record: &AuditRecord) -> Result<(), PersistenceError> {
        self.records
            .lock()
            .map_err(|e| PersistenceError::QueueUnavailable(e.to_string()))?
            .push(record.clone());
        Ok(())
    }
}
