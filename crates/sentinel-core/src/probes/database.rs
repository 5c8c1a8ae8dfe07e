//! Database probes
//!
//! Three independent checks against the same store: connectivity, data
//! freshness inside a rolling window, and a non-zero row count.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{elapsed_ms, Probe};
use crate::contracts::{CheckType, ProbeResult};
use crate::store::DataStore;

pub const CONNECTIVITY_CHECK: &str = "database_connectivity";
pub const FRESHNESS_CHECK: &str = "data_freshness";
pub const VOLUME_CHECK: &str = "data_volume";

/// Trivial bounded read
pub struct DatabaseConnectivityProbe {
    store: Arc<dyn DataStore>,
    table: String,
}

impl DatabaseConnectivityProbe {
    pub fn new(store: Arc<dyn DataStore>, table: String) -> Self {
        Self { store, table }
    }
}

#[async_trait]
impl Probe for DatabaseConnectivityProbe {
    fn name(&self) -> &str {
        CONNECTIVITY_CHECK
    }

    fn check_type(&self) -> CheckType {
        CheckType::Database
    }

    async fn probe(&self, _timeout: Duration) -> ProbeResult {
        let start = Instant::now();
        let result = match self.store.sample(&self.table, 1).await {
            Ok(rows) => ProbeResult::pass(elapsed_ms(start)).with_detail("rowsRead", rows),
            Err(e) => ProbeResult::fail(elapsed_ms(start), &e),
        };
        result.with_detail("table", self.table.as_str())
    }
}

/// At least one record created inside the freshness window
pub struct DataFreshnessProbe {
    store: Arc<dyn DataStore>,
    table: String,
    column: String,
    window: chrono::Duration,
}

impl DataFreshnessProbe {
    pub fn new(
        store: Arc<dyn DataStore>,
        table: String,
        column: String,
        window: chrono::Duration,
    ) -> Self {
        Self {
            store,
            table,
            column,
            window,
        }
    }
}

#[async_trait]
impl Probe for DataFreshnessProbe {
    fn name(&self) -> &str {
        FRESHNESS_CHECK
    }

    fn check_type(&self) -> CheckType {
        CheckType::Database
    }

    async fn probe(&self, _timeout: Duration) -> ProbeResult {
        let start = Instant::now();
        let since = Utc::now() - self.window;

        let result = match self.store.rows_since(&self.table, &self.column, since, 1).await {
            Ok(0) => ProbeResult::warn(
                elapsed_ms(start),
                format!("No records in the last {} hours", self.window.num_hours()),
            ),
            Ok(rows) => ProbeResult::pass(elapsed_ms(start)).with_detail("recentRecords", rows),
            Err(e) => ProbeResult::fail(elapsed_ms(start), &e),
        };

        result
            .with_detail("table", self.table.as_str())
            .with_detail("windowHours", self.window.num_hours())
            .with_detail("since", since.to_rfc3339())
    }
}

/// Exact row count must be above zero
pub struct DataVolumeProbe {
    store: Arc<dyn DataStore>,
    table: String,
}

impl DataVolumeProbe {
    pub fn new(store: Arc<dyn DataStore>, table: String) -> Self {
        Self { store, table }
    }
}

#[async_trait]
impl Probe for DataVolumeProbe {
    fn name(&self) -> &str {
        VOLUME_CHECK
    }

    fn check_type(&self) -> CheckType {
        CheckType::Database
    }

    async fn probe(&self, _timeout: Duration) -> ProbeResult {
        let start = Instant::now();
        let result = match self.store.exact_count(&self.table).await {
            Ok(0) => {
                ProbeResult::warn(elapsed_ms(start), "Table is empty").with_detail("rowCount", 0)
            }
            Ok(count) => ProbeResult::pass(elapsed_ms(start)).with_detail("rowCount", count),
            Err(e) => ProbeResult::fail(elapsed_ms(start), &e),
        };
        result.with_detail("table", self.table.as_str())
    }
}
