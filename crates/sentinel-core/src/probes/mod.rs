//! Probe executors
//!
//! One implementation per surface. Every probe honours the same contract:
//! bounded by its timeout and never failing outward. Transport errors, DNS
//! failures and timeouts all come back as a `fail` [`ProbeResult`].

mod database;
mod function;
mod page;
mod transport;

pub use database::{
    DatabaseConnectivityProbe, DataFreshnessProbe, DataVolumeProbe, CONNECTIVITY_CHECK,
    FRESHNESS_CHECK, VOLUME_CHECK,
};
pub use function::FunctionLivenessProbe;
pub use page::PageProbe;
pub use transport::{TransportSecurityProbe, TRANSPORT_CHECK};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::SentinelConfig;
use crate::contracts::{CheckType, ProbeResult};
use crate::error::{ConfigError, ProbeError};
use crate::store::DataStore;

/// A single bounded check against one external target
#[async_trait]
pub trait Probe: Send + Sync {
    /// Check name, unique within a batch
    fn name(&self) -> &str;

    fn check_type(&self) -> CheckType;

    /// Run the check. Implementations convert every error into a result.
    async fn probe(&self, timeout: Duration) -> ProbeResult;
}

/// Run a probe under a hard timeout
///
/// The probe future is dropped when the timeout elapses, so a probe that
/// ignores its own timeout is still cancelled here.
pub async fn run_bounded(probe: &dyn Probe, timeout: Duration) -> ProbeResult {
    let start = Instant::now();
    match tokio::time::timeout(timeout, probe.probe(timeout)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                probe = probe.name(),
                timeout_ms = timeout.as_millis() as u64,
                "Probe timed out"
            );
            ProbeResult::fail(
                elapsed_ms(start),
                &ProbeError::Timeout(timeout.as_millis() as u64),
            )
        }
    }
}

/// Run a probe on its own task so a panic becomes a `fail` result
pub async fn run_isolated(probe: Arc<dyn Probe>, timeout: Duration) -> ProbeResult {
    let name = probe.name().to_string();
    match tokio::spawn(async move { run_bounded(probe.as_ref(), timeout).await }).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(probe = %name, error = %e, "Probe task aborted");
            ProbeResult::fail(0, &ProbeError::Logical(format!("probe task aborted: {}", e)))
        }
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Ordered registry of the probes for one configuration
#[derive(Clone, Default)]
pub struct ProbeSet {
    probes: Vec<Arc<dyn Probe>>,
}

impl ProbeSet {
    pub fn new(probes: Vec<Arc<dyn Probe>>) -> Self {
        Self { probes }
    }

    /// Build the standard probe set: pages, functions, database, transport
    pub fn from_config(
        config: &SentinelConfig,
        http: reqwest::Client,
        store: Arc<dyn DataStore>,
    ) -> Result<Self, ConfigError> {
        let mut probes: Vec<Arc<dyn Probe>> = Vec::new();

        for page in &config.pages {
            probes.push(Arc::new(PageProbe::new(
                page.name.clone(),
                config.page_url(page)?,
                http.clone(),
            )));
        }

        let origin = config.expected_origin();
        for function in &config.functions {
            probes.push(Arc::new(FunctionLivenessProbe::new(
                function.name.clone(),
                config.function_url(function)?,
                origin.clone(),
                http.clone(),
            )));
        }

        let db = &config.database;
        probes.push(Arc::new(DatabaseConnectivityProbe::new(
            store.clone(),
            db.table.clone(),
        )));
        probes.push(Arc::new(DataFreshnessProbe::new(
            store.clone(),
            db.freshness_table().to_string(),
            db.freshness_column.clone(),
            chrono::Duration::hours(i64::from(db.freshness_window_hours)),
        )));
        probes.push(Arc::new(DataVolumeProbe::new(store, db.table.clone())));

        probes.push(Arc::new(TransportSecurityProbe::new(
            config.site_url.clone(),
            http,
        )));

        Ok(Self { probes })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Probe>> {
        self.probes.iter()
    }

    /// Find the probe that produced a check
    pub fn find(&self, name: &str) -> Option<Arc<dyn Probe>> {
        self.probes.iter().find(|p| p.name() == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::CheckStatus;

    struct SlowProbe;

    #[async_trait]
    impl Probe for SlowProbe {
        fn name(&self) -> &str {
            "slow"
        }

        fn check_type(&self) -> CheckType {
            CheckType::Page
        }

        async fn probe(&self, _timeout: Duration) -> ProbeResult {
            tokio::time::sleep(Duration::from_secs(30)).await;
            ProbeResult::pass(30_000)
        }
    }

    #[tokio::test]
    async fn test_run_bounded_cancels_slow_probe() {
        let result = run_bounded(&SlowProbe, Duration::from_millis(20)).await;
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.details["errorKind"], "probe_timeout");
    }

    #[test]
    fn test_from_config_order() {
        let config: SentinelConfig = serde_yaml::from_str(
            r#"
site_url: https://compliance.example.com
pages: [{ name: home, path: / }]
functions_base_url: https://project.example.co/functions/v1
functions: [{ name: fetch-bills }]
database: { url: "https://project.example.co", table: regulations }
"#,
        )
        .unwrap();
        let store = Arc::new(crate::testing::StaticStore::healthy());
        let set = ProbeSet::from_config(&config, reqwest::Client::new(), store).unwrap();

        let names: Vec<&str> = set.iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec![
                "home",
                "fetch-bills",
                CONNECTIVITY_CHECK,
                FRESHNESS_CHECK,
                VOLUME_CHECK,
                TRANSPORT_CHECK
            ]
        );
        assert!(set.find("fetch-bills").is_some());
        assert!(set.find("missing").is_none());
    }
}
