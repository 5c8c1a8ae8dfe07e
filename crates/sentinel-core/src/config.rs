//! Sentinel configuration
//!
//! Targets, execution limits and the remediation policy are passed into the
//! engine as one explicit object. Files may be YAML or TOML; the database API
//! key can be supplied through `SENTINEL_DB_API_KEY` instead of the file.
//!
//! ```yaml
//! site_url: https://compliance.example.com
//! pages:
//!   - { name: home, path: / }
//!   - { name: regulations, path: /regulations }
//! functions_base_url: https://project.example.co/functions/v1
//! functions:
//!   - { name: fetch-bills }
//! database:
//!   url: https://project.example.co
//!   table: regulations
//! remediation:
//!   stale_data:
//!     operations: [{ name: fetch-bills }]
//!   page_failure:
//!     hook_url: https://deploy.example.com/hooks/redeploy
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::probes::{CONNECTIVITY_CHECK, FRESHNESS_CHECK, TRANSPORT_CHECK, VOLUME_CHECK};

/// Names taken by the built-in database and transport checks
const RESERVED_CHECK_NAMES: [&str; 4] =
    [CONNECTIVITY_CHECK, FRESHNESS_CHECK, VOLUME_CHECK, TRANSPORT_CHECK];

/// Environment variable consulted for the database API key
pub const DB_API_KEY_ENV: &str = "SENTINEL_DB_API_KEY";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// Primary site, base for relative page paths and the transport probe
    pub site_url: String,

    /// Origin the function preflight must see echoed back; defaults to the site origin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_origin: Option<String>,

    #[serde(default)]
    pub pages: Vec<PageTarget>,

    /// Base used for functions and refresh operations without an explicit URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions_base_url: Option<String>,

    #[serde(default)]
    pub functions: Vec<FunctionTarget>,

    pub database: DatabaseConfig,

    #[serde(default)]
    pub execution: ExecutionSettings,

    #[serde(default)]
    pub remediation: RemediationPolicy,

    #[serde(default)]
    pub audit: AuditConfig,
}

/// A page probed with GET
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageTarget {
    pub name: String,
    /// Path relative to `site_url`, or an absolute URL
    pub path: String,
}

/// A callable backend function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionTarget {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Backing store reachable through a PostgREST-style interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Table used for the connectivity and volume checks
    pub table: String,

    /// Table scanned for recent records; defaults to `table`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freshness_table: Option<String>,

    #[serde(default = "default_freshness_column")]
    pub freshness_column: String,

    #[serde(default = "default_freshness_window_hours")]
    pub freshness_window_hours: u32,
}

impl DatabaseConfig {
    pub fn freshness_table(&self) -> &str {
        self.freshness_table.as_deref().unwrap_or(&self.table)
    }
}

/// Probe and invocation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Timeout applied to every individual probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Upper bound for a whole invocation, probes and remediation included
    #[serde(default = "default_run_deadline_ms")]
    pub run_deadline_ms: u64,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            run_deadline_ms: default_run_deadline_ms(),
        }
    }
}

impl ExecutionSettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn run_deadline(&self) -> Duration {
        Duration::from_millis(self.run_deadline_ms)
    }
}

/// Issue signature to action mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationPolicy {
    #[serde(default)]
    pub stale_data: RefreshPolicy,

    #[serde(default)]
    pub page_failure: RedeployPolicy,

    #[serde(default = "RetryPolicy::immediate")]
    pub function_unhealthy: RetryPolicy,

    #[serde(default = "RetryPolicy::with_backoff")]
    pub database_unreachable: RetryPolicy,
}

impl Default for RemediationPolicy {
    fn default() -> Self {
        Self {
            stale_data: RefreshPolicy::default(),
            page_failure: RedeployPolicy::default(),
            function_unhealthy: RetryPolicy::immediate(),
            database_unreachable: RetryPolicy::with_backoff(),
        }
    }
}

/// Upstream data refresh operations, run one at a time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshPolicy {
    #[serde(default)]
    pub operations: Vec<FunctionTarget>,

    /// Pause between consecutive operations
    #[serde(default = "default_inter_action_delay_ms")]
    pub delay_ms: u64,

    #[serde(default = "default_action_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            operations: Vec::new(),
            delay_ms: default_inter_action_delay_ms(),
            timeout_ms: default_action_timeout_ms(),
        }
    }
}

/// Single redeploy hook for page failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeployPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_url: Option<String>,

    #[serde(default = "default_action_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RedeployPolicy {
    fn default() -> Self {
        Self {
            hook_url: None,
            timeout_ms: default_action_timeout_ms(),
        }
    }
}

/// Single retry of the failing probe. The retry count is fixed at one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Wait before the retry
    #[serde(default)]
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate()
    }
}

impl RetryPolicy {
    pub fn immediate() -> Self {
        Self { backoff_ms: 0 }
    }

    pub fn with_backoff() -> Self {
        Self {
            backoff_ms: default_db_backoff_ms(),
        }
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Audit persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_checks_table")]
    pub checks_table: String,

    #[serde(default = "default_remediations_table")]
    pub remediations_table: String,

    /// Records buffered before new ones are dropped
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Per-insert request timeout
    #[serde(default = "default_action_timeout_ms")]
    pub timeout_ms: u64,
}

impl AuditConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            checks_table: default_checks_table(),
            remediations_table: default_remediations_table(),
            queue_size: default_queue_size(),
            timeout_ms: default_action_timeout_ms(),
        }
    }
}

fn default_freshness_column() -> String {
    "created_at".to_string()
}

fn default_freshness_window_hours() -> u32 {
    24
}

fn default_probe_timeout_ms() -> u64 {
    10_000
}

fn default_run_deadline_ms() -> u64 {
    60_000
}

fn default_inter_action_delay_ms() -> u64 {
    2_000
}

fn default_action_timeout_ms() -> u64 {
    10_000
}

fn default_db_backoff_ms() -> u64 {
    2_000
}

fn default_true() -> bool {
    true
}

fn default_checks_table() -> String {
    "health_checks".to_string()
}

fn default_remediations_table() -> String {
    "remediation_log".to_string()
}

fn default_queue_size() -> usize {
    64
}

impl SentinelConfig {
    /// Load from a YAML, TOML or JSON file, chosen by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        let mut config: SentinelConfig = match extension.as_str() {
            "toml" => toml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Fill secrets from the environment when the file leaves them out
    pub fn apply_env(&mut self) {
        if self.database.api_key.is_none() {
            self.database.api_key = std::env::var(DB_API_KEY_ENV).ok().filter(|k| !k.is_empty());
        }
    }

    /// Reject configurations the engine cannot run
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_url("site_url", &self.site_url)?;
        parse_url("database.url", &self.database.url)?;

        if let Some(base) = &self.functions_base_url {
            parse_url("functions_base_url", base)?;
        }
        if let Some(hook) = &self.remediation.page_failure.hook_url {
            parse_url("remediation.page_failure.hook_url", hook)?;
        }

        if self.execution.probe_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "execution.probe_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.execution.run_deadline_ms < self.execution.probe_timeout_ms {
            return Err(ConfigError::Invalid(
                "execution.run_deadline_ms must be at least probe_timeout_ms".into(),
            ));
        }
        if self.audit.enabled && self.audit.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "audit.timeout_ms must be greater than zero".into(),
            ));
        }
        if self.database.table.trim().is_empty() {
            return Err(ConfigError::Invalid("database.table must not be empty".into()));
        }
        if self.database.freshness_window_hours == 0 {
            return Err(ConfigError::Invalid(
                "database.freshness_window_hours must be greater than zero".into(),
            ));
        }

        let mut names: HashSet<&str> = RESERVED_CHECK_NAMES.iter().copied().collect();
        for page in &self.pages {
            self.page_url(page)?;
            if !names.insert(page.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate or reserved check name: {}",
                    page.name
                )));
            }
        }
        for function in &self.functions {
            self.function_url(function)?;
            if !names.insert(function.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate or reserved check name: {}",
                    function.name
                )));
            }
        }
        for operation in &self.remediation.stale_data.operations {
            self.function_url(operation)?;
        }

        Ok(())
    }

    /// Absolute URL of a page target
    pub fn page_url(&self, page: &PageTarget) -> Result<String, ConfigError> {
        if page.path.starts_with("http://") || page.path.starts_with("https://") {
            parse_url(&format!("pages.{}", page.name), &page.path)?;
            return Ok(page.path.clone());
        }
        let url = join_url(&self.site_url, &page.path);
        parse_url(&format!("pages.{}", page.name), &url)?;
        Ok(url)
    }

    /// Absolute URL of a function or refresh operation
    pub fn function_url(&self, function: &FunctionTarget) -> Result<String, ConfigError> {
        let url = match (&function.url, &self.functions_base_url) {
            (Some(url), _) => url.clone(),
            (None, Some(base)) => join_url(base, &function.name),
            (None, None) => {
                return Err(ConfigError::Invalid(format!(
                    "function {} has no url and functions_base_url is not set",
                    function.name
                )))
            }
        };
        parse_url(&format!("functions.{}", function.name), &url)?;
        Ok(url)
    }

    /// Origin the liveness preflight must see echoed back
    pub fn expected_origin(&self) -> String {
        if let Some(origin) = &self.expected_origin {
            return origin.trim_end_matches('/').to_string();
        }
        match reqwest::Url::parse(&self.site_url) {
            Ok(url) => url.origin().ascii_serialization(),
            Err(_) => self.site_url.trim_end_matches('/').to_string(),
        }
    }

    /// Stable hash of the probed target set, recorded with every audit write
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.site_url.as_bytes());
        for page in &self.pages {
            hasher.update(page.name.as_bytes());
            hasher.update(page.path.as_bytes());
        }
        for function in &self.functions {
            hasher.update(function.name.as_bytes());
            hasher.update(function.url.as_deref().unwrap_or_default().as_bytes());
        }
        hasher.update(self.database.url.as_bytes());
        hasher.update(self.database.table.as_bytes());
        hasher.update(self.database.freshness_table().as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn parse_url(field: &str, value: &str) -> Result<reqwest::Url, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{} must not be empty", field)));
    }
    reqwest::Url::parse(value).map_err(|e| {
        ConfigError::Invalid(format!("{} is not a valid URL ({}): {}", field, value, e))
    })
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
site_url: https://compliance.example.com
pages:
  - { name: home, path: / }
  - { name: regulations, path: /regulations }
functions_base_url: https://project.example.co/functions/v1
functions:
  - { name: fetch-bills }
  - { name: notify, url: "https://hooks.example.com/notify" }
database:
  url: https://project.example.co
  table: regulations
remediation:
  stale_data:
    operations: [{ name: fetch-bills }]
"#;

    fn sample() -> SentinelConfig {
        serde_yaml::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = sample();
        assert_eq!(config.execution.probe_timeout_ms, 10_000);
        assert_eq!(config.database.freshness_column, "created_at");
        assert_eq!(config.database.freshness_window_hours, 24);
        assert_eq!(config.database.freshness_table(), "regulations");
        assert_eq!(config.remediation.stale_data.delay_ms, 2_000);
        assert_eq!(config.remediation.database_unreachable.backoff_ms, 2_000);
        assert_eq!(config.remediation.function_unhealthy.backoff_ms, 0);
        assert!(config.audit.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_backoff_without_remediation_section() {
        let config: SentinelConfig = serde_yaml::from_str(
            r#"
site_url: https://compliance.example.com
database: { url: "https://project.example.co", table: regulations }
"#,
        )
        .unwrap();
        assert_eq!(config.remediation.database_unreachable.backoff_ms, 2_000);
        assert_eq!(config.remediation.function_unhealthy.backoff_ms, 0);
        assert_eq!(config.audit.timeout_ms, 10_000);

        let policy = RemediationPolicy::default();
        assert_eq!(policy.database_unreachable.backoff(), Duration::from_secs(2));
    }

    #[test]
    fn test_url_resolution() {
        let config = sample();
        assert_eq!(
            config.page_url(&config.pages[1]).unwrap(),
            "https://compliance.example.com/regulations"
        );
        assert_eq!(
            config.function_url(&config.functions[0]).unwrap(),
            "https://project.example.co/functions/v1/fetch-bills"
        );
        assert_eq!(
            config.function_url(&config.functions[1]).unwrap(),
            "https://hooks.example.com/notify"
        );
        assert_eq!(config.expected_origin(), "https://compliance.example.com");
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let mut config = sample();
        config.functions.push(FunctionTarget {
            name: "home".into(),
            url: Some("https://x.example.com".into()),
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("check name: home"));
    }

    #[test]
    fn test_rejects_reserved_names() {
        let mut config = sample();
        config.pages.push(PageTarget {
            name: "data_freshness".into(),
            path: "/fresh".into(),
        });
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_function_without_url() {
        let mut config = sample();
        config.functions_base_url = None;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = sample();
        config.execution.probe_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = sample();
        let b = sample();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut c = sample();
        c.pages.pop();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_from_file_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentinel.toml");
        std::fs::write(
            &path,
            r#"
site_url = "https://compliance.example.com"

[[pages]]
name = "home"
path = "/"

[database]
url = "https://project.example.co"
table = "regulations"
api_key = "file-key"
"#,
        )
        .unwrap();

        let config = SentinelConfig::from_file(&path).unwrap();
        assert_eq!(config.pages.len(), 1);
        assert_eq!(config.database.api_key.as_deref(), Some("file-key"));
    }
}
