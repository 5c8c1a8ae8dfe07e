//! Error taxonomy for the sentinel engine
//!
//! None of these errors cross the invocation boundary: probe errors are
//! folded into `fail` results, remediation errors into `failed`/`skipped`
//! records and persistence errors are logged and dropped.

use thiserror::Error;

/// Errors raised while executing a single probe
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The probe did not finish within its timeout
    #[error("Probe timed out after {0}ms")]
    Timeout(u64),

    /// Connection, DNS or protocol failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Target answered but the answer was not acceptable
    #[error("Logical failure: {0}")]
    Logical(String),
}

impl ProbeError {
    /// Stable identifier recorded as `details.errorKind`
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Timeout(_) => "probe_timeout",
            ProbeError::Transport(_) => "probe_transport_error",
            ProbeError::Logical(_) => "probe_logical_failure",
        }
    }

    /// Map a reqwest failure, distinguishing client-side timeouts
    pub fn from_reqwest(err: &reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            ProbeError::Timeout(timeout_ms)
        } else {
            ProbeError::Transport(err.to_string())
        }
    }
}

/// Errors raised while dispatching a remediation action
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemediationError {
    /// The action cannot run because configuration is missing
    #[error("Prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    /// The trigger call could not be delivered
    #[error("Transport error: {0}")]
    Transport(String),

    /// The trigger call did not complete in time
    #[error("Remediation timed out after {0}ms")]
    Timeout(u64),
}

impl RemediationError {
    pub fn kind(&self) -> &'static str {
        match self {
            RemediationError::PrerequisiteMissing(_) => "remediation_prerequisite_missing",
            RemediationError::Transport(_) => "remediation_transport_error",
            RemediationError::Timeout(_) => "remediation_timeout",
        }
    }
}

/// Audit write failure
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Audit store returned status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Audit queue unavailable: {0}")]
    QueueUnavailable(String),
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(format!("YAML error: {}", err))
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(format!("TOML error: {}", err))
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_error_kinds() {
        assert_eq!(ProbeError::Timeout(100).kind(), "probe_timeout");
        assert_eq!(
            ProbeError::Transport("dns".into()).kind(),
            "probe_transport_error"
        );
        assert_eq!(
            ProbeError::Logical("missing header".into()).kind(),
            "probe_logical_failure"
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ProbeError::Timeout(250).to_string(),
            "Probe timed out after 250ms"
        );
        let err = RemediationError::PrerequisiteMissing("no redeploy hook".into());
        assert_eq!(err.to_string(), "Prerequisite missing: no redeploy hook");
    }

    #[test]
    fn test_config_error_from_yaml() {
        let err: ConfigError = serde_yaml::from_str::<u32>("not: [a number")
            .unwrap_err()
            .into();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
