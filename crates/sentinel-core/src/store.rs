//! Backing store access for the database probes
//!
//! The engine only needs three reads: a bounded sample, a filtered read over
//! a time column and an exact row count. [`RestDataStore`] serves them over a
//! PostgREST-style HTTP interface.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_RANGE};

use crate::error::ProbeError;

/// Narrow read interface the database probes depend on
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Read at most `limit` rows; returns how many came back
    async fn sample(&self, table: &str, limit: u32) -> Result<usize, ProbeError>;

    /// Count rows (up to `limit`) whose `column` is at or after `since`
    async fn rows_since(
        &self,
        table: &str,
        column: &str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<usize, ProbeError>;

    /// Exact total row count
    async fn exact_count(&self, table: &str) -> Result<u64, ProbeError>;
}

/// PostgREST client
#[derive(Clone)]
pub struct RestDataStore {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestDataStore {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            if let Ok(value) = HeaderValue::from_str(key) {
                headers.insert("apikey", value);
            }
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", key)) {
                headers.insert(reqwest::header::AUTHORIZATION, value);
            }
        }
        headers
    }

    async fn fetch_rows(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<usize, ProbeError> {
        let response = self
            .http
            .get(self.table_url(table))
            .headers(self.auth_headers())
            .query(query)
            .send()
            .await
            .map_err(|e| ProbeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProbeError::Logical(format!(
                "store returned status {}: {}",
                status.as_u16(),
                truncate(&body, 200)
            )));
        }

        let rows: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| ProbeError::Logical(format!("unreadable store response: {}", e)))?;
        Ok(rows.len())
    }
}

#[async_trait]
impl DataStore for RestDataStore {
    async fn sample(&self, table: &str, limit: u32) -> Result<usize, ProbeError> {
        self.fetch_rows(
            table,
            &[("select", "*".to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn rows_since(
        &self,
        table: &str,
        column: &str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<usize, ProbeError> {
        let filter = format!("gte.{}", since.to_rfc3339_opts(SecondsFormat::Millis, true));
        self.fetch_rows(
            table,
            &[
                ("select", column.to_string()),
                (column, filter),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn exact_count(&self, table: &str) -> Result<u64, ProbeError> {
        let response = self
            .http
            .head(self.table_url(table))
            .headers(self.auth_headers())
            .header("Prefer", "count=exact")
            .query(&[("select", "*")])
            .send()
            .await
            .map_err(|e| ProbeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Logical(format!(
                "store returned status {} for count",
                status.as_u16()
            )));
        }

        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ProbeError::Logical("count response had no Content-Range".into()))?;

        parse_content_range_total(range)
            .ok_or_else(|| ProbeError::Logical(format!("unparsable Content-Range: {}", range)))
    }
}

/// Total from a `Content-Range` value such as `0-24/3573` or `*/0`
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
