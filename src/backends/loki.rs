use super::wire::{self, ApiData};
use super::{prometheus, LogsBackend};
use crate::error::BackendError;
use crate::logging::sanitize_url;
use crate::models::{LogEntry, LogStream, LogsResponse, MetricsResponse};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

const QUERY_PATH: &str = "/loki/api/v1/query";
const QUERY_RANGE_PATH: &str = "/loki/api/v1/query_range";

#[derive(Debug, Deserialize)]
struct StreamResult {
    #[serde(default)]
    stream: BTreeMap<String, String>,
    /// `["<unix nanos>", "<line>"]`, optionally followed by structured metadata
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Loki HTTP API adapter
pub struct LokiBackend {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl LokiBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            client: wire::build_client()?,
            base_url: wire::normalize_base_url(base_url)?,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_data(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        query: &str,
    ) -> Result<ApiData, BackendError> {
        let url = format!("{}{}", self.base_url, endpoint);

        tracing::debug!(
            backend = "loki",
            url = %sanitize_url(&url),
            query = query,
            "Sending logs query"
        );

        wire::get_data(&self.client, &url, params, self.timeout, query).await
    }

    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        query: &str,
    ) -> Result<LogsResponse, BackendError> {
        let data = self.fetch_data(endpoint, params, query).await?;
        let response = parse_response(data, query)?;

        tracing::debug!(
            backend = "loki",
            streams = response.streams().len(),
            entries = response.entry_count(),
            "Logs query completed"
        );

        Ok(response)
    }

    async fn fetch_metrics(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        query: &str,
    ) -> Result<MetricsResponse, BackendError> {
        let data = self.fetch_data(endpoint, params, query).await?;
        if data.result_type == "streams" {
            return Err(BackendError::query(
                "Log stream selector returned streams; expected a metric query",
                query,
            ));
        }
        let response = prometheus::parse_response(data, query)?;

        tracing::debug!(
            backend = "loki",
            result_kind = %response.result_kind(),
            series = response.len(),
            samples = response.sample_count(),
            "Log metrics query completed"
        );

        Ok(response)
    }
}

#[async_trait]
impl LogsBackend for LokiBackend {
    fn backend_type(&self) -> &str {
        "loki"
    }

    async fn query(&self, query: &str) -> Result<LogsResponse, BackendError> {
        let params = [("query", query.to_string())];
        self.fetch(QUERY_PATH, &params, query).await
    }

    async fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<LogsResponse, BackendError> {
        // Loki expects nanoseconds, unlike Prometheus
        let params = [
            ("query", query.to_string()),
            ("start", wire::to_unix_nanos(start)?),
            ("end", wire::to_unix_nanos(end)?),
        ];
        self.fetch(QUERY_RANGE_PATH, &params, query).await
    }

    async fn query_metrics(&self, query: &str) -> Result<MetricsResponse, BackendError> {
        let params = [("query", query.to_string())];
        self.fetch_metrics(QUERY_PATH, &params, query).await
    }

    async fn query_metrics_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<MetricsResponse, BackendError> {
        if step.is_zero() {
            return Err(BackendError::query("Range query step must be positive", query));
        }

        let params = [
            ("query", query.to_string()),
            ("start", wire::to_unix_nanos(start)?),
            ("end", wire::to_unix_nanos(end)?),
            ("step", wire::format_step(step)),
        ];
        self.fetch_metrics(QUERY_RANGE_PATH, &params, query).await
    }
}

/// Convert a `data` member into the canonical model
///
/// Only `streams` results are log results; metric LogQL queries (`vector`,
/// `matrix`) belong to `query_metrics`. Entries with a null line are dropped.
fn parse_response(data: ApiData, query: &str) -> Result<LogsResponse, BackendError> {
    if data.result_type != "streams" {
        return Err(wire::unsupported_result_type(&data.result_type, query));
    }

    let raw: Vec<StreamResult> = wire::decode_result(data, query)?;
    let mut streams = Vec::with_capacity(raw.len());

    for result in raw {
        let mut entries = Vec::with_capacity(result.values.len());
        for value in &result.values {
            if let Some(entry) = convert_entry(value, query)? {
                entries.push(entry);
            }
        }
        streams.push(LogStream::new(result.stream, entries));
    }

    Ok(LogsResponse::new(streams))
}

fn convert_entry(
    value: &[serde_json::Value],
    query: &str,
) -> Result<Option<LogEntry>, BackendError> {
    let invalid = || BackendError::query(format!("Invalid log entry: {:?}", value), query);

    let raw_ts = value.first().and_then(|v| v.as_str()).ok_or_else(invalid)?;
    let timestamp = wire::from_unix_nanos(raw_ts).ok_or_else(invalid)?;

    match value.get(1) {
        Some(serde_json::Value::String(line)) => Ok(Some(LogEntry::new(timestamp, line.clone()))),
        Some(serde_json::Value::Null) | None => Ok(None),
        Some(_) => Err(invalid()),
    }
}
