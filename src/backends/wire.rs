//! Request/response plumbing shared by the Prometheus and Loki adapters
//!
//! Both APIs wrap results in the same envelope:
//! `{"status": "success", "data": {"resultType": "...", "result": [...]}}`
//! and report failures as `{"status": "error", "errorType": "...", "error": "..."}`.

use crate::error::BackendError;
use crate::logging::sanitize_url;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Longest error body excerpt carried into an error message
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    status: String,
    #[serde(default)]
    data: Option<ApiData>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// The `data` member of a successful response
#[derive(Debug, Deserialize)]
pub(crate) struct ApiData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    #[serde(default)]
    pub result: serde_json::Value,
}

/// HTTP client for one adapter
///
/// Idle pooling is disabled: every connection is closed once its
/// request/response cycle completes, on success and on error alike.
pub(crate) fn build_client() -> Result<Client, BackendError> {
    Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .map_err(|e| BackendError::configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Validate a configured base URL and strip any trailing slash
pub(crate) fn normalize_base_url(base_url: &str) -> Result<String, BackendError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(BackendError::configuration("Base URL is required"));
    }

    let parsed = Url::parse(trimmed).map_err(|e| {
        BackendError::configuration(format!(
            "Invalid base URL '{}': {}",
            sanitize_url(trimmed),
            e
        ))
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(BackendError::configuration(format!(
            "Unsupported URL scheme '{}' in '{}'",
            parsed.scheme(),
            sanitize_url(trimmed)
        )));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Perform one GET and return the decoded `data` member
///
/// - Transport failures and 5xx responses: `ConnectionError`
/// - 4xx responses, undecodable bodies and `status != "success"`: `QueryError`
pub(crate) async fn get_data(
    client: &Client,
    url: &str,
    params: &[(&str, String)],
    timeout: Duration,
    query: &str,
) -> Result<ApiData, BackendError> {
    let response = client
        .get(url)
        .query(params)
        .timeout(timeout)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if status.is_server_error() {
        return Err(BackendError::connection(format!(
            "{} returned HTTP {}: {}",
            sanitize_url(url),
            status,
            excerpt(&body)
        )));
    }

    if !status.is_success() {
        let message = envelope_error(&body).unwrap_or_else(|| excerpt(&body));
        return Err(BackendError::query(
            format!("HTTP {}: {}", status, message),
            query,
        ));
    }

    decode_envelope(&body, query)
}

/// Decode a 2xx body into its `data` member
pub(crate) fn decode_envelope(body: &str, query: &str) -> Result<ApiData, BackendError> {
    let envelope: ApiEnvelope = serde_json::from_str(body).map_err(|e| {
        BackendError::query(format!("Malformed response body: {}", e), query)
    })?;

    if envelope.status != "success" {
        return Err(BackendError::query(
            format!(
                "Query failed with status '{}': {}: {}",
                envelope.status,
                envelope.error_type.as_deref().unwrap_or("unknown"),
                envelope.error.as_deref().unwrap_or("Unknown error")
            ),
            query,
        ));
    }

    envelope
        .data
        .ok_or_else(|| BackendError::query("Response is missing the data field", query))
}

/// Decode `result` into the shape expected for its result type
pub(crate) fn decode_result<T: serde::de::DeserializeOwned>(
    data: ApiData,
    query: &str,
) -> Result<T, BackendError> {
    let result_type = data.result_type;
    serde_json::from_value(data.result).map_err(|e| {
        BackendError::query(
            format!("Malformed '{}' result: {}", result_type, e),
            query,
        )
    })
}

pub(crate) fn unsupported_result_type(result_type: &str, query: &str) -> BackendError {
    BackendError::query(format!("Unsupported result type: {}", result_type), query)
}

fn envelope_error(body: &str) -> Option<String> {
    let envelope: ApiEnvelope = serde_json::from_str(body).ok()?;
    let error = envelope.error?;
    Some(match envelope.error_type {
        Some(error_type) => format!("{}: {}", error_type, error),
        None => error,
    })
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "empty response body".to_string();
    }
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

// ============================================================
// Time units
// ============================================================

/// Range step as float seconds, accepted by both query_range endpoints
pub(crate) fn format_step(step: Duration) -> String {
    if step.subsec_nanos() == 0 {
        step.as_secs().to_string()
    } else {
        step.as_secs_f64().to_string()
    }
}

/// Unix seconds as sent to Prometheus (`1700000000` or `1700000000.25`)
pub(crate) fn to_unix_seconds(ts: DateTime<Utc>) -> String {
    let nanos = ts.timestamp_subsec_nanos();
    if nanos == 0 {
        ts.timestamp().to_string()
    } else {
        let fractional = format!("{:09}", nanos);
        format!("{}.{}", ts.timestamp(), fractional.trim_end_matches('0'))
    }
}

/// Unix nanoseconds as sent to Loki (`1700000000000000000`)
pub(crate) fn to_unix_nanos(ts: DateTime<Utc>) -> Result<String, BackendError> {
    ts.timestamp_nanos_opt()
        .map(|n| n.to_string())
        .ok_or_else(|| {
            BackendError::configuration(format!(
                "Timestamp {} cannot be expressed in nanoseconds",
                ts
            ))
        })
}

/// Prometheus sample timestamps: float unix seconds
pub(crate) fn from_unix_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let mut seconds = whole as i64;
    let mut nanos = ((secs - whole) * 1e9).round() as i64;
    if nanos >= NANOS_PER_SEC {
        seconds += 1;
        nanos -= NANOS_PER_SEC;
    }
    DateTime::from_timestamp(seconds, nanos as u32)
}

/// Loki entry timestamps: unix nanoseconds as a decimal string
pub(crate) fn from_unix_nanos(value: &str) -> Option<DateTime<Utc>> {
    let nanos: i64 = value.trim().parse().ok()?;
    DateTime::from_timestamp(
        nanos.div_euclid(NANOS_PER_SEC),
        nanos.rem_euclid(NANOS_PER_SEC) as u32,
    )
}
