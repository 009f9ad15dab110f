use super::wire::{self, ApiData};
use super::MetricsBackend;
use crate::error::BackendError;
use crate::logging::sanitize_url;
use crate::models::{MetricResult, MetricSample, MetricSeries, MetricsResponse, ResultKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// `[<unix seconds>, "<value>"]`; the value may be null
#[derive(Debug, Deserialize)]
struct RawSample(f64, Option<String>);

#[derive(Debug, Deserialize)]
struct VectorSeries {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    #[serde(default)]
    value: Option<RawSample>,
}

#[derive(Debug, Deserialize)]
struct MatrixSeries {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    #[serde(default)]
    values: Vec<RawSample>,
}

/// Prometheus HTTP API adapter
///
/// Holds only its base URL, request timeout and a client handle; nothing is
/// sent until the first query, and no connection outlives its request.
pub struct PrometheusBackend {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl PrometheusBackend {
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

    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        query: &str,
    ) -> Result<MetricsResponse, BackendError> {
        let url = format!("{}{}", self.base_url, endpoint);

        tracing::debug!(
            backend = "prometheus",
            url = %sanitize_url(&url),
            query = query,
            "Sending metrics query"
        );

        let data = wire::get_data(&self.client, &url, params, self.timeout, query).await?;
        let response = parse_response(data, query)?;

        tracing::debug!(
            backend = "prometheus",
            result_kind = %response.result_kind(),
            series = response.len(),
            samples = response.sample_count(),
            "Metrics query completed"
        );

        Ok(response)
    }
}

#[async_trait]
impl MetricsBackend for PrometheusBackend {
    fn backend_type(&self) -> &str {
        "prometheus"
    }

    async fn query(&self, query: &str) -> Result<MetricsResponse, BackendError> {
        let params = [("query", query.to_string())];
        self.fetch("/api/v1/query", &params, query).await
    }

    async fn query_range(
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
            ("start", wire::to_unix_seconds(start)),
            ("end", wire::to_unix_seconds(end)),
            ("step", wire::format_step(step)),
        ];
        self.fetch("/api/v1/query_range", &params, query).await
    }
}

/// Convert a `data` member into the canonical model
///
/// Also used for metric LogQL results, which share the same shapes.
///
/// - `vector`: instant, one sample per series
/// - `scalar`: instant, a single unnamed series
/// - `matrix`: range, one sample per backend timestamp
///
/// Null values are dropped; a series left without samples is omitted.
pub(super) fn parse_response(
    data: ApiData,
    query: &str,
) -> Result<MetricsResponse, BackendError> {
    match data.result_type.as_str() {
        "vector" => {
            let raw: Vec<VectorSeries> = wire::decode_result(data, query)?;
            let mut results = Vec::with_capacity(raw.len());
            for series in raw {
                let Some(raw_sample) = series.value else {
                    continue;
                };
                if let Some(sample) = convert_sample(raw_sample, query)? {
                    results.push(MetricResult::instant(
                        MetricSeries::from_label_set(series.metric),
                        sample,
                    ));
                }
            }
            Ok(MetricsResponse::new(ResultKind::Instant, results))
        }
        "scalar" => {
            let raw: Option<RawSample> = wire::decode_result(data, query)?;
            let mut results = Vec::new();
            if let Some(sample) = raw.map(|r| convert_sample(r, query)).transpose()?.flatten() {
                results.push(MetricResult::instant(
                    MetricSeries::new("", BTreeMap::new()),
                    sample,
                ));
            }
            Ok(MetricsResponse::new(ResultKind::Instant, results))
        }
        "matrix" => {
            let raw: Vec<MatrixSeries> = wire::decode_result(data, query)?;
            let mut results = Vec::with_capacity(raw.len());
            for series in raw {
                let mut samples = Vec::with_capacity(series.values.len());
                for raw_sample in series.values {
                    if let Some(sample) = convert_sample(raw_sample, query)? {
                        samples.push(sample);
                    }
                }
                if let Some(result) =
                    MetricResult::range(MetricSeries::from_label_set(series.metric), samples)
                {
                    results.push(result);
                }
            }
            Ok(MetricsResponse::new(ResultKind::Range, results))
        }
        other => Err(wire::unsupported_result_type(other, query)),
    }
}

fn convert_sample(raw: RawSample, query: &str) -> Result<Option<MetricSample>, BackendError> {
    let RawSample(secs, value) = raw;
    let Some(value) = value else {
        return Ok(None);
    };

    let timestamp = wire::from_unix_seconds(secs).ok_or_else(|| {
        BackendError::query(format!("Invalid sample timestamp: {}", secs), query)
    })?;
    // Prometheus renders special values as "NaN", "+Inf" and "-Inf"
    let value: f64 = value.trim().parse().map_err(|_| {
        BackendError::query(format!("Invalid sample value: {:?}", value), query)
    })?;

    Ok(Some(MetricSample::new(timestamp, value)))
}
