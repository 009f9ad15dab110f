use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Label carrying the metric name in Prometheus-style label sets
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Shape of a metrics result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    /// One sample per series
    Instant,
    /// One or more samples per series, strictly increasing in time
    Range,
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instant => write!(f, "instant"),
            Self::Range => write!(f, "range"),
        }
    }
}

/// A named, labeled series
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricSeries {
    name: String,
    labels: BTreeMap<String, String>,
}

impl MetricSeries {
    pub fn new(name: impl Into<String>, labels: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            labels,
        }
    }

    /// Split a raw label set into name and remaining labels
    ///
    /// Series without a `__name__` label (e.g. the output of `sum(...)`) get an
    /// empty name.
    pub fn from_label_set(mut labels: BTreeMap<String, String>) -> Self {
        let name = labels.remove(METRIC_NAME_LABEL).unwrap_or_default();
        Self { name, labels }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// A single `(timestamp, value)` observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl MetricSample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// One series paired with its samples
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    series: MetricSeries,
    samples: Vec<MetricSample>,
}

impl MetricResult {
    /// Result of an instant query: exactly one sample
    pub fn instant(series: MetricSeries, sample: MetricSample) -> Self {
        Self {
            series,
            samples: vec![sample],
        }
    }

    /// Result of a range query
    ///
    /// Samples are ordered by timestamp; when the backend repeats a timestamp
    /// the first occurrence wins so the sequence stays strictly increasing.
    /// Returns `None` for an empty sample list.
    pub fn range(series: MetricSeries, mut samples: Vec<MetricSample>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_by_key(|s| s.timestamp);
        samples.dedup_by_key(|s| s.timestamp);
        Some(Self { series, samples })
    }

    pub fn series(&self) -> &MetricSeries {
        &self.series
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.last()
    }
}

/// Normalized answer to a metrics query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsResponse {
    result_kind: ResultKind,
    results: Vec<MetricResult>,
}

impl MetricsResponse {
    pub fn new(result_kind: ResultKind, results: Vec<MetricResult>) -> Self {
        Self {
            result_kind,
            results,
        }
    }

    pub fn result_kind(&self) -> ResultKind {
        self.result_kind
    }

    /// Results in backend order
    pub fn results(&self) -> &[MetricResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Total number of samples across all series
    pub fn sample_count(&self) -> usize {
        self.results.iter().map(|r| r.samples.len()).sum()
    }
}
