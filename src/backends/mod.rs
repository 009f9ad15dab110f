pub mod loki;
pub mod prometheus;
mod wire;

use crate::error::BackendError;
use crate::models::{LogsResponse, MetricsResponse};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

pub use loki::LokiBackend;
pub use prometheus::PrometheusBackend;

/// A store that answers metric queries.
///
/// Implementations own their base URL and perform exactly one request per
/// call. They never retry; wrap calls in [`crate::retry::with_retry`].
#[async_trait]
pub trait MetricsBackend: Send + Sync + 'static {
    /// Backend type name (e.g. "prometheus")
    fn backend_type(&self) -> &str;

    /// Evaluate `query` at the current instant.
    async fn query(&self, query: &str) -> Result<MetricsResponse, BackendError>;

    /// Evaluate `query` over `[start, end]` every `step`.
    async fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<MetricsResponse, BackendError>;
}

/// A store that answers log queries.
#[async_trait]
pub trait LogsBackend: Send + Sync + 'static {
    /// Backend type name (e.g. "loki")
    fn backend_type(&self) -> &str;

    async fn query(&self, query: &str) -> Result<LogsResponse, BackendError>;

    async fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<LogsResponse, BackendError>;

    /// Evaluate a metric query over logs (`rate`, `count_over_time`, ...) at
    /// the current instant.
    async fn query_metrics(&self, query: &str) -> Result<MetricsResponse, BackendError>;

    /// Evaluate a metric query over logs across `[start, end]` every `step`.
    async fn query_metrics_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<MetricsResponse, BackendError>;
}

/// Umbrella capability: a metrics backend, plus a logs backend when one is configured.
pub trait ObservabilityBackend: Send + Sync + 'static {
    /// Registry kind this backend was built as
    fn kind(&self) -> &str;

    fn metrics_backend(&self) -> Arc<dyn MetricsBackend>;

    /// `None` when no log source is configured; this is not an error.
    fn logs_backend(&self) -> Option<Arc<dyn LogsBackend>>;

    /// The logs backend, or a `ConfigurationError` for callers that need one.
    fn require_logs_backend(&self) -> Result<Arc<dyn LogsBackend>, BackendError> {
        self.logs_backend().ok_or_else(|| {
            BackendError::configuration(format!(
                "No logs backend configured for backend kind '{}'",
                self.kind()
            ))
        })
    }
}

// ============================================================
// Backend variants
// ============================================================

/// Metrics only; log operations are unavailable.
pub struct MetricsOnlyBackend {
    metrics: Arc<dyn MetricsBackend>,
}

impl MetricsOnlyBackend {
    pub fn new(metrics: Arc<dyn MetricsBackend>) -> Self {
        Self { metrics }
    }
}

impl ObservabilityBackend for MetricsOnlyBackend {
    fn kind(&self) -> &str {
        "metrics-only"
    }

    fn metrics_backend(&self) -> Arc<dyn MetricsBackend> {
        self.metrics.clone()
    }

    fn logs_backend(&self) -> Option<Arc<dyn LogsBackend>> {
        None
    }
}

/// Metrics and (optionally) logs.
///
/// Built without a logs backend it behaves like [`MetricsOnlyBackend`] for log
/// operations.
pub struct MetricsAndLogsBackend {
    metrics: Arc<dyn MetricsBackend>,
    logs: Option<Arc<dyn LogsBackend>>,
}

impl MetricsAndLogsBackend {
    pub fn new(metrics: Arc<dyn MetricsBackend>, logs: Option<Arc<dyn LogsBackend>>) -> Self {
        Self { metrics, logs }
    }
}

impl ObservabilityBackend for MetricsAndLogsBackend {
    fn kind(&self) -> &str {
        "metrics-and-logs"
    }

    fn metrics_backend(&self) -> Arc<dyn MetricsBackend> {
        self.metrics.clone()
    }

    fn logs_backend(&self) -> Option<Arc<dyn LogsBackend>> {
        self.logs.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn prometheus() -> Arc<dyn MetricsBackend> {
        Arc::new(
            PrometheusBackend::new("http://localhost:9090", Duration::from_secs(5)).unwrap(),
        )
    }

    #[test]
    fn test_metrics_only_has_no_logs() {
        let backend = MetricsOnlyBackend::new(prometheus());
        assert_eq!(backend.kind(), "metrics-only");
        assert_eq!(backend.metrics_backend().backend_type(), "prometheus");
        assert!(backend.logs_backend().is_none());

        let err = backend.require_logs_backend().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("metrics-only"));
    }

    #[test]
    fn test_metrics_and_logs_exposes_logs() {
        let loki: Arc<dyn LogsBackend> =
            Arc::new(LokiBackend::new("http://localhost:3100", Duration::from_secs(5)).unwrap());
        let backend = MetricsAndLogsBackend::new(prometheus(), Some(loki));

        assert_eq!(backend.kind(), "metrics-and-logs");
        let logs = backend.require_logs_backend().unwrap();
        assert_eq!(logs.backend_type(), "loki");
    }

    #[test]
    fn test_metrics_and_logs_without_logs_url() {
        let backend = MetricsAndLogsBackend::new(prometheus(), None);
        assert!(backend.logs_backend().is_none());
        assert_eq!(
            backend.require_logs_backend().err().unwrap().kind(),
            ErrorKind::Configuration
        );
    }
}
