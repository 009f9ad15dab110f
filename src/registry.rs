use crate::backends::{
    LogsBackend, LokiBackend, MetricsAndLogsBackend, MetricsOnlyBackend, ObservabilityBackend,
    PrometheusBackend,
};
use crate::error::BackendError;
use crate::logging::sanitize_url;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const METRICS_ONLY: &str = "metrics-only";
pub const METRICS_AND_LOGS: &str = "metrics-and-logs";

/// Connection settings for one remote service
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSettings {
    pub url: String,
    pub timeout: Duration,
}

impl EndpointSettings {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

/// Everything a backend constructor may need
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    pub metrics: EndpointSettings,
    /// `None` when no log source is configured
    pub logs: Option<EndpointSettings>,
}

pub type BackendConstructor =
    fn(&BackendSettings) -> Result<Arc<dyn ObservabilityBackend>, BackendError>;

/// A registered backend kind with its constructor.
pub struct RegisteredBackend {
    pub description: String,
    pub constructor: BackendConstructor,
}

/// Maps backend kind names to constructors.
///
/// Construction performs no network I/O; adapters connect on first query.
pub struct BackendRegistry {
    backends: BTreeMap<String, RegisteredBackend>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: BTreeMap::new(),
        }
    }

    /// Registry with the built-in kinds and their legacy aliases
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(METRICS_ONLY, "Prometheus metrics only", build_metrics_only);
        registry.register(
            METRICS_AND_LOGS,
            "Prometheus metrics with optional Loki logs",
            build_metrics_and_logs,
        );
        registry.register("prometheus", "Alias for metrics-only", build_metrics_only);
        registry.register(
            "prometheus-loki",
            "Alias for metrics-and-logs",
            build_metrics_and_logs,
        );
        registry
    }

    /// Register a backend kind, replacing any previous registration under the same name.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        description: impl Into<String>,
        constructor: BackendConstructor,
    ) {
        self.backends.insert(
            kind.into(),
            RegisteredBackend {
                description: description.into(),
                constructor,
            },
        );
    }

    pub fn get(&self, kind: &str) -> Option<&RegisteredBackend> {
        self.backends.get(kind)
    }

    pub fn has_backend(&self, kind: &str) -> bool {
        self.backends.contains_key(kind)
    }

    /// Registered kind names, sorted
    pub fn kinds(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }

    /// `(kind, description)` pairs, sorted by kind
    pub fn available_backends(&self) -> Vec<(&str, &str)> {
        self.backends
            .iter()
            .map(|(kind, registered)| (kind.as_str(), registered.description.as_str()))
            .collect()
    }

    /// Build the backend registered under `kind`.
    ///
    /// Unknown kinds yield a `ConfigurationError` listing the valid ones.
    pub fn create(
        &self,
        kind: &str,
        settings: &BackendSettings,
    ) -> Result<Arc<dyn ObservabilityBackend>, BackendError> {
        let registered = self.backends.get(kind.trim()).ok_or_else(|| {
            BackendError::configuration(format!(
                "Unsupported backend kind '{}'. Valid kinds: {}",
                kind,
                self.kinds().join(", ")
            ))
        })?;

        let backend = (registered.constructor)(settings)?;

        tracing::info!(
            kind = kind,
            metrics_url = %sanitize_url(&settings.metrics.url),
            logs_configured = backend.logs_backend().is_some(),
            "Observability backend created"
        );

        Ok(backend)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn build_metrics_only(
    settings: &BackendSettings,
) -> Result<Arc<dyn ObservabilityBackend>, BackendError> {
    if settings.logs.is_some() {
        tracing::debug!("Logs endpoint ignored for metrics-only backend");
    }

    let metrics = PrometheusBackend::new(&settings.metrics.url, settings.metrics.timeout)?;
    Ok(Arc::new(MetricsOnlyBackend::new(Arc::new(metrics))))
}

fn build_metrics_and_logs(
    settings: &BackendSettings,
) -> Result<Arc<dyn ObservabilityBackend>, BackendError> {
    let metrics = PrometheusBackend::new(&settings.metrics.url, settings.metrics.timeout)?;

    let logs = match &settings.logs {
        Some(endpoint) => {
            let loki: Arc<dyn LogsBackend> =
                Arc::new(LokiBackend::new(&endpoint.url, endpoint.timeout)?);
            Some(loki)
        }
        None => None,
    };

    Ok(Arc::new(MetricsAndLogsBackend::new(Arc::new(metrics), logs)))
}
