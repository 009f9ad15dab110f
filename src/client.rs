use crate::backends::ObservabilityBackend;
use crate::error::BackendError;
use crate::models::{LogsResponse, MetricsResponse, TimeRange};
use crate::retry::{with_retry, RetryPolicy};
use crate::translate::{QueryContext, QueryLanguage, QueryTranslator};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Query used to check the metrics backend
const READINESS_QUERY: &str = "up";

/// Result of [`TelemetryClient::check_readiness`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub backend_kind: String,
    /// Series returned by the readiness query
    pub metrics_series: usize,
    pub logs_configured: bool,
}

/// A natural-language question, the query it became, and the answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslatedQuery<R> {
    pub text: String,
    pub query: String,
    pub response: R,
}

/// Entry point for callers: dispatches queries to the configured backend and
/// wraps every call in the retry executor.
///
/// Holds no mutable state; concurrent calls are independent.
pub struct TelemetryClient {
    backend: Arc<dyn ObservabilityBackend>,
    metrics_policy: RetryPolicy,
    logs_policy: RetryPolicy,
}

impl TelemetryClient {
    pub fn new(
        backend: Arc<dyn ObservabilityBackend>,
        metrics_policy: RetryPolicy,
        logs_policy: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            metrics_policy,
            logs_policy,
        }
    }

    pub fn backend(&self) -> &Arc<dyn ObservabilityBackend> {
        &self.backend
    }

    pub async fn query_metrics(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<MetricsResponse, BackendError> {
        let backend = self.backend.metrics_backend();
        let metrics = backend.as_ref();
        with_retry("metrics.query", &self.metrics_policy, cancel, move || {
            metrics.query(query)
        })
        .await
    }

    pub async fn query_metrics_range(
        &self,
        query: &str,
        range: TimeRange,
        step: Duration,
        cancel: &CancellationToken,
    ) -> Result<MetricsResponse, BackendError> {
        let backend = self.backend.metrics_backend();
        let metrics = backend.as_ref();
        with_retry("metrics.query_range", &self.metrics_policy, cancel, move || {
            metrics.query_range(query, range.start(), range.end(), step)
        })
        .await
    }

    /// Fails with `ConfigurationError` before any attempt when no logs backend is configured
    pub async fn query_logs(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<LogsResponse, BackendError> {
        let backend = self.backend.require_logs_backend()?;
        let logs = backend.as_ref();
        with_retry("logs.query", &self.logs_policy, cancel, move || logs.query(query)).await
    }

    pub async fn query_logs_range(
        &self,
        query: &str,
        range: TimeRange,
        cancel: &CancellationToken,
    ) -> Result<LogsResponse, BackendError> {
        let backend = self.backend.require_logs_backend()?;
        let logs = backend.as_ref();
        with_retry("logs.query_range", &self.logs_policy, cancel, move || {
            logs.query_range(query, range.start(), range.end())
        })
        .await
    }

    /// Metric LogQL query (`rate`, `count_over_time`, ...) evaluated by the logs backend
    pub async fn query_log_metrics(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<MetricsResponse, BackendError> {
        let backend = self.backend.require_logs_backend()?;
        let logs = backend.as_ref();
        with_retry("logs.query_metrics", &self.logs_policy, cancel, move || {
            logs.query_metrics(query)
        })
        .await
    }

    pub async fn query_log_metrics_range(
        &self,
        query: &str,
        range: TimeRange,
        step: Duration,
        cancel: &CancellationToken,
    ) -> Result<MetricsResponse, BackendError> {
        let backend = self.backend.require_logs_backend()?;
        let logs = backend.as_ref();
        with_retry("logs.query_metrics_range", &self.logs_policy, cancel, move || {
            logs.query_metrics_range(query, range.start(), range.end(), step)
        })
        .await
    }

    /// Check the metrics backend with `up`
    pub async fn check_readiness(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Readiness, BackendError> {
        let response = self.query_metrics(READINESS_QUERY, cancel).await?;
        Ok(Readiness {
            backend_kind: self.backend.kind().to_string(),
            metrics_series: response.len(),
            logs_configured: self.backend.logs_backend().is_some(),
        })
    }

    /// Translate `text` to PromQL and run it, as a range query when `range` is given
    pub async fn ask_metrics(
        &self,
        translator: &dyn QueryTranslator,
        text: &str,
        context: QueryContext,
        range: Option<(TimeRange, Duration)>,
        cancel: &CancellationToken,
    ) -> Result<TranslatedQuery<MetricsResponse>, BackendError> {
        let context = QueryContext {
            language: QueryLanguage::PromQl,
            ..context
        };
        let query = translate(translator, text, &context, cancel).await?;

        let response = match range {
            Some((range, step)) => self.query_metrics_range(&query, range, step, cancel).await?,
            None => self.query_metrics(&query, cancel).await?,
        };

        Ok(TranslatedQuery {
            text: text.to_string(),
            query,
            response,
        })
    }

    /// Translate `text` to LogQL and run it, as a range query when `range` is given
    pub async fn ask_logs(
        &self,
        translator: &dyn QueryTranslator,
        text: &str,
        context: QueryContext,
        range: Option<TimeRange>,
        cancel: &CancellationToken,
    ) -> Result<TranslatedQuery<LogsResponse>, BackendError> {
        // Check before spending a translation on an unusable backend
        self.backend.require_logs_backend()?;

        let context = QueryContext {
            language: QueryLanguage::LogQl,
            ..context
        };
        let query = translate(translator, text, &context, cancel).await?;

        let response = match range {
            Some(range) => self.query_logs_range(&query, range, cancel).await?,
            None => self.query_logs(&query, cancel).await?,
        };

        Ok(TranslatedQuery {
            text: text.to_string(),
            query,
            response,
        })
    }
}

async fn translate(
    translator: &dyn QueryTranslator,
    text: &str,
    context: &QueryContext,
    cancel: &CancellationToken,
) -> Result<String, BackendError> {
    let translated = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(BackendError::cancelled("translate")),
        result = translator.translate(text, context) => result,
    };

    let query = translated.map_err(|e| {
        BackendError::query(format!("Translation to {} failed: {:#}", context.language, e), text)
    })?;

    tracing::debug!(language = %context.language, query = %query, "Translated query");
    Ok(query)
}
