use crate::error::ErrorKind;
use crate::registry::{BackendSettings, EndpointSettings, METRICS_AND_LOGS};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "telemetry-gateway.toml";
pub const ENV_PREFIX: &str = "TELEMETRY_GATEWAY";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    pub metrics: EndpointConfig,
    #[serde(default)]
    pub logs: Option<EndpointConfig>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Registry kind, e.g. "metrics-only" or "metrics-and-logs"
    #[serde(default = "default_backend_kind")]
    pub kind: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
        }
    }
}

/// One remote service (Prometheus or Loki)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

/// Backoff bounds shared by both endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_seconds")]
    pub max_delay_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_seconds: default_max_delay_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_backend_kind() -> String {
    METRICS_AND_LOGS.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_seconds() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Input for [`crate::registry::BackendRegistry::create`]
    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            metrics: self.metrics.endpoint_settings(),
            logs: self.logs.as_ref().map(EndpointConfig::endpoint_settings),
        }
    }

    pub fn metrics_retry_policy(&self) -> RetryPolicy {
        self.metrics.retry_policy(&self.retry)
    }

    /// Policy for log queries; defaults apply when `[logs]` is absent
    pub fn logs_retry_policy(&self) -> RetryPolicy {
        match &self.logs {
            Some(logs) => logs.retry_policy(&self.retry),
            None => RetryPolicy {
                initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
                max_delay: Duration::from_secs(self.retry.max_delay_seconds),
                ..RetryPolicy::default()
            },
        }
    }
}

impl EndpointConfig {
    pub fn endpoint_settings(&self) -> EndpointSettings {
        EndpointSettings::new(self.url.trim(), Duration::from_secs(self.timeout_seconds))
    }

    /// Only connection failures are retried
    pub fn retry_policy(&self, retry: &RetryConfig) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(retry.initial_delay_ms),
            max_delay: Duration::from_secs(retry.max_delay_seconds),
            backoff_factor: self.backoff_factor,
            retryable_kinds: vec![ErrorKind::Connection],
        }
    }
}

/// Load configuration from `path` (optional) and `TELEMETRY_GATEWAY__*` environment variables
///
/// Environment variables override the file, e.g.
/// `TELEMETRY_GATEWAY__METRICS__URL=http://prometheus:9090`.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.backend.kind.trim().is_empty() {
        anyhow::bail!("Backend kind cannot be empty");
    }

    validate_endpoint("metrics", &cfg.metrics)?;
    if let Some(logs) = &cfg.logs {
        validate_endpoint("logs", logs)?;
    }

    if cfg.retry.initial_delay_ms == 0 {
        anyhow::bail!("Retry initial_delay_ms must be greater than zero");
    }
    if Duration::from_millis(cfg.retry.initial_delay_ms)
        > Duration::from_secs(cfg.retry.max_delay_seconds)
    {
        anyhow::bail!(
            "Retry initial delay ({}ms) exceeds max delay ({}s)",
            cfg.retry.initial_delay_ms,
            cfg.retry.max_delay_seconds
        );
    }

    match cfg.logging.format.as_str() {
        "text" | "json" => {}
        other => anyhow::bail!("Invalid logging format '{}': expected text or json", other),
    }

    Ok(())
}

fn validate_endpoint(section: &str, endpoint: &EndpointConfig) -> anyhow::Result<()> {
    if endpoint.url.trim().is_empty() {
        anyhow::bail!("[{}] url cannot be empty", section);
    }
    if endpoint.timeout_seconds == 0 {
        anyhow::bail!("[{}] timeout_seconds must be greater than zero", section);
    }
    if !endpoint.backoff_factor.is_finite() || endpoint.backoff_factor < 1.0 {
        anyhow::bail!(
            "[{}] backoff_factor must be at least 1.0, got {}",
            section,
            endpoint.backoff_factor
        );
    }
    Ok(())
}
