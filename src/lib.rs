pub mod backends;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod registry;
pub mod retry;
pub mod translate;

pub use backends::{LogsBackend, MetricsBackend, ObservabilityBackend};
pub use client::{Readiness, TelemetryClient, TranslatedQuery};
pub use error::{BackendError, ErrorKind};
pub use registry::{BackendRegistry, BackendSettings, EndpointSettings};
pub use retry::{with_retry, RetryPolicy};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging
///
/// `RUST_LOG` takes precedence over `level`. `format` is "json" or "text".
/// Logs go to stderr so command output on stdout stays machine-readable.
///
/// Note: This function can only be called once per process.
pub fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if format == "json" {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
