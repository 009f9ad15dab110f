use anyhow::Result;
use telemetry_gateway::TelemetryClient;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Execute the check command
///
/// Fails when the metrics backend cannot answer the readiness query.
pub async fn execute(client: &TelemetryClient, cancel: &CancellationToken) -> Result<()> {
    let readiness = client.check_readiness(cancel).await?;

    info!(
        backend = %readiness.backend_kind,
        series = readiness.metrics_series,
        logs_configured = readiness.logs_configured,
        "Backend is ready"
    );

    super::print_json(&readiness)
}
