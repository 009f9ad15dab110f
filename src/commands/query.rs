use anyhow::{Context, Result};
use clap::Args;
use std::time::Duration;
use telemetry_gateway::models::{parse_lookback, TimeRange};
use telemetry_gateway::TelemetryClient;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    /// PromQL expression
    pub query: String,

    /// Evaluate over this lookback window (e.g. 30m, 1h, 7d) instead of now
    #[arg(long)]
    pub since: Option<String>,

    /// Range query resolution in seconds
    #[arg(long, default_value = "60")]
    pub step: f64,
}

/// Execute the query command
pub async fn execute(
    client: &TelemetryClient,
    args: QueryArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let response = match &args.since {
        Some(lookback) => {
            let step = Duration::try_from_secs_f64(args.step)
                .with_context(|| format!("Invalid step: {}", args.step))?;
            let range = TimeRange::last(parse_lookback(lookback)?)?;

            info!(
                query = %args.query,
                start = %range.start(),
                end = %range.end(),
                step_secs = args.step,
                "Running range query"
            );
            client
                .query_metrics_range(&args.query, range, step, cancel)
                .await?
        }
        None => {
            info!(query = %args.query, "Running instant query");
            client.query_metrics(&args.query, cancel).await?
        }
    };

    super::print_json(&response)
}
