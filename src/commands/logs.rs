//! Logs query command
//!
//! Runs a LogQL range query and prints the streams, or with `--merged` a
//! single time-ordered list of entries across all streams. With `--metric`
//! the query is a metric LogQL expression and series are printed instead.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use telemetry_gateway::models::{parse_lookback, LogEntry, TimeRange};
use telemetry_gateway::TelemetryClient;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, Args)]
pub struct LogsArgs {
    /// LogQL expression
    pub query: String,

    /// Lookback window (e.g. 15m, 1h, 2d)
    #[arg(long, default_value = "1h")]
    pub since: String,

    /// Print one time-ordered list instead of per-stream groups
    #[arg(long, conflicts_with = "metric")]
    pub merged: bool,

    /// Treat the query as metric LogQL (e.g. `rate({app="api"}[5m])`)
    #[arg(long)]
    pub metric: bool,

    /// Resolution in seconds for --metric queries
    #[arg(long, default_value = "60")]
    pub step: f64,
}

#[derive(Serialize)]
struct MergedEntry<'a> {
    labels: &'a BTreeMap<String, String>,
    #[serde(flatten)]
    entry: &'a LogEntry,
}

/// Execute the logs command
pub async fn execute(
    client: &TelemetryClient,
    args: LogsArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let range = TimeRange::last(parse_lookback(&args.since)?)?;

    if args.metric {
        let step = Duration::try_from_secs_f64(args.step)
            .with_context(|| format!("Invalid step: {}", args.step))?;
        info!(query = %args.query, since = %args.since, "Running log metrics query");

        let response = client
            .query_log_metrics_range(&args.query, range, step, cancel)
            .await?;
        return super::print_json(&response);
    }

    info!(query = %args.query, since = %args.since, "Running logs query");

    let response = client.query_logs_range(&args.query, range, cancel).await?;

    if args.merged {
        let entries: Vec<MergedEntry> = response
            .merged_entries()
            .into_iter()
            .map(|(labels, entry)| MergedEntry { labels, entry })
            .collect();
        super::print_json(&entries)
    } else {
        super::print_json(&response)
    }
}
