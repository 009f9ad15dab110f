use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::logs::LogsArgs;
use crate::commands::query::QueryArgs;

#[derive(Parser, Debug)]
#[command(
    name = "telemetry-gateway",
    version,
    about = "Query Prometheus metrics and Loki logs through one interface"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "telemetry-gateway.toml",
        env = "TELEMETRY_GATEWAY_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a PromQL query (a range query when --since is given)
    Query(QueryArgs),

    /// Run a LogQL query over a lookback window (metric LogQL with --metric)
    Logs(LogsArgs),

    /// List registered backend kinds
    Backends,

    /// Check that the configured backend is reachable
    Check,
}
