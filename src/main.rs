use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

mod cli;
mod commands;

use telemetry_gateway::config;
use telemetry_gateway::{init_tracing, BackendError, BackendRegistry, TelemetryClient};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: cli::Cli) -> Result<()> {
    let registry = BackendRegistry::with_defaults();

    // Listing kinds works without a configuration file
    if let cli::Commands::Backends = args.command {
        return commands::backends::execute(&registry);
    }

    let cfg = config::load_config(&args.config)?;
    init_tracing(&cfg.logging.level, &cfg.logging.format);

    let backend = registry.create(&cfg.backend.kind, &cfg.backend_settings())?;
    let client = TelemetryClient::new(
        backend,
        cfg.metrics_retry_policy(),
        cfg.logs_retry_policy(),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling in-flight query");
            trigger.cancel();
        }
    });

    match args.command {
        cli::Commands::Query(query_args) => {
            commands::query::execute(&client, query_args, &cancel).await
        }
        cli::Commands::Logs(logs_args) => {
            commands::logs::execute(&client, logs_args, &cancel).await
        }
        cli::Commands::Check => commands::check::execute(&client, &cancel).await,
        cli::Commands::Backends => commands::backends::execute(&registry),
    }
}

/// Backend errors are reported with their stable type name
fn report_error(error: &anyhow::Error) {
    match error.downcast_ref::<BackendError>() {
        Some(backend_error) => eprintln!("error [{}]: {}", backend_error.type_name(), backend_error),
        None => eprintln!("error: {:#}", error),
    }
}
