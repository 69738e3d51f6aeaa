//! Binary entry point for the rulesync CLI.

use std::fs;
use std::io::{self, Write};
use std::process;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use rulesync::{
    ApiConfig, ApiError, DesiredConfigError, DesiredRulesConfigs, HttpManagementClient, Progress,
    Reconciler,
};

mod cli;

use cli::{Cli, PushCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("failed to read {path}: {message}")]
    Read { path: Utf8PathBuf, message: String },
    #[error(transparent)]
    Desired(#[from] DesiredConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli {
        Cli::Push(command) => push(command).await,
    }
}

async fn push(args: PushCommand) -> Result<(), CliError> {
    let PushCommand { file, concurrency } = args;

    let mut config =
        ApiConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    if let Some(limit) = concurrency {
        config.concurrent_calls = limit;
    }

    let raw = fs::read_to_string(&file).map_err(|err| CliError::Read {
        path: file,
        message: err.to_string(),
    })?;
    let desired = DesiredRulesConfigs::from_json_str(&raw)?;

    let client = HttpManagementClient::new(&config)?;
    let reconciler = Reconciler::new(client).with_concurrency(config.concurrent_calls);
    let progress = Progress::new();

    reconciler.run(&progress, &desired).await?;

    tracing::info!(
        deleted = progress.deleted(),
        upserted = progress.upserted(),
        "rules configs reconciled"
    );
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
