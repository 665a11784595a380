//! DataOps CLI - runs the pipeline stages against a shared warehouse.
//!
//! Configuration comes from the environment (see `dataops_core::config`).
//! Stage results are printed to stdout as JSON; logs go to stderr, filtered
//! by `RUST_LOG` when set and by `--debug` otherwise.
//!
//! Exit status: `0` success or gate admit, `1` gate reject, `2` any error.

mod commands;

use clap::{Parser, Subcommand};
use commands::Status;
use dataops_core::config::EnvVars;
use dataops_core::PipelineConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "dataops")]
#[command(about = "Quality checks, quality gate and model registry for the DataOps pipeline")]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Warehouse database path (overrides DATAOPS_WAREHOUSE)
    #[arg(long, global = true)]
    warehouse: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Record data-quality checks for the silver table
    Validate,
    /// Train the classifier and write artifacts
    Train,
    /// Evaluate the metrics artifact against the thresholds
    Gate,
    /// Register the trained model as a new version
    Register,
    /// Promote the newest registered version to production
    Promote,
    /// Show the production version
    Current,
    /// List every version of the model, newest first
    History,
    /// Run validate, train, gate, register and promote in order
    Run,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Set up logging; RUST_LOG takes precedence over --debug
    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => return report_error(&err),
    };
    debug!("Configuration: {:?}", config);

    match commands::execute(args.command, config) {
        Ok(Status::Success) => ExitCode::SUCCESS,
        Ok(Status::Rejected) => ExitCode::from(1),
        Err(err) => report_error(&err),
    }
}

fn load_config(args: &Args) -> anyhow::Result<PipelineConfig> {
    let warehouse = args
        .warehouse
        .as_ref()
        .map(|path| path.display().to_string());
    let config = PipelineConfig::from_lookup(|key| {
        if key == EnvVars::WAREHOUSE && warehouse.is_some() {
            return warehouse.clone();
        }
        std::env::var(key).ok()
    })?;
    Ok(config)
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    match commands::error_kind(err) {
        Some(kind) => eprintln!("error ({kind}): {err:#}"),
        None => eprintln!("error: {err:#}"),
    }
    ExitCode::from(2)
}
