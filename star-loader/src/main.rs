//! Star-schema loader binary.
//!
//! Parses the command, loads the configuration, initializes tracing and runs the requested
//! builds on an explicitly built Tokio runtime. The exit status is 0 on success, 1 when a build
//! or probe fails and 2 when the configuration is missing or invalid.

use clap::Parser;
use star_config::shared::LoaderConfig;
use star_telemetry::tracing::init_tracing;
use std::process::ExitCode;
use tracing::error;

use crate::cli::{Cli, Command};
use crate::config::load_loader_config;
use crate::core::run_command;
use crate::error::{LoaderError, LoaderResult};

mod cli;
mod config;
mod core;
mod error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_loader_config() {
        Ok(config) => config,
        Err(err) => return report_failure(&err),
    };

    let _log_flusher = match init_tracing(env!("CARGO_BIN_NAME")) {
        Ok(log_flusher) => log_flusher,
        Err(err) => return report_failure(&LoaderError::config(err)),
    };

    match start(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "star-loader failed");
            report_failure(&err)
        }
    }
}

fn start(command: Command, config: LoaderConfig) -> LoaderResult<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run_command(command, config))
}

fn report_failure(err: &LoaderError) -> ExitCode {
    eprint!("{}", err.render_report());
    ExitCode::from(err.exit_code())
}
