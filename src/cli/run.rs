//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, installs logging, discovers configuration,
//! creates the tokio runtime, dispatches to a command handler and reports
//! every error itself. `main` only turns the returned code into an exit.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use super::args::{Cli, Commands};
use super::commands;
use crate::logging::{LogFormat, init_tracing};
use crate::{CodeloopError, Config, ExitCode};

/// Main CLI execution function.
///
/// Returns `Ok(())` for exit code 0 and `Err(code)` otherwise, after all
/// output (including error reports) has been written.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    if let Err(err) = init_tracing(cli.verbose, format) {
        eprintln!("✗ Failed to initialise logging: {err}");
    }

    let config = match Config::discover(&cli.config_args()) {
        Ok(config) => config,
        Err(err) => return Err(report(&CodeloopError::Config(err))),
    };
    for (key, (value, source)) in config.effective_config() {
        debug!(key = %key, value = %value, source = %source, "Effective configuration");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = rt.block_on(async {
        match &cli.command {
            Commands::Solve {
                problem,
                cases,
                templates,
                extras,
                ..
            } => {
                commands::execute_solve_command(
                    problem,
                    cases.as_deref(),
                    templates,
                    extras,
                    &config,
                )
                .await
            }
            Commands::Validate {
                template,
                candidate,
            } => commands::execute_validate_command(template, candidate, &config),
            Commands::Graph { json } => commands::execute_graph_command(*json, &config),
        }
    });

    match result {
        Ok(code) if code == ExitCode::SUCCESS => Ok(()),
        Ok(code) => Err(code),
        Err(error) => match into_codeloop_error(error) {
            Ok(err) => Err(report(&err)),
            Err(error) => {
                eprintln!("✗ Unexpected error: {error:#}");
                eprintln!("\n  Run with --verbose for more detailed output");
                Err(ExitCode::INTERNAL)
            }
        },
    }
}

fn report(err: &CodeloopError) -> ExitCode {
    eprintln!("{}", err.display_for_user());
    err.to_exit_code()
}

// Recover the library error behind an anyhow chain, whichever layer raised it.
fn into_codeloop_error(error: anyhow::Error) -> Result<CodeloopError, anyhow::Error> {
    let error = match error.downcast::<CodeloopError>() {
        Ok(err) => return Ok(err),
        Err(error) => error,
    };
    let error = match error.downcast::<crate::GraphError>() {
        Ok(err) => return Ok(err.into()),
        Err(error) => error,
    };
    let error = match error.downcast::<crate::LlmError>() {
        Ok(err) => return Ok(err.into()),
        Err(error) => error,
    };
    let error = match error.downcast::<crate::RunnerError>() {
        Ok(err) => return Ok(err.into()),
        Err(error) => error,
    };
    match error.downcast::<crate::ConfigError>() {
        Ok(err) => Ok(err.into()),
        Err(error) => Err(error),
    }
}
