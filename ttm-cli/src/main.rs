//! CLI entry point for the `ttm` topic-modelling pipeline.
//!
//! Parses command-line arguments with clap, runs one verb and maps failures
//! to exit codes: usage errors exit with 2, everything else with 1. A reader
//! closing the output pipe early is a normal end of output. Logging is
//! initialised first so every later step can emit diagnostics via `tracing`.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use tracing::{error, field};
use ttm_cli::{
    cli::{Cli, CliError, run_cli},
    logging::{self, LoggingError},
};

const USAGE_EXIT: u8 = 2;

/// Parse CLI arguments, execute the command and flush report output.
fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let mut report = BufWriter::new(io::stdout());
    run_cli(cli, &mut report).context("failed to execute command")?;
    report.flush().context("failed to flush output")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    let Err(err) = try_main() else {
        return ExitCode::SUCCESS;
    };
    if is_broken_pipe(&err) {
        return ExitCode::SUCCESS;
    }

    let cli_error = err.downcast_ref::<CliError>();
    let (code, detail_code) = match cli_error {
        Some(CliError::Core(core)) => (Some(core.code().as_str()), core.detail_code()),
        _ => (None, None),
    };
    error!(
        error = %err,
        code = code.map(field::display),
        detail_code = detail_code.map(field::display),
        "command execution failed"
    );
    if matches!(cli_error, Some(CliError::Usage { .. })) {
        ExitCode::from(USAGE_EXIT)
    } else {
        ExitCode::FAILURE
    }
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<CliError>() {
        Some(CliError::Core(core)) => core.is_broken_pipe(),
        Some(_) => false,
        None => err.chain().any(|cause| {
            cause
                .downcast_ref::<io::Error>()
                .is_some_and(|io_error| io_error.kind() == io::ErrorKind::BrokenPipe)
        }),
    }
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialized"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
