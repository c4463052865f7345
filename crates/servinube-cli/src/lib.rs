//! Command-line control surface for the ServiNube local stack.
//!
//! The runtime owns argument parsing, configuration bootstrapping and
//! telemetry, then hands over to one of three commands: `up` runs every
//! service until a termination signal, `panel` reads start/stop requests
//! from standard input, and `status` reports on the configured stack.
//! Standard input and output are injected so tests can drive the panel.

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use servinube_orchestrator::SystemCommandRunner;

mod cli;
mod config;
mod errors;
mod output;
mod panel;
mod shutdown;
mod status;
pub mod telemetry;
mod up;

use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, command_arguments, split_config_arguments};
use errors::AppError;
use output::SharedWriter;
use shutdown::SystemShutdownSignal;

/// Runs the CLI with the provided arguments and IO handles.
///
/// Service activity and command responses go to `stdout`; usage and
/// configuration errors go to `stderr`. Structured logs always go to the
/// process's standard error. `stdin` is read on a background thread by
/// `panel`.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: R, stdout: W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
    E: Write,
{
    let output = SharedWriter::new(stdout);
    match run_with_loader(args, stdin, &output, &OrthoConfigLoader) {
        Ok(exit_code) => exit_code,
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            output.text(&error.to_string());
            ExitCode::SUCCESS
        }
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn run_with_loader<I, R, W, L>(
    args: I,
    stdin: R,
    output: &SharedWriter<W>,
    loader: &L,
) -> Result<ExitCode, AppError>
where
    I: IntoIterator<Item = OsString>,
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let cli = Cli::try_parse_from(command_arguments(&args, &split)).map_err(AppError::CliUsage)?;
    let config = loader.load(&split.config_arguments)?;
    telemetry::initialise(&config)?;

    match cli.command {
        CliCommand::Up => up::run(&config, output, SystemShutdownSignal::install()?),
        CliCommand::Panel => {
            panel::run(&config, stdin, output, SystemShutdownSignal::install()?)
        }
        CliCommand::Status => Ok(status::run(&config, output, &SystemCommandRunner)),
    }
}
