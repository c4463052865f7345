//! Binary entrypoint for the ServiNube control panel.
//!
//! Delegates to [`servinube_cli::run`], which loads configuration, parses
//! the command and drives the orchestrator.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Stdin is read from a worker thread and stderr is written by tracing
    // from several threads, so neither is locked here.
    let stdin = io::BufReader::new(io::stdin());
    servinube_cli::run(std::env::args_os(), stdin, io::stdout(), &mut io::stderr())
}
