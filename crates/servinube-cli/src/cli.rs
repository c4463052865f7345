//! CLI argument definitions for the ServiNube control panel.

use clap::{Parser, Subcommand};

/// Command-line interface for the ServiNube control panel.
///
/// Configuration flags such as `--container-name` are consumed by the
/// configuration loader before these arguments are parsed and must precede
/// the subcommand.
#[derive(Parser, Debug)]
#[command(
    name = "servinube",
    version,
    about = "Starts and stops the local database, frontend and backend",
    disable_help_subcommand = true
)]
pub(crate) struct Cli {
    /// Action to perform.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Top-level actions.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Starts every service and stops them again on Ctrl-C.
    Up,
    /// Reads start/stop commands from standard input.
    Panel,
    /// Prints the configured services and container runtime reachability.
    Status,
}
