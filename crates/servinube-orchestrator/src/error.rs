//! Error surface of the orchestration engine.
//!
//! Only [`ServiceError`] reaches the controllers; it is converted into a
//! `Failed` transition and an observer notification there and never escapes
//! the orchestrator.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::kind::ServiceKind;

/// Environment-level failure of a one-shot command.
///
/// A nonzero exit status is not an error; see
/// [`CommandOutput`](crate::command::CommandOutput).
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// The executable could not be found.
    #[error("command '{program}' was not found")]
    NotFound {
        /// Program that was requested.
        program: String,
        /// Underlying OS error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The process could not be started or awaited.
    #[error("failed to run '{program}': {source}")]
    Io {
        /// Program that was requested.
        program: String,
        /// Underlying OS error.
        #[source]
        source: Arc<io::Error>,
    },
}

impl CommandError {
    pub(crate) fn from_io(program: &str, source: io::Error) -> Self {
        let program = program.to_owned();
        let source = Arc::new(source);
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { program, source }
        } else {
            Self::Io { program, source }
        }
    }
}

/// Failure to start a long-running process.
#[derive(Debug, Clone, Error)]
pub enum SpawnError {
    /// The executable could not be found.
    #[error("executable '{program}' was not found")]
    NotFound {
        /// Program that was requested.
        program: String,
        /// Underlying OS error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The configured working directory does not exist.
    #[error("working directory '{path}' does not exist")]
    MissingDirectory {
        /// Directory that was requested.
        path: String,
    },
    /// Captured output was requested but no pipe was attached.
    #[error("failed to capture stdout of '{program}'")]
    MissingStdout {
        /// Program that was spawned.
        program: String,
    },
    /// The OS refused to create the process.
    #[error("failed to spawn '{program}': {source}")]
    Io {
        /// Program that was requested.
        program: String,
        /// Underlying OS error.
        #[source]
        source: Arc<io::Error>,
    },
}

impl SpawnError {
    pub(crate) fn from_io(program: &str, source: io::Error) -> Self {
        let program = program.to_owned();
        let source = Arc::new(source);
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { program, source }
        } else {
            Self::Io { program, source }
        }
    }
}

/// Failure to deliver a stop request to a process.
#[derive(Debug, Clone, Error)]
#[error("failed to terminate process {pid}: {message}")]
pub struct TerminateError {
    /// Process identifier.
    pub pid: u32,
    message: String,
}

impl TerminateError {
    /// Builds a termination error.
    #[must_use]
    pub fn new(pid: u32, message: impl Into<String>) -> Self {
        Self {
            pid,
            message: message.into(),
        }
    }

    /// Human-readable failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Fatal errors raised by a service start sequence.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// A long-running process could not be spawned.
    #[error("{kind} failed to start: {source}")]
    Spawn {
        /// Service being started.
        kind: ServiceKind,
        /// Underlying spawn error.
        #[source]
        source: SpawnError,
    },
    /// A one-shot command could not be run at all.
    #[error("{kind} command could not run: {source}")]
    Command {
        /// Service being started.
        kind: ServiceKind,
        /// Underlying command error.
        #[source]
        source: CommandError,
    },
    /// A one-shot command ran and reported failure.
    #[error("'{command}' exited with {}: {stderr}", describe_code(.code))]
    CommandExit {
        /// Rendered command line.
        command: String,
        /// Exit code, absent when the process was killed by a signal.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },
    /// The container runtime did not become ready in time.
    #[error("container runtime was not ready after {} ms", .timeout.as_millis())]
    ReadinessTimeout {
        /// Timeout that elapsed.
        timeout: Duration,
    },
}

impl ServiceError {
    /// Service the error is attributed to, when known.
    #[must_use]
    pub const fn kind(&self) -> Option<ServiceKind> {
        match self {
            Self::Spawn { kind, .. } | Self::Command { kind, .. } => Some(*kind),
            Self::CommandExit { .. } | Self::ReadinessTimeout { .. } => None,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(|| String::from("no exit code"), |code| format!("status {code}"))
}
