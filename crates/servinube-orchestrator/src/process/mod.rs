//! Long-running child processes owned by a service.
//!
//! - [`ProcessSpec`] is the launch configuration of a child.
//! - [`ManagedProcess`] is the exclusive handle to one spawned child.
//! - [`LineStream`] is the finite, non-restartable line reader attached to a
//!   child's captured standard output.
//! - [`SystemProcessLauncher`] spawns real processes.
//!
//! On Unix, termination sends SIGTERM to the child's process group and a
//! child that ignores it is never force-killed. Other platforms have no
//! graceful stop signal for console programs: the child is killed outright
//! and only the direct child is reached, so a server started through a
//! wrapper such as `npm.cmd` can outlive it.

mod lines;
mod system;

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::{SpawnError, TerminateError};

pub use lines::LineStream;
pub use system::{SystemProcess, SystemProcessLauncher};

pub(crate) const PROCESS_TARGET: &str = "servinube_orchestrator::process";

/// Launch configuration of a long-running child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    program: String,
    args: Vec<String>,
    cwd: Utf8PathBuf,
    capture_output: bool,
}

impl ProcessSpec {
    /// Builds a spec for `program` running in `cwd` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>, cwd: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            capture_output: false,
        }
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Requests that standard output be piped back to the engine.
    #[must_use]
    pub const fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// Executable name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        self.program.as_str()
    }

    /// Arguments passed to the executable.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        self.args.as_slice()
    }

    /// Working directory.
    #[must_use]
    pub fn cwd(&self) -> &Utf8Path {
        self.cwd.as_path()
    }

    /// Whether standard output is captured.
    #[must_use]
    pub const fn captures_output(&self) -> bool {
        self.capture_output
    }
}

impl fmt::Display for ProcessSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.program)?;
        for arg in &self.args {
            write!(formatter, " {arg}")?;
        }
        Ok(())
    }
}

/// Exclusive handle to a spawned child.
pub trait ManagedProcess: Send {
    /// Operating-system process identifier.
    fn id(&self) -> u32;

    /// Takes the reader over captured standard output.
    ///
    /// Returns `None` when output was not captured or the reader was already
    /// taken.
    fn take_lines(&mut self) -> Option<LineStream>;

    /// Requests a graceful stop.
    ///
    /// Terminating a process that already exited, or that was already
    /// terminated, succeeds without doing anything.
    fn terminate(&mut self) -> Result<(), TerminateError>;
}

/// Spawns long-running children.
pub trait ProcessLauncher: Send + Sync {
    /// Starts the process described by `spec`.
    fn spawn(&self, spec: &ProcessSpec) -> Result<Box<dyn ManagedProcess>, SpawnError>;
}
