//! Synchronous execution of one-shot external commands.

use std::fmt;
use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::error::CommandError;

const COMMAND_TARGET: &str = "servinube_orchestrator::command";

/// Executable, arguments, and optional working directory of an external
/// command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    cwd: Option<Utf8PathBuf>,
}

impl CommandSpec {
    /// Builds a command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
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

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, cwd: impl Into<Utf8PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
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

    /// Working directory, when one was set.
    #[must_use]
    pub fn cwd(&self) -> Option<&Utf8Path> {
        self.cwd.as_deref()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.program)?;
        for arg in &self.args {
            write!(formatter, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit status and captured text of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
}

impl CommandOutput {
    /// Builds an output record.
    #[must_use]
    pub fn new(exit_code: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Returns `true` when the command exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs one-shot commands to completion.
pub trait CommandRunner: Send + Sync {
    /// Runs `spec`, blocking until it exits.
    ///
    /// A nonzero exit is reported through [`CommandOutput`]; only failures to
    /// run the command at all are errors.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

/// Runs commands with [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let mut command = Command::new(spec.program());
        command
            .args(spec.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = spec.cwd() {
            command.current_dir(cwd);
        }
        debug!(target: COMMAND_TARGET, command = %spec, "running command");
        let output = command
            .output()
            .map_err(|source| CommandError::from_io(spec.program(), source))?;
        let result = CommandOutput::new(
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
        debug!(
            target: COMMAND_TARGET,
            command = %spec,
            exit_code = ?result.exit_code,
            "command finished"
        );
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn nonzero_exit_is_a_result_not_an_error() {
        let spec = CommandSpec::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]);
        let output = SystemCommandRunner.run(&spec).expect("sh should run");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[rstest]
    fn missing_executable_is_reported_distinctly() {
        let spec = CommandSpec::new("/nonexistent/servinube-test-binary");
        let error = SystemCommandRunner
            .run(&spec)
            .expect_err("missing binary must fail");
        assert!(matches!(error, CommandError::NotFound { .. }), "got {error:?}");
    }

    #[rstest]
    fn runs_in_the_requested_directory() {
        let spec = CommandSpec::new("pwd").current_dir("/");
        let output = SystemCommandRunner.run(&spec).expect("pwd should run");
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "/");
    }

    #[rstest]
    fn display_renders_the_command_line() {
        let spec = CommandSpec::new("docker").args(["start", "postgres-db"]);
        assert_eq!(spec.to_string(), "docker start postgres-db");
    }
}
