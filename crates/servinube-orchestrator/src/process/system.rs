use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread;

use tracing::{debug, info, warn};

use super::{LineStream, ManagedProcess, PROCESS_TARGET, ProcessLauncher, ProcessSpec};
use crate::error::{SpawnError, TerminateError};

/// Spawns children with [`std::process::Command`].
///
/// On Unix each child leads its own process group so that stopping a
/// package-manager wrapper also reaches the server it started.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessLauncher;

impl ProcessLauncher for SystemProcessLauncher {
    fn spawn(&self, spec: &ProcessSpec) -> Result<Box<dyn ManagedProcess>, SpawnError> {
        SystemProcess::spawn(spec).map(|process| Box::new(process) as Box<dyn ManagedProcess>)
    }
}

/// A real child process.
#[derive(Debug)]
pub struct SystemProcess {
    program: String,
    pid: u32,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl SystemProcess {
    /// Spawns the process described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError`] when the working directory is missing, the
    /// executable cannot be found, or the OS refuses to create the process.
    pub fn spawn(spec: &ProcessSpec) -> Result<Self, SpawnError> {
        if !spec.cwd().is_dir() {
            return Err(SpawnError::MissingDirectory {
                path: spec.cwd().to_string(),
            });
        }
        let mut command = Command::new(spec.program());
        command
            .args(spec.arguments())
            .current_dir(spec.cwd())
            .stdin(Stdio::null());
        if spec.captures_output() {
            command.stdout(Stdio::piped()).stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command
            .spawn()
            .map_err(|source| SpawnError::from_io(spec.program(), source))?;
        let stdout = child.stdout.take();
        if spec.captures_output() && stdout.is_none() {
            return Err(SpawnError::MissingStdout {
                program: spec.program().to_owned(),
            });
        }
        let pid = child.id();
        info!(
            target: PROCESS_TARGET,
            pid,
            command = %spec,
            cwd = %spec.cwd(),
            captured = spec.captures_output(),
            "process spawned"
        );
        Ok(Self {
            program: spec.program().to_owned(),
            pid,
            child: Some(child),
            stdout,
        })
    }
}

impl ManagedProcess for SystemProcess {
    fn id(&self) -> u32 {
        self.pid
    }

    fn take_lines(&mut self) -> Option<LineStream> {
        self.stdout.take().map(LineStream::new)
    }

    fn terminate(&mut self) -> Result<(), TerminateError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(
                    target: PROCESS_TARGET,
                    pid = self.pid,
                    ?status,
                    "process had already exited"
                );
                return Ok(());
            }
            Ok(None) => {}
            Err(error) => {
                warn!(
                    target: PROCESS_TARGET,
                    pid = self.pid,
                    error = %error,
                    "failed to query process status; signalling anyway"
                );
            }
        }
        if let Err(error) = request_stop(&mut child, self.pid) {
            self.child = Some(child);
            return Err(error);
        }
        info!(
            target: PROCESS_TARGET,
            pid = self.pid,
            program = %self.program,
            "stop requested"
        );
        reap_in_background(child, self.pid);
        Ok(())
    }
}

#[cfg(unix)]
fn request_stop(_child: &mut Child, pid: u32) -> Result<(), TerminateError> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| TerminateError::new(pid, "process id does not fit a pid_t"))?;
    match killpg(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(TerminateError::new(pid, errno.desc())),
    }
}

// Forced and limited to the direct child; see the module docs.
#[cfg(not(unix))]
fn request_stop(child: &mut Child, pid: u32) -> Result<(), TerminateError> {
    match child.kill() {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
        Err(error) => Err(TerminateError::new(pid, error.to_string())),
    }
}

fn reap_in_background(mut child: Child, pid: u32) {
    let spawned = thread::Builder::new()
        .name(format!("servinube-reap-{pid}"))
        .spawn(move || match child.wait() {
            Ok(status) => debug!(target: PROCESS_TARGET, pid, ?status, "process exited"),
            Err(error) => warn!(
                target: PROCESS_TARGET,
                pid,
                error = %error,
                "failed to reap process"
            ),
        });
    if let Err(error) = spawned {
        warn!(
            target: PROCESS_TARGET,
            pid,
            error = %error,
            "failed to start reaper thread"
        );
    }
}
