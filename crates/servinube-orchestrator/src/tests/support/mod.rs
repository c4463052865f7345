//! Test doubles for the orchestration engine.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use servinube_config::Config;

use crate::command::{CommandOutput, CommandRunner, CommandSpec};
use crate::controller::Collaborators;
use crate::error::{CommandError, SpawnError, TerminateError};
use crate::kind::{ServiceKind, ServiceState};
use crate::observer::ServiceObserver;
use crate::orchestrator::Orchestrator;
use crate::plan::ServicePlan;
use crate::process::{LineStream, ManagedProcess, ProcessLauncher, ProcessSpec};
use crate::readiness::Clock;

pub const RUNNING_PROBE: &str = "docker inspect --format {{.State.Running}} postgres-db";
pub const RUNTIME_PROBE: &str = "docker info";
pub const CONTAINER_START: &str = "docker start postgres-db";
pub const CONTAINER_STOP: &str = "docker stop postgres-db";
pub const FRONTEND_COMMAND: &str = "npm run preview -- --host";
pub const BACKEND_COMMAND: &str = "npm run dev";

/// Clock whose time only advances when something sleeps on it.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    state: Mutex<ClockState>,
}

#[derive(Debug, Default)]
struct ClockState {
    offset: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            state: Mutex::new(ClockState::default()),
        }
    }

    /// Every sleep requested so far.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().expect("clock lock").sleeps.clone()
    }

    /// Virtual time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().expect("clock lock").offset
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().expect("clock lock");
        state.offset += duration;
        state.sleeps.push(duration);
    }
}

/// Notification captured by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
    State(ServiceKind, ServiceState),
    Output(ServiceKind, String),
    Endpoints(ServiceKind, Vec<String>),
    Error(ServiceKind, String),
}

/// Observer that records every notification in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().expect("observer lock").clone()
    }

    /// States published for `kind`, in order.
    pub fn states(&self, kind: ServiceKind) -> Vec<ServiceState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObserverEvent::State(recorded, state) if recorded == kind => Some(state),
                _ => None,
            })
            .collect()
    }

    /// Error messages published for `kind`.
    pub fn errors(&self, kind: ServiceKind) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObserverEvent::Error(recorded, message) if recorded == kind => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Endpoint lists published for `kind`.
    pub fn endpoint_updates(&self, kind: ServiceKind) -> Vec<Vec<String>> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObserverEvent::Endpoints(recorded, endpoints) if recorded == kind => {
                    Some(endpoints)
                }
                _ => None,
            })
            .collect()
    }

    /// Raw output lines published for `kind`.
    pub fn output(&self, kind: ServiceKind) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObserverEvent::Output(recorded, line) if recorded == kind => Some(line),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ObserverEvent) {
        self.events.lock().expect("observer lock").push(event);
    }
}

impl ServiceObserver for RecordingObserver {
    fn on_state_changed(&self, kind: ServiceKind, state: ServiceState) {
        self.push(ObserverEvent::State(kind, state));
    }

    fn on_raw_output_line(&self, kind: ServiceKind, line: &str) {
        self.push(ObserverEvent::Output(kind, line.to_owned()));
    }

    fn on_endpoints_updated(&self, kind: ServiceKind, endpoints: &[String]) {
        self.push(ObserverEvent::Endpoints(kind, endpoints.to_vec()));
    }

    fn on_error(&self, kind: ServiceKind, message: &str) {
        self.push(ObserverEvent::Error(kind, message.to_owned()));
    }
}

type Scripted = Result<CommandOutput, CommandError>;

/// Command runner answering from per-command scripts.
///
/// Each command line owns a queue of responses; the last response repeats
/// once the queue is drained. Unscripted commands exit 0 with no output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<String>>,
    holds: Mutex<HashMap<String, (Sender<()>, Receiver<()>)>>,
}

impl ScriptedRunner {
    /// Replaces the script of `command` with a single repeating response.
    pub fn respond(&self, command: &str, response: Scripted) {
        self.respond_sequence(command, vec![response]);
    }

    /// Replaces the script of `command` with `responses`.
    pub fn respond_sequence(&self, command: &str, responses: Vec<Scripted>) {
        self.scripts
            .lock()
            .expect("runner lock")
            .insert(command.to_owned(), responses.into());
    }

    /// Blocks the next run of `command` until the returned sender fires.
    ///
    /// The returned receiver yields once that run has started.
    pub fn hold(&self, command: &str) -> (Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        self.holds
            .lock()
            .expect("runner lock")
            .insert(command.to_owned(), (entered_tx, release_rx));
        (entered_rx, release_tx)
    }

    /// Every command line run so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("runner lock").clone()
    }

    /// Number of times `command` ran.
    pub fn count(&self, command: &str) -> usize {
        self.calls().iter().filter(|call| *call == command).count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let line = spec.to_string();
        self.calls.lock().expect("runner lock").push(line.clone());
        let held = self.holds.lock().expect("runner lock").remove(&line);
        if let Some((entered, release)) = held {
            entered.send(()).expect("test awaits the held command");
            release.recv().expect("test releases the held command");
        }
        let mut scripts = self.scripts.lock().expect("runner lock");
        let Some(queue) = scripts.get_mut(&line) else {
            return Ok(exit(0));
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap_or_else(|| Ok(exit(0)))
        } else {
            queue.front().cloned().unwrap_or_else(|| Ok(exit(0)))
        }
    }
}

/// Output with `code` and nothing printed.
pub fn exit(code: i32) -> CommandOutput {
    CommandOutput::new(Some(code), "", "")
}

/// Output of the running-container probe.
pub fn running(value: bool) -> Scripted {
    Ok(CommandOutput::new(Some(0), format!("{value}\n"), ""))
}

/// Failure to run a command at all.
pub fn missing_binary(program: &str) -> Scripted {
    Err(CommandError::from_io(
        program,
        std::io::Error::from(std::io::ErrorKind::NotFound),
    ))
}

/// Launcher recording spawns and handing out scripted fake processes.
#[derive(Debug, Default)]
pub struct FakeLauncher {
    next_pid: AtomicU32,
    spawned: Mutex<Vec<ProcessSpec>>,
    failing: Mutex<HashSet<String>>,
    failing_terminate: Mutex<HashSet<String>>,
    output: Mutex<HashMap<String, Vec<String>>>,
    terminated: Arc<Mutex<Vec<u32>>>,
}

impl FakeLauncher {
    /// Makes spawning `command` fail with a missing-executable error.
    pub fn fail_spawn(&self, command: &str) {
        self.failing.lock().expect("launcher lock").insert(command.to_owned());
    }

    /// Makes terminating processes spawned for `command` fail.
    pub fn fail_terminate(&self, command: &str) {
        self.failing_terminate
            .lock()
            .expect("launcher lock")
            .insert(command.to_owned());
    }

    /// Lines a captured `command` prints before its output closes.
    pub fn emit(&self, command: &str, lines: &[&str]) {
        self.output.lock().expect("launcher lock").insert(
            command.to_owned(),
            lines.iter().map(|line| (*line).to_owned()).collect(),
        );
    }

    /// Command lines of every successful spawn.
    pub fn spawned(&self) -> Vec<String> {
        self.spawned
            .lock()
            .expect("launcher lock")
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Number of successful spawns of `command`.
    pub fn spawn_count(&self, command: &str) -> usize {
        self.spawned().iter().filter(|line| *line == command).count()
    }

    /// Process ids terminated so far, in order.
    pub fn terminated(&self) -> Vec<u32> {
        self.terminated.lock().expect("launcher lock").clone()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn spawn(&self, spec: &ProcessSpec) -> Result<Box<dyn ManagedProcess>, SpawnError> {
        let line = spec.to_string();
        if self.failing.lock().expect("launcher lock").contains(&line) {
            return Err(SpawnError::from_io(
                spec.program(),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }
        self.spawned.lock().expect("launcher lock").push(spec.clone());
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst) + 100;
        let lines = spec.captures_output().then(|| {
            let text = self
                .output
                .lock()
                .expect("launcher lock")
                .get(&line)
                .map(|lines| lines.join("\n"))
                .unwrap_or_default();
            LineStream::new(Cursor::new(text.into_bytes()))
        });
        let refuse_terminate = self
            .failing_terminate
            .lock()
            .expect("launcher lock")
            .contains(&line);
        Ok(Box::new(FakeProcess {
            pid,
            lines,
            refuse_terminate,
            terminated: false,
            log: Arc::clone(&self.terminated),
        }))
    }
}

struct FakeProcess {
    pid: u32,
    lines: Option<LineStream>,
    refuse_terminate: bool,
    terminated: bool,
    log: Arc<Mutex<Vec<u32>>>,
}

impl ManagedProcess for FakeProcess {
    fn id(&self) -> u32 {
        self.pid
    }

    fn take_lines(&mut self) -> Option<LineStream> {
        self.lines.take()
    }

    fn terminate(&mut self) -> Result<(), TerminateError> {
        if self.refuse_terminate {
            return Err(TerminateError::new(self.pid, "operation not permitted"));
        }
        if !self.terminated {
            self.terminated = true;
            self.log.lock().expect("launcher lock").push(self.pid);
        }
        Ok(())
    }
}

/// Configuration used by every fake-driven test.
pub fn test_config() -> Config {
    Config {
        frontend_project_path: Utf8PathBuf::from("/srv/web"),
        backend_project_path: Utf8PathBuf::from("/srv/web/backend"),
        package_manager: String::from("npm"),
        readiness_interval_ms: 2_000,
        readiness_timeout_ms: 6_000,
        ..Config::default()
    }
}

/// Orchestrator wired to fakes that tests can script and inspect.
pub struct Harness {
    pub runner: Arc<ScriptedRunner>,
    pub launcher: Arc<FakeLauncher>,
    pub clock: Arc<ManualClock>,
    pub observer: Arc<RecordingObserver>,
    pub plan: ServicePlan,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new() -> Self {
        let runner = Arc::new(ScriptedRunner::default());
        let launcher = Arc::new(FakeLauncher::default());
        let clock = Arc::new(ManualClock::new());
        let observer = Arc::new(RecordingObserver::default());
        let plan = ServicePlan::from_config(&test_config());
        let deps = Collaborators {
            runner: runner.clone(),
            launcher: launcher.clone(),
            clock: clock.clone(),
            observer: observer.clone(),
        };
        let orchestrator = Orchestrator::with_collaborators(plan.clone(), deps);
        Self {
            runner,
            launcher,
            clock,
            observer,
            plan,
            orchestrator,
        }
    }

    /// Command line of the runtime launcher.
    pub fn launcher_command(&self) -> String {
        self.plan.container.launcher.to_string()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls `condition` in real time until it holds or five seconds pass.
pub fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}
