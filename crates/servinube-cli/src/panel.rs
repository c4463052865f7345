//! `servinube panel`: a line-oriented control surface on standard input.
//!
//! Start and stop requests are queued to a single worker thread and run in
//! the order typed, so `stop all` never overtakes an earlier `start all`.
//! `status` and `endpoints` read the orchestrator directly and answer at
//! once even while a start is waiting on the container runtime. A
//! termination signal ends the session like `quit` does.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use servinube_config::Config;
use servinube_orchestrator::{Orchestrator, ServiceKind};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::output::{SharedWriter, render_snapshot};
use crate::shutdown::{self, ShutdownSignal};
use crate::up::terminal_observer;

const PANEL_TARGET: &str = "servinube_cli::panel";

const HELP: &str = "\
commands:
  start <all|container|frontend|backend>
  stop <all|container|frontend|backend>
  status      show every service state
  endpoints   show frontend endpoints
  help        show this list
  quit        stop everything and exit
";

/// Services addressed by a start or stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    All,
    One(ServiceKind),
}

impl FromStr for Target {
    type Err = PanelCommandError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        value
            .parse::<ServiceKind>()
            .map(Self::One)
            .map_err(|error| PanelCommandError::UnknownTarget(error.value().to_owned()))
    }
}

/// One line of panel input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PanelCommand {
    Start(Target),
    Stop(Target),
    Status,
    Endpoints,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum PanelCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'; type 'help' for the list")]
    Unknown(String),
    #[error("'{0}' needs a target: all, container, frontend or backend")]
    MissingTarget(&'static str),
    #[error("unknown service '{0}'")]
    UnknownTarget(String),
    #[error("unexpected argument '{0}'")]
    Unexpected(String),
}

impl FromStr for PanelCommand {
    type Err = PanelCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(PanelCommandError::Empty)?.to_ascii_lowercase();
        let command = match verb.as_str() {
            "start" => Self::Start(target(words.next(), "start")?),
            "stop" => Self::Stop(target(words.next(), "stop")?),
            "status" => Self::Status,
            "endpoints" => Self::Endpoints,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => return Err(PanelCommandError::Unknown(verb)),
        };
        match words.next() {
            Some(extra) => Err(PanelCommandError::Unexpected(extra.to_owned())),
            None => Ok(command),
        }
    }
}

fn target(word: Option<&str>, verb: &'static str) -> Result<Target, PanelCommandError> {
    word.ok_or(PanelCommandError::MissingTarget(verb))?.parse()
}

#[derive(Debug, Clone, Copy)]
enum Request {
    Start(Target),
    Stop(Target),
}

fn spawn_worker(
    orchestrator: Arc<Orchestrator>,
) -> Result<(Sender<Request>, JoinHandle<()>), AppError> {
    let (sender, receiver) = mpsc::channel::<Request>();
    let handle = thread::Builder::new()
        .name(String::from("servinube-panel"))
        .spawn(move || {
            for request in receiver {
                debug!(target: PANEL_TARGET, ?request, "running request");
                match request {
                    Request::Start(Target::All) => {
                        orchestrator.start_all();
                    }
                    Request::Start(Target::One(kind)) => {
                        orchestrator.start(kind);
                    }
                    Request::Stop(Target::All) => {
                        orchestrator.stop_all();
                    }
                    Request::Stop(Target::One(kind)) => {
                        orchestrator.stop(kind);
                    }
                }
            }
        })
        .map_err(AppError::Worker)?;
    Ok((sender, handle))
}

/// Everything the panel loop reacts to.
#[derive(Debug)]
enum Event {
    Line(String),
    InputClosed,
    InputFailed(io::Error),
    Signal,
}

pub(crate) fn run<R, W, S>(
    config: &Config,
    input: R,
    output: &SharedWriter<W>,
    signal: S,
) -> Result<ExitCode, AppError>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
    S: ShutdownSignal + Send + 'static,
{
    let (events, incoming) = mpsc::channel();
    let signals = events.clone();
    shutdown::forward(signal, move || signals.send(Event::Signal).is_ok())?;

    let orchestrator = Arc::new(Orchestrator::new(config, terminal_observer(output)));
    let (requests, worker) = spawn_worker(Arc::clone(&orchestrator))?;
    spawn_reader(input, events)?;
    output.line("servinube panel ready; type 'help' for commands");

    let outcome = handle_events(&incoming, &orchestrator, &requests, output);

    if requests.send(Request::Stop(Target::All)).is_err() {
        warn!(target: PANEL_TARGET, "panel worker exited early; stopping inline");
        orchestrator.stop_all();
    }
    drop(requests);
    if worker.join().is_err() {
        warn!(target: PANEL_TARGET, "panel worker panicked");
        orchestrator.stop_all();
    }
    output.text(&render_snapshot(&orchestrator.snapshot()));
    outcome.map(|()| ExitCode::SUCCESS)
}

/// Reads `input` on a detached thread.
///
/// The thread may stay blocked on a read after the panel has finished; it
/// sends nothing further once the loop is gone.
fn spawn_reader<R>(input: R, events: Sender<Event>) -> Result<(), AppError>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name(String::from("servinube-input"))
        .spawn(move || {
            for line in input.lines() {
                let (event, last) = match line {
                    Ok(text) => (Event::Line(text), false),
                    Err(error) => (Event::InputFailed(error), true),
                };
                if events.send(event).is_err() || last {
                    return;
                }
            }
            if events.send(Event::InputClosed).is_err() {
                debug!(target: PANEL_TARGET, "input closed after the panel finished");
            }
        })
        .map_err(AppError::Worker)?;
    Ok(())
}

fn handle_events<W>(
    incoming: &Receiver<Event>,
    orchestrator: &Orchestrator,
    requests: &Sender<Request>,
    output: &SharedWriter<W>,
) -> Result<(), AppError>
where
    W: Write,
{
    for event in incoming {
        match event {
            Event::Line(line) => {
                if !handle_line(&line, orchestrator, requests, output) {
                    return Ok(());
                }
            }
            Event::InputClosed => return Ok(()),
            Event::InputFailed(error) => return Err(AppError::ReadInput(error)),
            Event::Signal => {
                output.line("signal received; stopping every service");
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Handles one input line. Returns `false` when the panel should quit.
fn handle_line<W>(
    line: &str,
    orchestrator: &Orchestrator,
    requests: &Sender<Request>,
    output: &SharedWriter<W>,
) -> bool
where
    W: Write,
{
    let request = match line.parse::<PanelCommand>() {
        Ok(PanelCommand::Start(target)) => Request::Start(target),
        Ok(PanelCommand::Stop(target)) => Request::Stop(target),
        Ok(PanelCommand::Status) => {
            output.text(&render_snapshot(&orchestrator.snapshot()));
            return true;
        }
        Ok(PanelCommand::Endpoints) => {
            let endpoints = orchestrator.frontend_endpoints();
            if endpoints.is_empty() {
                output.line("no frontend endpoints discovered");
            }
            for endpoint in endpoints {
                output.line(endpoint);
            }
            return true;
        }
        Ok(PanelCommand::Help) => {
            output.text(HELP);
            return true;
        }
        Ok(PanelCommand::Quit) => return false,
        Err(PanelCommandError::Empty) => return true,
        Err(error) => {
            output.line(error);
            return true;
        }
    };
    if requests.send(request).is_err() {
        warn!(target: PANEL_TARGET, "panel worker is gone; ignoring request");
    }
    true
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::output::tests::Buffer;
    use crate::shutdown::tests::ChannelSignal;
    use rstest::rstest;

    /// Standard input that blocks until its feed sends bytes or hangs up.
    struct HeldInput(Receiver<Vec<u8>>);

    impl Read for HeldInput {
        fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
            let Ok(chunk) = self.0.recv() else {
                return Ok(0);
            };
            let length = chunk.len().min(buffer.len());
            buffer
                .get_mut(..length)
                .expect("length fits the buffer")
                .copy_from_slice(chunk.get(..length).expect("length fits the chunk"));
            Ok(length)
        }
    }

    #[rstest]
    fn a_signal_ends_a_session_whose_input_stays_open() {
        let (feed, receiver) = mpsc::channel::<Vec<u8>>();
        let input = io::BufReader::new(HeldInput(receiver));
        let (trigger, signal) = ChannelSignal::new();
        trigger.send(()).expect("signal");
        let buffer = Buffer::default();

        let code = run(&Config::default(), input, &SharedWriter::new(buffer.clone()), signal)
            .expect("panel should run");

        assert_eq!(code, ExitCode::SUCCESS);
        let printed = buffer.contents();
        assert!(printed.contains("signal received; stopping every service"), "got {printed}");
        assert!(printed.contains("container stopped"), "got {printed}");
        drop(feed);
    }

    #[rstest]
    fn end_of_input_ends_the_session() {
        let (_trigger, signal) = ChannelSignal::new();
        let buffer = Buffer::default();

        let code = run(
            &Config::default(),
            &b"status\nbogus\n"[..],
            &SharedWriter::new(buffer.clone()),
            signal,
        )
        .expect("panel should run");

        assert_eq!(code, ExitCode::SUCCESS);
        let printed = buffer.contents();
        assert!(printed.contains("unknown command 'bogus'"), "got {printed}");
        assert!(!printed.contains("signal received"), "got {printed}");
    }

    #[rstest]
    #[case("start all", PanelCommand::Start(Target::All))]
    #[case("START frontend", PanelCommand::Start(Target::One(ServiceKind::Frontend)))]
    #[case("stop docker", PanelCommand::Stop(Target::One(ServiceKind::Container)))]
    #[case("  stop   backend  ", PanelCommand::Stop(Target::One(ServiceKind::Backend)))]
    #[case("status", PanelCommand::Status)]
    #[case("endpoints", PanelCommand::Endpoints)]
    #[case("?", PanelCommand::Help)]
    #[case("exit", PanelCommand::Quit)]
    fn parses_panel_commands(#[case] line: &str, #[case] expected: PanelCommand) {
        assert_eq!(line.parse::<PanelCommand>(), Ok(expected));
    }

    #[rstest]
    #[case("", PanelCommandError::Empty)]
    #[case("launch all", PanelCommandError::Unknown(String::from("launch")))]
    #[case("start", PanelCommandError::MissingTarget("start"))]
    #[case("stop redis", PanelCommandError::UnknownTarget(String::from("redis")))]
    #[case("status now", PanelCommandError::Unexpected(String::from("now")))]
    fn rejects_malformed_commands(#[case] line: &str, #[case] expected: PanelCommandError) {
        assert_eq!(line.parse::<PanelCommand>(), Err(expected));
    }

    #[rstest]
    fn missing_target_message_lists_the_choices() {
        let error = "stop".parse::<PanelCommand>().expect_err("target is missing");
        assert_eq!(
            error.to_string(),
            "'stop' needs a target: all, container, frontend or backend"
        );
    }
}
