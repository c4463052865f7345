//! `servinube up`: start everything, wait for a signal, stop everything.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use servinube_config::Config;
use servinube_orchestrator::{FanOutObserver, Orchestrator, ServiceObserver, StructuredObserver};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::output::{SharedWriter, TerminalObserver, render_snapshot};
use crate::shutdown::{self, ShutdownSignal};

const UP_TARGET: &str = "servinube_cli::up";

/// Observer used by the interactive commands: tagged lines on stdout plus
/// structured logs on stderr.
pub(crate) fn terminal_observer<W>(output: &SharedWriter<W>) -> Arc<dyn ServiceObserver>
where
    W: Write + Send + 'static,
{
    Arc::new(
        FanOutObserver::new()
            .with(Arc::new(TerminalObserver::new(output.clone())))
            .with(Arc::new(StructuredObserver::new())),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpEvent {
    Signal,
    Started,
}

pub(crate) fn run<W, S>(
    config: &Config,
    output: &SharedWriter<W>,
    signal: S,
) -> Result<ExitCode, AppError>
where
    W: Write + Send + 'static,
    S: ShutdownSignal + Send + 'static,
{
    let (events, incoming) = mpsc::channel();
    let signals = events.clone();
    shutdown::forward(signal, move || signals.send(UpEvent::Signal).is_ok())?;

    let orchestrator = Orchestrator::new(config, terminal_observer(output));
    let starting = orchestrator
        .start_all_detached()
        .map_err(AppError::Worker)?;
    watch_start(starting, events)?;
    output.line("starting services; press Ctrl-C to stop");

    let mut started = false;
    for event in &incoming {
        match event {
            UpEvent::Started => started = true,
            UpEvent::Signal => break,
        }
    }

    if !started {
        info!(target: UP_TARGET, "waiting for in-flight starts before stopping");
        output.line(format_args!(
            "waiting for services still starting before stopping (readiness timeout {} ms)",
            config.readiness_timeout_ms
        ));
        for event in &incoming {
            match event {
                UpEvent::Signal => {
                    output.line("already stopping; still waiting for services to finish starting");
                }
                UpEvent::Started => break,
            }
        }
    }
    let snapshot = orchestrator.shutdown();
    output.text(&render_snapshot(&snapshot));
    Ok(ExitCode::SUCCESS)
}

fn watch_start<T>(starting: JoinHandle<T>, events: Sender<UpEvent>) -> Result<(), AppError>
where
    T: Send + 'static,
{
    thread::Builder::new()
        .name(String::from("servinube-up-watch"))
        .spawn(move || {
            if starting.join().is_err() {
                warn!(target: UP_TARGET, "start worker panicked");
            }
            if events.send(UpEvent::Started).is_err() {
                debug!(target: UP_TARGET, "start finished after shutdown");
            }
        })
        .map_err(AppError::Worker)?;
    Ok(())
}
