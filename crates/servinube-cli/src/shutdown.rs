//! Termination signal handling for `servinube up` and `servinube panel`.

use std::io;
use std::thread;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::{debug, info, warn};

const SHUTDOWN_TARGET: &str = "servinube_cli::shutdown";

/// Abstraction over shutdown notification mechanisms.
pub(crate) trait ShutdownSignal {
    /// Blocks until the next shutdown request.
    ///
    /// Returns [`ShutdownError::Closed`] once no further request can arrive.
    fn wait(&mut self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub(crate) enum ShutdownError {
    #[error("failed to install signal handlers: {source}")]
    Install {
        #[source]
        source: io::Error,
    },
    #[error("failed to start the signal listener thread: {source}")]
    Listen {
        #[source]
        source: io::Error,
    },
    #[error("signal listener closed")]
    Closed,
}

/// Listener for SIGINT, SIGTERM, SIGHUP and SIGQUIT.
///
/// Handlers are installed on construction so that a signal arriving while
/// services are still starting is not lost.
pub(crate) struct SystemShutdownSignal {
    signals: Signals,
}

impl SystemShutdownSignal {
    pub(crate) fn install() -> Result<Self, ShutdownError> {
        let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        Ok(Self { signals })
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&mut self) -> Result<(), ShutdownError> {
        let signal = self.signals.forever().next().ok_or(ShutdownError::Closed)?;
        info!(target: SHUTDOWN_TARGET, signal, "shutdown signal received");
        Ok(())
    }
}

/// Calls `notify` for every shutdown request on a detached listener thread.
///
/// The thread exits when `notify` returns `false` or the listener closes.
pub(crate) fn forward<S, F>(mut signal: S, mut notify: F) -> Result<(), ShutdownError>
where
    S: ShutdownSignal + Send + 'static,
    F: FnMut() -> bool + Send + 'static,
{
    thread::Builder::new()
        .name(String::from("servinube-signals"))
        .spawn(move || {
            loop {
                match signal.wait() {
                    Ok(()) if notify() => {}
                    Ok(()) => return,
                    Err(ShutdownError::Closed) => {
                        debug!(target: SHUTDOWN_TARGET, "signal listener closed");
                        return;
                    }
                    Err(error) => {
                        warn!(target: SHUTDOWN_TARGET, error = %error, "signal listener failed");
                        return;
                    }
                }
            }
        })
        .map_err(|source| ShutdownError::Listen { source })?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::time::Duration;

    use rstest::rstest;

    use super::*;

    /// Shutdown signal fired by sending on the paired channel.
    pub(crate) struct ChannelSignal(Receiver<()>);

    impl ChannelSignal {
        pub(crate) fn new() -> (Sender<()>, Self) {
            let (trigger, receiver) = mpsc::channel();
            (trigger, Self(receiver))
        }
    }

    impl ShutdownSignal for ChannelSignal {
        fn wait(&mut self) -> Result<(), ShutdownError> {
            self.0.recv().map_err(|_| ShutdownError::Closed)
        }
    }

    #[rstest]
    fn forwards_each_request_until_the_listener_closes() {
        let (trigger, signal) = ChannelSignal::new();
        let (notified, received) = mpsc::channel();
        forward(signal, move || notified.send(()).is_ok()).expect("listener thread");

        trigger.send(()).expect("first request");
        trigger.send(()).expect("second request");
        drop(trigger);

        let timeout = Duration::from_secs(5);
        assert!(received.recv_timeout(timeout).is_ok());
        assert!(received.recv_timeout(timeout).is_ok());
        assert!(received.recv_timeout(timeout).is_err());
    }
}
