//! Human-readable rendering of orchestrator activity.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use servinube_orchestrator::{ServiceKind, ServiceObserver, ServiceState, StatusSnapshot};

/// Line-oriented writer shared between the prompt and observer threads.
///
/// Each line is written under a lock so output from different services
/// never interleaves mid-line.
pub(crate) struct SharedWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for SharedWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Write> SharedWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Writes one line; failures are dropped because there is nowhere left
    /// to report them.
    pub(crate) fn line(&self, line: impl fmt::Display) {
        let mut writer = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(writer, "{line}");
        let _ = writer.flush();
    }

    /// Writes pre-rendered text verbatim.
    pub(crate) fn text(&self, text: &str) {
        let mut writer = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writer.write_all(text.as_bytes());
        let _ = writer.flush();
    }
}

/// Observer that prints each notification as a tagged line.
pub(crate) struct TerminalObserver<W> {
    output: SharedWriter<W>,
}

impl<W> TerminalObserver<W> {
    pub(crate) const fn new(output: SharedWriter<W>) -> Self {
        Self { output }
    }
}

impl<W: Write + Send> ServiceObserver for TerminalObserver<W> {
    fn on_state_changed(&self, kind: ServiceKind, state: ServiceState) {
        self.output.line(format_args!("[{kind}] {state}"));
    }

    fn on_raw_output_line(&self, kind: ServiceKind, line: &str) {
        self.output.line(format_args!("[{kind}] | {line}"));
    }

    fn on_endpoints_updated(&self, kind: ServiceKind, endpoints: &[String]) {
        if endpoints.is_empty() {
            self.output.line(format_args!("[{kind}] endpoints cleared"));
        } else {
            self.output
                .line(format_args!("[{kind}] endpoints: {}", endpoints.join(", ")));
        }
    }

    fn on_error(&self, kind: ServiceKind, message: &str) {
        self.output.line(format_args!("[{kind}] error: {message}"));
    }
}

/// Renders one row per service, with frontend endpoints on their own lines.
pub(crate) fn render_snapshot(snapshot: &StatusSnapshot) -> String {
    let mut rendered = String::new();
    for kind in ServiceKind::ALL {
        rendered.push_str(&format!("{:<10}{}\n", kind.to_string(), snapshot.state(kind)));
    }
    for endpoint in &snapshot.endpoints {
        rendered.push_str(&format!("  {endpoint}\n"));
    }
    rendered
}
