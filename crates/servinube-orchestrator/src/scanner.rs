//! Endpoint discovery from a service's output stream.
//!
//! [`EndpointScanner`] turns each line into at most one endpoint by taking
//! the first IPv4-looking token and pairing it with the configured port.
//! [`ScannerTask`] drains a [`LineStream`] on a dedicated thread, forwarding
//! every line and every change of the endpoint set to the observer.

use std::collections::BTreeSet;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::kind::ServiceKind;
use crate::observer::ServiceObserver;
use crate::process::LineStream;

const SCANNER_TARGET: &str = "servinube_orchestrator::scanner";
const JOIN_POLL: Duration = Duration::from_millis(20);

#[expect(clippy::expect_used, reason = "the pattern is a compile-time constant")]
static HOST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("host pattern must compile")
});

/// Returns the first IPv4-looking token in `line`.
#[must_use]
pub fn extract_host(line: &str) -> Option<&str> {
    HOST_PATTERN.find(line).map(|found| found.as_str())
}

/// Deduplicated, sorted set of endpoints discovered for one service.
///
/// Clones share the same set, so a controller can clear what its scanner
/// thread fills.
#[derive(Debug, Clone)]
pub struct EndpointScanner {
    port: u16,
    endpoints: Arc<Mutex<BTreeSet<String>>>,
}

impl EndpointScanner {
    /// Builds an empty scanner that appends `port` to discovered hosts.
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            port,
            endpoints: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    /// Port appended to discovered hosts.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Scans one line.
    ///
    /// Returns the full sorted endpoint list when the line contributed a new
    /// endpoint, and `None` when it matched nothing or a known endpoint.
    pub fn scan_line(&self, line: &str) -> Option<Vec<String>> {
        self.record(line, None)
    }

    /// Scans one line unless `cancelled` is set.
    ///
    /// The flag is read with the set locked, so once a cancel is followed by
    /// [`clear`](Self::clear) no late line can repopulate the set.
    pub fn scan_line_unless(&self, line: &str, cancelled: &AtomicBool) -> Option<Vec<String>> {
        self.record(line, Some(cancelled))
    }

    fn record(&self, line: &str, cancelled: Option<&AtomicBool>) -> Option<Vec<String>> {
        let host = extract_host(line)?;
        let endpoint = format!("http://{host}:{}", self.port);
        let mut endpoints = self.lock();
        if cancelled.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            return None;
        }
        if !endpoints.insert(endpoint) {
            return None;
        }
        Some(endpoints.iter().cloned().collect())
    }

    /// Snapshot of the current endpoints in lexicographic order.
    #[must_use]
    pub fn endpoints(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    /// Removes every endpoint. Returns `true` when the set was non-empty.
    pub fn clear(&self) -> bool {
        let mut endpoints = self.lock();
        let had_endpoints = !endpoints.is_empty();
        endpoints.clear();
        had_endpoints
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.endpoints.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Background thread draining one service's output.
#[derive(Debug)]
pub struct ScannerTask {
    kind: ServiceKind,
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ScannerTask {
    /// Starts draining `lines` on a new thread.
    ///
    /// Every line is forwarded to [`ServiceObserver::on_raw_output_line`] in
    /// arrival order; lines that add an endpoint also trigger
    /// [`ServiceObserver::on_endpoints_updated`] with the full sorted set.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the thread cannot be created.
    pub fn spawn(
        kind: ServiceKind,
        lines: LineStream,
        scanner: EndpointScanner,
        observer: Arc<dyn ServiceObserver>,
    ) -> io::Result<Self> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let handle = thread::Builder::new()
            .name(format!("servinube-scan-{kind}"))
            .spawn(move || drain(kind, lines, &scanner, observer.as_ref(), &flag))?;
        Ok(Self {
            kind,
            cancelled,
            handle: Some(handle),
        })
    }

    /// Stops publishing and waits up to `grace` for the thread to finish.
    ///
    /// Returns `true` when the thread was joined. A thread still blocked on a
    /// read after the grace period is detached; it exits on its own once the
    /// stream closes and publishes nothing further.
    pub fn cancel(mut self, grace: Duration) -> bool {
        self.cancelled.store(true, Ordering::SeqCst);
        let Some(handle) = self.handle.take() else {
            return true;
        };
        let deadline = Instant::now() + grace;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(JOIN_POLL);
        }
        if !handle.is_finished() {
            warn!(
                target: SCANNER_TARGET,
                service = %self.kind,
                grace_ms = grace.as_millis(),
                "output scanner still blocked on read; detaching"
            );
            return false;
        }
        if handle.join().is_err() {
            warn!(
                target: SCANNER_TARGET,
                service = %self.kind,
                "output scanner thread panicked"
            );
        }
        true
    }

    /// Returns `true` once the underlying stream has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for ScannerTask {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

fn drain(
    kind: ServiceKind,
    lines: LineStream,
    scanner: &EndpointScanner,
    observer: &dyn ServiceObserver,
    cancelled: &AtomicBool,
) {
    debug!(target: SCANNER_TARGET, service = %kind, "output scanner started");
    for line in lines {
        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        observer.on_raw_output_line(kind, &line);
        if let Some(endpoints) = scanner.scan_line_unless(&line, cancelled) {
            observer.on_endpoints_updated(kind, &endpoints);
        }
    }
    debug!(target: SCANNER_TARGET, service = %kind, "output scanner finished");
}
