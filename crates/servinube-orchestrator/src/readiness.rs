//! Fixed-interval polling of a readiness probe.

use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

const READINESS_TARGET: &str = "servinube_orchestrator::readiness";

/// Source of time for polling loops.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Blocks the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant::now`] and [`thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Bounds of a single readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessDeadline {
    /// Pause between probes.
    pub interval: Duration,
    /// Total time allowed.
    pub timeout: Duration,
    /// When the wait began.
    pub started_at: Instant,
}

impl ReadinessDeadline {
    /// Time elapsed at `now`.
    #[must_use]
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// Returns `true` when a probe one interval after `now` would fall at or
    /// beyond the timeout.
    #[must_use]
    pub fn next_probe_expired(&self, now: Instant) -> bool {
        self.elapsed(now).saturating_add(self.interval) >= self.timeout
    }
}

/// Polls a probe until it succeeds or the timeout is reached.
#[derive(Clone, Copy)]
pub struct ReadinessWaiter<'a> {
    clock: &'a dyn Clock,
}

impl<'a> ReadinessWaiter<'a> {
    /// Builds a waiter that measures and sleeps with `clock`.
    #[must_use]
    pub fn new(clock: &'a dyn Clock) -> Self {
        Self { clock }
    }

    /// Waits for `probe` to return `true`.
    ///
    /// The probe runs immediately; a `true` result returns without sleeping.
    /// Otherwise the waiter sleeps `interval` and probes again, giving up
    /// without another probe once the next one would land at or past
    /// `timeout`. A probe that cannot run should report `false`.
    pub fn wait_until_ready<P>(&self, mut probe: P, interval: Duration, timeout: Duration) -> bool
    where
        P: FnMut() -> bool,
    {
        let deadline = ReadinessDeadline {
            interval,
            timeout,
            started_at: self.clock.now(),
        };
        let mut attempts: u32 = 1;
        if probe() {
            return true;
        }
        while !deadline.next_probe_expired(self.clock.now()) {
            self.clock.sleep(interval);
            attempts = attempts.saturating_add(1);
            if probe() {
                debug!(
                    target: READINESS_TARGET,
                    attempts,
                    elapsed_ms = deadline.elapsed(self.clock.now()).as_millis(),
                    "probe reported ready"
                );
                return true;
            }
        }
        debug!(
            target: READINESS_TARGET,
            attempts,
            timeout_ms = timeout.as_millis(),
            "probe did not report ready before timeout"
        );
        false
    }
}
