//! Notification interface between the engine and a presentation layer.

use std::sync::Arc;

use crate::kind::{ServiceKind, ServiceState};

const OBSERVER_TARGET: &str = "servinube_orchestrator::observer";

/// Observer notified when a service changes state or produces output.
///
/// Notifications are delivered synchronously on whichever thread caused
/// them: the control thread, a detached start worker, or an output scanner.
/// Implementations must not block and must not call back into the
/// controller that notified them while holding their own locks.
pub trait ServiceObserver: Send + Sync {
    /// A service moved to a new lifecycle state.
    fn on_state_changed(&self, kind: ServiceKind, state: ServiceState);

    /// A line of output was read from a service with captured output.
    fn on_raw_output_line(&self, kind: ServiceKind, line: &str);

    /// The set of discovered endpoints changed; `endpoints` is sorted.
    fn on_endpoints_updated(&self, kind: ServiceKind, endpoints: &[String]);

    /// A service reported a human-readable error.
    fn on_error(&self, kind: ServiceKind, message: &str);
}

impl<T> ServiceObserver for Arc<T>
where
    T: ServiceObserver + ?Sized,
{
    fn on_state_changed(&self, kind: ServiceKind, state: ServiceState) {
        (**self).on_state_changed(kind, state);
    }

    fn on_raw_output_line(&self, kind: ServiceKind, line: &str) {
        (**self).on_raw_output_line(kind, line);
    }

    fn on_endpoints_updated(&self, kind: ServiceKind, endpoints: &[String]) {
        (**self).on_endpoints_updated(kind, endpoints);
    }

    fn on_error(&self, kind: ServiceKind, message: &str) {
        (**self).on_error(kind, message);
    }
}

/// Observer that records every notification with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredObserver;

impl StructuredObserver {
    /// Builds a new observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ServiceObserver for StructuredObserver {
    fn on_state_changed(&self, kind: ServiceKind, state: ServiceState) {
        tracing::info!(
            target: OBSERVER_TARGET,
            event = "state_changed",
            service = %kind,
            state = %state,
            "service state changed"
        );
    }

    fn on_raw_output_line(&self, kind: ServiceKind, line: &str) {
        tracing::debug!(
            target: OBSERVER_TARGET,
            event = "output",
            service = %kind,
            line,
            "service output"
        );
    }

    fn on_endpoints_updated(&self, kind: ServiceKind, endpoints: &[String]) {
        tracing::info!(
            target: OBSERVER_TARGET,
            event = "endpoints_updated",
            service = %kind,
            endpoints = ?endpoints,
            "service endpoints updated"
        );
    }

    fn on_error(&self, kind: ServiceKind, message: &str) {
        tracing::error!(
            target: OBSERVER_TARGET,
            event = "error",
            service = %kind,
            message,
            "service reported an error"
        );
    }
}

/// Broadcasts each notification to several observers in registration order.
#[derive(Default, Clone)]
pub struct FanOutObserver {
    observers: Vec<Arc<dyn ServiceObserver>>,
}

impl FanOutObserver {
    /// Builds an empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer to the broadcast list.
    #[must_use]
    pub fn with(mut self, observer: Arc<dyn ServiceObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns `true` when no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl ServiceObserver for FanOutObserver {
    fn on_state_changed(&self, kind: ServiceKind, state: ServiceState) {
        for observer in &self.observers {
            observer.on_state_changed(kind, state);
        }
    }

    fn on_raw_output_line(&self, kind: ServiceKind, line: &str) {
        for observer in &self.observers {
            observer.on_raw_output_line(kind, line);
        }
    }

    fn on_endpoints_updated(&self, kind: ServiceKind, endpoints: &[String]) {
        for observer in &self.observers {
            observer.on_endpoints_updated(kind, endpoints);
        }
    }

    fn on_error(&self, kind: ServiceKind, message: &str) {
        for observer in &self.observers {
            observer.on_error(kind, message);
        }
    }
}
