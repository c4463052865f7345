//! Per-service lifecycle state machine.
//!
//! A [`ServiceController`] owns at most one live process and drives one
//! service through `Stopped -> Starting -> Running -> Stopping -> Stopped`,
//! with `Failed` reachable from `Starting`. State reads never wait on an
//! in-flight start; start and stop sequences are serialised by a separate
//! operation lock.

mod container;
mod server;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

use crate::command::{CommandRunner, SystemCommandRunner};
use crate::error::ServiceError;
use crate::kind::{ServiceKind, ServiceState};
use crate::observer::ServiceObserver;
use crate::plan::{ContainerPlan, ServerPlan};
use crate::process::{ManagedProcess, ProcessLauncher, SystemProcessLauncher};
use crate::readiness::{Clock, SystemClock};
use crate::scanner::{EndpointScanner, ScannerTask};

const CONTROLLER_TARGET: &str = "servinube_orchestrator::controller";

/// Time allowed for an output scanner to drain after its process stops.
pub const SCANNER_GRACE: Duration = Duration::from_secs(2);

/// Side-effecting dependencies shared by every controller.
#[derive(Clone)]
pub struct Collaborators {
    /// Runs one-shot commands.
    pub runner: Arc<dyn CommandRunner>,
    /// Spawns long-running processes.
    pub launcher: Arc<dyn ProcessLauncher>,
    /// Measures and sleeps during readiness waits.
    pub clock: Arc<dyn Clock>,
    /// Receives lifecycle notifications.
    pub observer: Arc<dyn ServiceObserver>,
}

impl Collaborators {
    /// Real process, command and clock implementations reporting to
    /// `observer`.
    #[must_use]
    pub fn system(observer: Arc<dyn ServiceObserver>) -> Self {
        Self {
            runner: Arc::new(SystemCommandRunner),
            launcher: Arc::new(SystemProcessLauncher),
            clock: Arc::new(SystemClock),
            observer,
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[derive(Debug)]
enum Driver {
    Container(ContainerPlan),
    Server {
        plan: ServerPlan,
        endpoints: Option<EndpointScanner>,
    },
}

struct LiveProcess {
    process: Box<dyn ManagedProcess>,
    scanner: Option<ScannerTask>,
}

/// Lifecycle controller of one service.
pub struct ServiceController {
    kind: ServiceKind,
    driver: Driver,
    deps: Collaborators,
    state: Mutex<ServiceState>,
    live: Mutex<Option<LiveProcess>>,
}

impl ServiceController {
    /// Controller for the database container.
    #[must_use]
    pub fn container(plan: ContainerPlan, deps: Collaborators) -> Self {
        Self::with_driver(ServiceKind::Container, Driver::Container(plan), deps)
    }

    /// Controller for a long-running server such as the frontend or backend.
    #[must_use]
    pub fn server(kind: ServiceKind, plan: ServerPlan, deps: Collaborators) -> Self {
        let endpoints = plan.endpoint_port.map(EndpointScanner::new);
        Self::with_driver(kind, Driver::Server { plan, endpoints }, deps)
    }

    fn with_driver(kind: ServiceKind, driver: Driver, deps: Collaborators) -> Self {
        Self {
            kind,
            driver,
            deps,
            state: Mutex::new(ServiceState::Stopped),
            live: Mutex::new(None),
        }
    }

    /// Service this controller drives.
    #[must_use]
    pub const fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServiceState {
        *lock(&self.state)
    }

    /// Endpoints discovered in the service's output, sorted.
    #[must_use]
    pub fn endpoints(&self) -> Vec<String> {
        match &self.driver {
            Driver::Server {
                endpoints: Some(scanner),
                ..
            } => scanner.endpoints(),
            _ => Vec::new(),
        }
    }

    /// Starts the service and returns the resulting state.
    ///
    /// Starting a service that is `Starting`, `Running` or `Stopping` does
    /// nothing and returns that state. Failures move the service to `Failed`
    /// and are reported through [`ServiceObserver::on_error`].
    pub fn start(&self) -> ServiceState {
        if let Err(current) = self.enter(ServiceState::is_inert, ServiceState::Starting) {
            debug!(
                target: CONTROLLER_TARGET,
                service = %self.kind,
                state = %current,
                "start ignored"
            );
            return current;
        }
        let mut live = lock(&self.live);
        let outcome = match &self.driver {
            Driver::Container(plan) => container::start(plan, &self.deps).map(|()| None),
            Driver::Server { plan, endpoints } => {
                server::start(self.kind, plan, endpoints.as_ref(), &self.deps).map(Some)
            }
        };
        match outcome {
            Ok(process) => {
                *live = process;
                self.transition(ServiceState::Running)
            }
            Err(error) => {
                drop(live);
                self.fail(&error)
            }
        }
    }

    /// Stops the service and returns the resulting state.
    ///
    /// Waits for an in-flight start to finish first. Stopping a service that
    /// is `Stopped` or `Failed` issues no command.
    pub fn stop(&self) -> ServiceState {
        let mut live = lock(&self.live);
        let accepts_stop = |state: ServiceState| !state.is_inert() && state != ServiceState::Starting;
        if let Err(current) = self.enter(accepts_stop, ServiceState::Stopping) {
            debug!(
                target: CONTROLLER_TARGET,
                service = %self.kind,
                state = %current,
                "stop ignored"
            );
            return current;
        }
        match &self.driver {
            Driver::Container(plan) => container::stop(plan, &self.deps),
            Driver::Server { endpoints, .. } => {
                server::stop(self.kind, live.take(), endpoints.as_ref(), &self.deps);
            }
        }
        self.transition(ServiceState::Stopped)
    }

    /// Moves to `next` when `allowed` holds for the current state; otherwise
    /// returns the current state untouched.
    fn enter<F>(&self, allowed: F, next: ServiceState) -> Result<(), ServiceState>
    where
        F: Fn(ServiceState) -> bool,
    {
        {
            let mut state = lock(&self.state);
            if !allowed(*state) {
                return Err(*state);
            }
            *state = next;
        }
        self.deps.observer.on_state_changed(self.kind, next);
        Ok(())
    }

    fn transition(&self, next: ServiceState) -> ServiceState {
        *lock(&self.state) = next;
        self.deps.observer.on_state_changed(self.kind, next);
        next
    }

    fn fail(&self, error: &ServiceError) -> ServiceState {
        warn!(
            target: CONTROLLER_TARGET,
            service = %self.kind,
            error = %error,
            "service failed to start"
        );
        self.deps.observer.on_error(self.kind, &error.to_string());
        self.transition(ServiceState::Failed)
    }
}

impl fmt::Debug for ServiceController {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ServiceController")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for ServiceController {
    fn drop(&mut self) {
        let live = self
            .live
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(LiveProcess {
            mut process,
            scanner,
        }) = live
        else {
            return;
        };
        if let Err(error) = process.terminate() {
            warn!(
                target: CONTROLLER_TARGET,
                service = %self.kind,
                pid = error.pid,
                error = %error,
                "failed to terminate process during teardown"
            );
        }
        if let Some(scanner) = scanner {
            scanner.cancel(Duration::ZERO);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
