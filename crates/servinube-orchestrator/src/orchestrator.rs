//! Facade over the three service controllers.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use servinube_config::Config;
use tracing::{debug, info};

use crate::controller::{Collaborators, ServiceController};
use crate::kind::{ServiceKind, ServiceState};
use crate::observer::ServiceObserver;
use crate::plan::ServicePlan;

const ORCHESTRATOR_TARGET: &str = "servinube_orchestrator::orchestrator";

/// Point-in-time view of every service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Database container state.
    pub container: ServiceState,
    /// Frontend server state.
    pub frontend: ServiceState,
    /// Backend server state.
    pub backend: ServiceState,
    /// Endpoints discovered in the frontend output.
    pub endpoints: Vec<String>,
}

impl StatusSnapshot {
    /// State of `kind`.
    #[must_use]
    pub const fn state(&self, kind: ServiceKind) -> ServiceState {
        match kind {
            ServiceKind::Container => self.container,
            ServiceKind::Frontend => self.frontend,
            ServiceKind::Backend => self.backend,
        }
    }
}

/// Owns one controller per service and sequences bulk operations.
#[derive(Debug)]
pub struct Orchestrator {
    container: Arc<ServiceController>,
    frontend: Arc<ServiceController>,
    backend: Arc<ServiceController>,
}

impl Orchestrator {
    /// Builds an orchestrator that runs real commands derived from `config`.
    #[must_use]
    pub fn new(config: &Config, observer: Arc<dyn ServiceObserver>) -> Self {
        Self::with_collaborators(
            ServicePlan::from_config(config),
            Collaborators::system(observer),
        )
    }

    /// Builds an orchestrator from an explicit plan and collaborators.
    #[must_use]
    pub fn with_collaborators(plan: ServicePlan, deps: Collaborators) -> Self {
        let ServicePlan {
            container,
            frontend,
            backend,
        } = plan;
        Self {
            container: Arc::new(ServiceController::container(container, deps.clone())),
            frontend: Arc::new(ServiceController::server(
                ServiceKind::Frontend,
                frontend,
                deps.clone(),
            )),
            backend: Arc::new(ServiceController::server(ServiceKind::Backend, backend, deps)),
        }
    }

    /// Controller driving `kind`.
    #[must_use]
    pub fn controller(&self, kind: ServiceKind) -> &Arc<ServiceController> {
        match kind {
            ServiceKind::Container => &self.container,
            ServiceKind::Frontend => &self.frontend,
            ServiceKind::Backend => &self.backend,
        }
    }

    /// Starts one service, blocking until its start sequence completes.
    pub fn start(&self, kind: ServiceKind) -> ServiceState {
        self.controller(kind).start()
    }

    /// Stops one service.
    pub fn stop(&self, kind: ServiceKind) -> ServiceState {
        self.controller(kind).stop()
    }

    /// Starts the container, then the frontend, then the backend.
    ///
    /// Each start runs to completion before the next begins. A failed service
    /// does not prevent the later ones from starting.
    pub fn start_all(&self) -> StatusSnapshot {
        info!(target: ORCHESTRATOR_TARGET, "starting all services");
        for kind in ServiceKind::ALL {
            let state = self.start(kind);
            debug!(target: ORCHESTRATOR_TARGET, service = %kind, %state, "start finished");
        }
        self.snapshot()
    }

    /// Stops the backend, then the frontend, then the container.
    ///
    /// Every controller is asked to stop whatever its state.
    pub fn stop_all(&self) -> StatusSnapshot {
        info!(target: ORCHESTRATOR_TARGET, "stopping all services");
        for kind in ServiceKind::ALL.into_iter().rev() {
            let state = self.stop(kind);
            debug!(target: ORCHESTRATOR_TARGET, service = %kind, %state, "stop finished");
        }
        self.snapshot()
    }

    /// Runs [`Self::start`] for `kind` on a worker thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the worker thread cannot be created.
    pub fn start_detached(&self, kind: ServiceKind) -> io::Result<JoinHandle<ServiceState>> {
        let controller = Arc::clone(self.controller(kind));
        thread::Builder::new()
            .name(format!("servinube-start-{kind}"))
            .spawn(move || controller.start())
    }

    /// Runs the [`Self::start_all`] sequence on a worker thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the worker thread cannot be created.
    pub fn start_all_detached(&self) -> io::Result<JoinHandle<StatusSnapshot>> {
        let controllers = [
            Arc::clone(&self.container),
            Arc::clone(&self.frontend),
            Arc::clone(&self.backend),
        ];
        thread::Builder::new()
            .name(String::from("servinube-start-all"))
            .spawn(move || {
                for controller in &controllers {
                    controller.start();
                }
                let [container, frontend, backend] = controllers;
                StatusSnapshot {
                    container: container.state(),
                    frontend: frontend.state(),
                    backend: backend.state(),
                    endpoints: frontend.endpoints(),
                }
            })
    }

    /// Current state of every service.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            container: self.container.state(),
            frontend: self.frontend.state(),
            backend: self.backend.state(),
            endpoints: self.frontend.endpoints(),
        }
    }

    /// Endpoints discovered for the frontend.
    #[must_use]
    pub fn frontend_endpoints(&self) -> Vec<String> {
        self.frontend.endpoints()
    }

    /// Stops every service and consumes the orchestrator.
    ///
    /// Dropping the orchestrator without calling this still terminates live
    /// server processes but leaves the container running.
    pub fn shutdown(self) -> StatusSnapshot {
        self.stop_all()
    }
}
