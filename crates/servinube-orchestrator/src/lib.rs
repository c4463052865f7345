//! Lifecycle orchestration of the local development stack.
//!
//! The [`Orchestrator`] owns one [`ServiceController`] per
//! [`ServiceKind`]: the database container, the frontend server and the
//! backend server. Controllers run one-shot commands through a
//! [`CommandRunner`], spawn long-running children through a
//! [`ProcessLauncher`], and report every state change, output line,
//! endpoint update and error to a [`ServiceObserver`].
//!
//! Commands are derived once from a [`servinube_config::Config`] by
//! [`ServicePlan::from_config`]; nothing is re-read afterwards.

pub mod command;
pub mod controller;
pub mod error;
pub mod kind;
pub mod observer;
pub mod orchestrator;
pub mod plan;
pub mod process;
pub mod readiness;
pub mod scanner;

pub use command::{CommandOutput, CommandRunner, CommandSpec, SystemCommandRunner};
pub use controller::{Collaborators, SCANNER_GRACE, ServiceController};
pub use error::{CommandError, ServiceError, SpawnError, TerminateError};
pub use kind::{ServiceKind, ServiceKindParseError, ServiceState};
pub use observer::{FanOutObserver, ServiceObserver, StructuredObserver};
pub use orchestrator::{Orchestrator, StatusSnapshot};
pub use plan::{ContainerPlan, ServerPlan, ServicePlan};
pub use process::{
    LineStream, ManagedProcess, ProcessLauncher, ProcessSpec, SystemProcess,
    SystemProcessLauncher,
};
pub use readiness::{Clock, ReadinessDeadline, ReadinessWaiter, SystemClock};
pub use scanner::{EndpointScanner, ScannerTask, extract_host};

#[cfg(test)]
mod tests;
