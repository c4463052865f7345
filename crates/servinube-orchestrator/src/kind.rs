//! Service identities and lifecycle states.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Services managed by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceKind {
    /// The database container run by the container runtime.
    Container,
    /// The frontend dev/preview server.
    Frontend,
    /// The backend server.
    Backend,
}

impl ServiceKind {
    /// Every kind, in start-all order.
    pub const ALL: [Self; 3] = [Self::Container, Self::Frontend, Self::Backend];
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Container => "container",
            Self::Frontend => "frontend",
            Self::Backend => "backend",
        };
        formatter.write_str(label)
    }
}

/// Error returned when parsing a service kind fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown service: {0}")]
pub struct ServiceKindParseError(String);

impl ServiceKindParseError {
    /// Returns the offending value.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for ServiceKind {
    type Err = ServiceKindParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "container" | "docker" | "database" | "db" => Ok(Self::Container),
            "frontend" | "web" => Ok(Self::Frontend),
            "backend" | "api" => Ok(Self::Backend),
            other => Err(ServiceKindParseError(other.to_owned())),
        }
    }
}

/// Lifecycle state of a single service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ServiceState {
    /// Not running.
    #[default]
    Stopped,
    /// Start sequence in progress.
    Starting,
    /// Start sequence completed.
    Running,
    /// Stop sequence in progress.
    Stopping,
    /// The last start attempt failed.
    Failed,
}

impl ServiceState {
    /// Returns `true` while a start is in flight or has completed.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    /// Returns `true` for states from which `stop` has nothing to do.
    #[must_use]
    pub const fn is_inert(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Failed => "failed",
        };
        formatter.write_str(label)
    }
}
