//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use servinube_config::ConfigError;
use thiserror::Error;

use crate::shutdown::ShutdownError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    #[error("failed to start worker thread: {0}")]
    Worker(io::Error),
    #[error("failed to read panel input: {0}")]
    ReadInput(io::Error),
}
