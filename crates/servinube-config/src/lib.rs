//! Shared configuration for the ServiNube control panel.
//!
//! Configuration is layered by `ortho_config`: built-in defaults are
//! overridden by an optional TOML file (`--config-path`), then by
//! `SERVINUBE_*` environment variables, and finally by command-line flags.
//! The resolved [`Config`] is static for the lifetime of the orchestrator.

mod defaults;
mod logging;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_CONTAINER_CLI, DEFAULT_CONTAINER_NAME, DEFAULT_FRONTEND_PORT, DEFAULT_LOG_FILTER,
    DEFAULT_PACKAGE_MANAGER, DEFAULT_READINESS_INTERVAL_MS, DEFAULT_READINESS_TIMEOUT_MS,
    default_backend_project_path, default_backend_script, default_container_cli,
    default_container_name, default_frontend_port, default_frontend_project_path,
    default_frontend_script, default_log_filter, default_log_format, default_package_manager,
    default_readiness_interval_ms, default_readiness_timeout_ms, default_runtime_launcher,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Flags accepted by the configuration loader.
///
/// Binaries that mix configuration flags with their own command tokens use
/// this list to decide which arguments to forward to [`Config::load_from_iter`].
pub const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--frontend-project-path",
    "--backend-project-path",
    "--container-name",
    "--container-cli",
    "--runtime-launcher",
    "--package-manager",
    "--frontend-script",
    "--backend-script",
    "--frontend-port",
    "--readiness-interval-ms",
    "--readiness-timeout-ms",
    "--log-filter",
    "--log-format",
];

/// Static configuration consumed by the orchestrator and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SERVINUBE")]
pub struct Config {
    /// Working directory of the frontend dev/preview server.
    #[serde(default = "default_frontend_project_path")]
    #[ortho_config(default = default_frontend_project_path())]
    pub frontend_project_path: Utf8PathBuf,
    /// Working directory of the backend server.
    #[serde(default = "default_backend_project_path")]
    #[ortho_config(default = default_backend_project_path())]
    pub backend_project_path: Utf8PathBuf,
    /// Identifier of the database container.
    #[serde(default = "default_container_name")]
    #[ortho_config(default = default_container_name())]
    pub container_name: String,
    /// Container-runtime CLI used for start, stop, and probe commands.
    #[serde(default = "default_container_cli")]
    #[ortho_config(default = default_container_cli())]
    pub container_cli: String,
    /// Desktop application launched when the container runtime is down.
    #[serde(default = "default_runtime_launcher")]
    #[ortho_config(default = default_runtime_launcher())]
    pub runtime_launcher: Utf8PathBuf,
    /// Package manager executable driving both servers.
    #[serde(default = "default_package_manager")]
    #[ortho_config(default = default_package_manager())]
    pub package_manager: String,
    /// Package script serving the frontend.
    #[serde(default = "default_frontend_script")]
    #[ortho_config(default = default_frontend_script())]
    pub frontend_script: String,
    /// Package script serving the backend.
    #[serde(default = "default_backend_script")]
    #[ortho_config(default = default_backend_script())]
    pub backend_script: String,
    /// Port appended to hosts discovered in the frontend output.
    #[serde(default = "default_frontend_port")]
    #[ortho_config(default = default_frontend_port())]
    pub frontend_port: u16,
    /// Interval between container-runtime readiness probes.
    #[serde(default = "default_readiness_interval_ms")]
    #[ortho_config(default = default_readiness_interval_ms())]
    pub readiness_interval_ms: u64,
    /// Maximum time spent waiting for the container runtime.
    #[serde(default = "default_readiness_timeout_ms")]
    #[ortho_config(default = default_readiness_timeout_ms())]
    pub readiness_timeout_ms: u64,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter")]
    #[ortho_config(default = default_log_filter())]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frontend_project_path: default_frontend_project_path(),
            backend_project_path: default_backend_project_path(),
            container_name: default_container_name(),
            container_cli: default_container_cli(),
            runtime_launcher: default_runtime_launcher(),
            package_manager: default_package_manager(),
            frontend_script: default_frontend_script(),
            backend_script: default_backend_script(),
            frontend_port: default_frontend_port(),
            readiness_interval_ms: default_readiness_interval_ms(),
            readiness_timeout_ms: default_readiness_timeout_ms(),
            log_filter: default_log_filter(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Frontend working directory.
    #[must_use]
    pub fn frontend_project_path(&self) -> &Utf8Path {
        self.frontend_project_path.as_path()
    }

    /// Backend working directory.
    #[must_use]
    pub fn backend_project_path(&self) -> &Utf8Path {
        self.backend_project_path.as_path()
    }

    /// Container-runtime desktop launcher.
    #[must_use]
    pub fn runtime_launcher(&self) -> &Utf8Path {
        self.runtime_launcher.as_path()
    }

    /// Interval between readiness probes.
    #[must_use]
    pub const fn readiness_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_interval_ms)
    }

    /// Upper bound on the readiness wait.
    #[must_use]
    pub const fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    /// Filter expression handed to the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Configured log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Rejects configurations that cannot drive the services.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required command is blank or the
    /// readiness interval is zero or longer than the timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("container_name", &self.container_name)?;
        require_non_empty("container_cli", &self.container_cli)?;
        require_non_empty("package_manager", &self.package_manager)?;
        require_non_empty("frontend_script", &self.frontend_script)?;
        require_non_empty("backend_script", &self.backend_script)?;
        if self.readiness_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.readiness_interval_ms > self.readiness_timeout_ms {
            return Err(ConfigError::IntervalExceedsTimeout {
                interval_ms: self.readiness_interval_ms,
                timeout_ms: self.readiness_timeout_ms,
            });
        }
        Ok(())
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Empty { field });
    }
    Ok(())
}

/// Errors raised when a loaded configuration is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required string setting was blank.
    #[error("configuration field '{field}' must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The readiness poll interval was zero.
    #[error("readiness_interval_ms must be greater than zero")]
    ZeroInterval,
    /// The readiness poll interval was longer than the timeout.
    #[error("readiness interval ({interval_ms} ms) exceeds readiness timeout ({timeout_ms} ms)")]
    IntervalExceedsTimeout {
        /// Configured interval.
        interval_ms: u64,
        /// Configured timeout.
        timeout_ms: u64,
    },
}
