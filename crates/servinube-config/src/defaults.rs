use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Container started and stopped by the panel.
pub const DEFAULT_CONTAINER_NAME: &str = "postgres-db";

/// Container-runtime CLI used for one-shot commands.
pub const DEFAULT_CONTAINER_CLI: &str = "docker";

/// Package manager that drives the frontend and backend servers.
///
/// Windows installs npm as a `.cmd` shim, which process spawning only finds
/// under its full file name.
#[cfg(windows)]
pub const DEFAULT_PACKAGE_MANAGER: &str = "npm.cmd";

/// Package manager that drives the frontend and backend servers.
#[cfg(not(windows))]
pub const DEFAULT_PACKAGE_MANAGER: &str = "npm";

/// Port served by the frontend preview server.
pub const DEFAULT_FRONTEND_PORT: u16 = 4173;

/// Interval between container-runtime readiness probes.
pub const DEFAULT_READINESS_INTERVAL_MS: u64 = 2_000;

/// Upper bound on the container-runtime readiness wait.
pub const DEFAULT_READINESS_TIMEOUT_MS: u64 = 60_000;

/// Default log filter expression.
pub fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Frontend project directory, relative to the working directory.
pub fn default_frontend_project_path() -> Utf8PathBuf {
    Utf8PathBuf::from(".")
}

/// Backend project directory, relative to the working directory.
pub fn default_backend_project_path() -> Utf8PathBuf {
    Utf8PathBuf::from("backend")
}

/// Default container identifier.
pub fn default_container_name() -> String {
    DEFAULT_CONTAINER_NAME.to_owned()
}

/// Default container-runtime CLI.
pub fn default_container_cli() -> String {
    DEFAULT_CONTAINER_CLI.to_owned()
}

/// Default package manager executable.
pub fn default_package_manager() -> String {
    DEFAULT_PACKAGE_MANAGER.to_owned()
}

/// Script run by the package manager for the frontend.
pub fn default_frontend_script() -> String {
    "preview".to_owned()
}

/// Script run by the package manager for the backend.
pub fn default_backend_script() -> String {
    "dev".to_owned()
}

/// Default frontend port.
pub fn default_frontend_port() -> u16 {
    DEFAULT_FRONTEND_PORT
}

/// Default readiness poll interval in milliseconds.
pub fn default_readiness_interval_ms() -> u64 {
    DEFAULT_READINESS_INTERVAL_MS
}

/// Default readiness timeout in milliseconds.
pub fn default_readiness_timeout_ms() -> u64 {
    DEFAULT_READINESS_TIMEOUT_MS
}

/// Location of the container runtime's desktop application.
pub fn default_runtime_launcher() -> Utf8PathBuf {
    Utf8PathBuf::from(runtime_launcher_path())
}

#[cfg(target_os = "windows")]
const fn runtime_launcher_path() -> &'static str {
    r"C:\Program Files\Docker\Docker\Docker Desktop.exe"
}

#[cfg(target_os = "macos")]
const fn runtime_launcher_path() -> &'static str {
    "/Applications/Docker.app/Contents/MacOS/Docker Desktop"
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const fn runtime_launcher_path() -> &'static str {
    "/opt/docker-desktop/bin/docker-desktop"
}
