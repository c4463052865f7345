//! Translation of static configuration into concrete commands.

use std::time::Duration;

use camino::Utf8PathBuf;
use servinube_config::Config;

use crate::command::CommandSpec;
use crate::process::ProcessSpec;

/// Commands and timings that drive the container service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerPlan {
    /// Starts the container.
    pub start: CommandSpec,
    /// Stops the container.
    pub stop: CommandSpec,
    /// Succeeds with `true` on stdout when the container is already running.
    pub running_probe: CommandSpec,
    /// Succeeds when the container runtime answers requests.
    pub runtime_probe: CommandSpec,
    /// Desktop application launched when the runtime is unreachable.
    pub launcher: ProcessSpec,
    /// Pause between runtime probes.
    pub interval: Duration,
    /// Upper bound on the runtime wait.
    pub timeout: Duration,
}

/// Long-running server driven by the package manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPlan {
    /// Launch configuration.
    pub spec: ProcessSpec,
    /// Port paired with hosts discovered in the output; `None` disables
    /// discovery.
    pub endpoint_port: Option<u16>,
}

/// Plans for the three managed services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePlan {
    /// Database container.
    pub container: ContainerPlan,
    /// Frontend dev/preview server.
    pub frontend: ServerPlan,
    /// Backend server.
    pub backend: ServerPlan,
}

impl ServicePlan {
    /// Derives every command from `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let cli = config.container_cli.as_str();
        let name = config.container_name.as_str();
        let launcher = config.runtime_launcher();
        let launcher_dir = launcher
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .map_or_else(|| Utf8PathBuf::from("."), ToOwned::to_owned);
        Self {
            container: ContainerPlan {
                start: CommandSpec::new(cli).args(["start", name]),
                stop: CommandSpec::new(cli).args(["stop", name]),
                running_probe: CommandSpec::new(cli).args([
                    "inspect",
                    "--format",
                    "{{.State.Running}}",
                    name,
                ]),
                runtime_probe: CommandSpec::new(cli).arg("info"),
                launcher: ProcessSpec::new(launcher.as_str(), launcher_dir),
                interval: config.readiness_interval(),
                timeout: config.readiness_timeout(),
            },
            frontend: ServerPlan {
                spec: ProcessSpec::new(
                    config.package_manager.as_str(),
                    config.frontend_project_path(),
                )
                .args(["run", config.frontend_script.as_str(), "--", "--host"])
                .capture_output(true),
                endpoint_port: Some(config.frontend_port),
            },
            backend: ServerPlan {
                spec: ProcessSpec::new(
                    config.package_manager.as_str(),
                    config.backend_project_path(),
                )
                .args(["run", config.backend_script.as_str()]),
                endpoint_port: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn default_configuration_targets_the_postgres_container() {
        let plan = ServicePlan::from_config(&Config::default());
        assert_eq!(plan.container.start.to_string(), "docker start postgres-db");
        assert_eq!(plan.container.stop.to_string(), "docker stop postgres-db");
        assert_eq!(plan.container.runtime_probe.to_string(), "docker info");
        assert_eq!(plan.container.interval, Duration::from_secs(2));
        assert_eq!(plan.container.timeout, Duration::from_secs(60));
    }

    #[rstest]
    fn only_the_frontend_captures_output() {
        let config = Config {
            frontend_project_path: Utf8PathBuf::from("/srv/web"),
            backend_project_path: Utf8PathBuf::from("/srv/web/backend"),
            ..Config::default()
        };
        let plan = ServicePlan::from_config(&config);
        assert!(plan.frontend.spec.captures_output());
        assert!(!plan.backend.spec.captures_output());
        assert_eq!(plan.frontend.spec.cwd(), "/srv/web");
        assert_eq!(plan.backend.spec.cwd(), "/srv/web/backend");
        assert_eq!(plan.frontend.endpoint_port, Some(4173));
        assert_eq!(plan.backend.endpoint_port, None);
        assert_eq!(plan.backend.spec.arguments(), ["run", "dev"]);
    }
}
