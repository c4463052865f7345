//! Start and stop sequences of the database container.

use tracing::{debug, info, warn};

use super::{CONTROLLER_TARGET, Collaborators};
use crate::command::{CommandOutput, CommandSpec};
use crate::error::ServiceError;
use crate::kind::ServiceKind;
use crate::plan::ContainerPlan;
use crate::readiness::ReadinessWaiter;

const KIND: ServiceKind = ServiceKind::Container;

/// Ensures the container is running.
///
/// A container that is already running needs no work. Otherwise the runtime
/// is probed and, when unreachable, its desktop launcher is spawned and the
/// runtime is polled until ready. The container is then started.
pub(super) fn start(plan: &ContainerPlan, deps: &Collaborators) -> Result<(), ServiceError> {
    if container_running(plan, deps) {
        info!(
            target: CONTROLLER_TARGET,
            service = %KIND,
            "container already running"
        );
        return Ok(());
    }
    if !probe(&plan.runtime_probe, deps) {
        launch_runtime(plan, deps);
        let waiter = ReadinessWaiter::new(deps.clock.as_ref());
        let ready = waiter.wait_until_ready(
            || probe(&plan.runtime_probe, deps),
            plan.interval,
            plan.timeout,
        );
        if !ready {
            return Err(ServiceError::ReadinessTimeout {
                timeout: plan.timeout,
            });
        }
        info!(target: CONTROLLER_TARGET, "container runtime ready");
    }
    let output = run(&plan.start, deps)?;
    if !output.success() {
        return Err(ServiceError::CommandExit {
            command: plan.start.to_string(),
            code: output.exit_code,
            stderr: output.stderr.trim().to_owned(),
        });
    }
    Ok(())
}

/// Stops the container, ignoring every failure.
pub(super) fn stop(plan: &ContainerPlan, deps: &Collaborators) {
    match deps.runner.run(&plan.stop) {
        Ok(output) if output.success() => {
            debug!(target: CONTROLLER_TARGET, service = %KIND, "container stopped");
        }
        Ok(output) => warn!(
            target: CONTROLLER_TARGET,
            service = %KIND,
            code = ?output.exit_code,
            stderr = output.stderr.trim(),
            "container stop reported failure; ignoring"
        ),
        Err(error) => warn!(
            target: CONTROLLER_TARGET,
            service = %KIND,
            error = %error,
            "container stop could not run; ignoring"
        ),
    }
}

fn container_running(plan: &ContainerPlan, deps: &Collaborators) -> bool {
    deps.runner
        .run(&plan.running_probe)
        .is_ok_and(|output| output.success() && output.stdout.trim() == "true")
}

fn probe(spec: &CommandSpec, deps: &Collaborators) -> bool {
    match deps.runner.run(spec) {
        Ok(output) => output.success(),
        Err(error) => {
            debug!(
                target: CONTROLLER_TARGET,
                command = %spec,
                error = %error,
                "readiness probe could not run"
            );
            false
        }
    }
}

/// Spawns the runtime's launcher and lets it outlive the engine.
fn launch_runtime(plan: &ContainerPlan, deps: &Collaborators) {
    match deps.launcher.spawn(&plan.launcher) {
        Ok(process) => info!(
            target: CONTROLLER_TARGET,
            pid = process.id(),
            launcher = %plan.launcher,
            "container runtime launcher started"
        ),
        Err(error) => warn!(
            target: CONTROLLER_TARGET,
            launcher = %plan.launcher,
            error = %error,
            "failed to launch container runtime; waiting anyway"
        ),
    }
}

fn run(spec: &CommandSpec, deps: &Collaborators) -> Result<CommandOutput, ServiceError> {
    deps.runner
        .run(spec)
        .map_err(|source| ServiceError::Command { kind: KIND, source })
}
