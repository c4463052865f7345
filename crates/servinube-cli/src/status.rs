//! `servinube status`: describe the configured stack without starting it.

use std::io::Write;
use std::process::ExitCode;

use servinube_config::Config;
use servinube_orchestrator::{CommandRunner, CommandSpec, ServicePlan};

use crate::output::SharedWriter;

pub(crate) fn run<W: Write>(
    config: &Config,
    output: &SharedWriter<W>,
    runner: &dyn CommandRunner,
) -> ExitCode {
    let plan = ServicePlan::from_config(config);
    let reachable = succeeds(runner, &plan.container.runtime_probe, |_| true);
    let running = reachable
        && succeeds(runner, &plan.container.running_probe, |stdout| {
            stdout.trim() == "true"
        });

    let runtime = if reachable { "reachable" } else { "unreachable" };
    let container = if running { "running" } else { "not running" };
    output.line(format_args!(
        "container  {} ({container}); runtime {runtime} via {}",
        config.container_name, config.container_cli
    ));
    output.line(format_args!(
        "frontend   {} in {} (port {})",
        plan.frontend.spec,
        plan.frontend.spec.cwd(),
        config.frontend_port
    ));
    output.line(format_args!(
        "backend    {} in {}",
        plan.backend.spec,
        plan.backend.spec.cwd()
    ));
    ExitCode::SUCCESS
}

fn succeeds<F>(runner: &dyn CommandRunner, spec: &CommandSpec, accept: F) -> bool
where
    F: FnOnce(&str) -> bool,
{
    runner
        .run(spec)
        .is_ok_and(|output| output.success() && accept(&output.stdout))
}
