//! Start and stop sequences of long-running servers.

use std::sync::Arc;

use tracing::{info, warn};

use super::{CONTROLLER_TARGET, Collaborators, LiveProcess, SCANNER_GRACE};
use crate::error::ServiceError;
use crate::kind::ServiceKind;
use crate::plan::ServerPlan;
use crate::scanner::{EndpointScanner, ScannerTask};

pub(super) fn start(
    kind: ServiceKind,
    plan: &ServerPlan,
    endpoints: Option<&EndpointScanner>,
    deps: &Collaborators,
) -> Result<LiveProcess, ServiceError> {
    let mut process = deps
        .launcher
        .spawn(&plan.spec)
        .map_err(|source| ServiceError::Spawn { kind, source })?;
    info!(
        target: CONTROLLER_TARGET,
        service = %kind,
        pid = process.id(),
        "server started"
    );
    let scanner = match (process.take_lines(), endpoints) {
        (Some(lines), Some(endpoints)) => {
            match ScannerTask::spawn(kind, lines, endpoints.clone(), Arc::clone(&deps.observer)) {
                Ok(task) => Some(task),
                Err(error) => {
                    warn!(
                        target: CONTROLLER_TARGET,
                        service = %kind,
                        error = %error,
                        "failed to start output scanner; output is discarded"
                    );
                    None
                }
            }
        }
        _ => None,
    };
    Ok(LiveProcess { process, scanner })
}

pub(super) fn stop(
    kind: ServiceKind,
    live: Option<LiveProcess>,
    endpoints: Option<&EndpointScanner>,
    deps: &Collaborators,
) {
    if let Some(LiveProcess {
        mut process,
        scanner,
    }) = live
    {
        if let Err(error) = process.terminate() {
            warn!(
                target: CONTROLLER_TARGET,
                service = %kind,
                pid = error.pid,
                error = %error,
                "failed to terminate server; discarding handle"
            );
            deps.observer.on_error(kind, &error.to_string());
        }
        if let Some(scanner) = scanner {
            scanner.cancel(SCANNER_GRACE);
        }
    }
    if endpoints.is_some_and(EndpointScanner::clear) {
        deps.observer.on_endpoints_updated(kind, &[]);
    }
}
