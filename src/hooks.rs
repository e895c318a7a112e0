//! Dock hook execution
//!
//! After a successful reconciliation the matching hook script runs, if it
//! exists. Hooks are user extension points (rewiring audio, restarting
//! compositors); their failures are logged and never propagated.

use std::path::Path;
use std::process::Command;

use tracing::{error, info};

use crate::constants::paths;
use crate::dock::DockState;

pub fn run_hook(state: DockState) {
    let script = match state {
        DockState::Docked => paths::DOCK_HOOK,
        DockState::Undocked => paths::UNDOCK_HOOK,
    };

    if !Path::new(script).exists() {
        info!(script = %script, "no hook script, skipping");
        return;
    }

    match Command::new(script).status() {
        Ok(status) if status.success() => {
            info!(script = %script, "hook finished");
        }
        Ok(status) => {
            error!(script = %script, code = ?status.code(), "hook exited non-zero");
        }
        Err(e) => {
            error!(script = %script, error = %e, "failed to execute hook");
        }
    }
}
