//! Three-phase transactional apply
//!
//! Under a server grab: disable every controller, resize the virtual
//! screen, then re-enable the controllers that have a target mode. Each
//! phase ends with a sync point because the next phase depends on the
//! previous one having landed (a controller cannot take a mode that
//! exceeds the not-yet-resized screen).
//!
//! There is no rollback. A failure mid-enable can leave controllers in a
//! mixed state; the disable phase is idempotent, so the next
//! reconciliation starts clean and self-heals.

use tracing::{error, info};

use crate::backend::DisplayBackend;
use crate::error::ReconcileError;
use crate::resolve::{ResolvedController, Target};
use crate::topology::ScreenGeometry;

/// Apply a fully resolved configuration to the hardware.
pub fn apply_resolved<B: DisplayBackend>(
    backend: &mut B,
    resolved: &[ResolvedController],
    geometry: &ScreenGeometry,
) -> Result<(), ReconcileError> {
    backend
        .grab()
        .map_err(|e| apply_err("grab", e))?;

    let result = run_phases(backend, resolved, geometry);

    // The grab must be released on every path or the server stays locked.
    let ungrab = backend.ungrab().map_err(|e| apply_err("ungrab", e));
    if let Err(e) = &result {
        error!(error = %e, "apply failed, state may be partially applied");
    }
    result.and(ungrab)
}

fn run_phases<B: DisplayBackend>(
    backend: &mut B,
    resolved: &[ResolvedController],
    geometry: &ScreenGeometry,
) -> Result<(), ReconcileError> {
    // Phase 1: disable everything, including controllers about to be
    // re-enabled, so nothing references a mode while the screen resizes.
    for config in resolved {
        info!(controller = config.controller, "disabling controller");
        backend
            .disable_controller(config.controller)
            .map_err(|e| apply_err("disable", e))?;
    }
    backend.sync().map_err(|e| apply_err("disable", e))?;

    // Phase 2: one screen resize.
    info!(
        width = geometry.width,
        height = geometry.height,
        mm_width = geometry.mm_width,
        mm_height = geometry.mm_height,
        "setting screen size"
    );
    backend
        .set_screen_size(geometry)
        .map_err(|e| apply_err("resize", e))?;
    backend.sync().map_err(|e| apply_err("resize", e))?;

    // Phase 3: re-enable controllers with a target mode.
    for config in resolved {
        let Target::On {
            x,
            y,
            mode,
            rotation,
            ref outputs,
        } = config.target
        else {
            continue;
        };
        info!(
            controller = config.controller,
            mode = mode,
            outputs = outputs.len(),
            x = x,
            y = y,
            "enabling controller"
        );
        backend
            .enable_controller(config.controller, x, y, mode, rotation, outputs)
            .map_err(|e| apply_err("enable", e))?;
    }
    backend.sync().map_err(|e| apply_err("enable", e))
}

fn apply_err(phase: &'static str, source: anyhow::Error) -> ReconcileError {
    ReconcileError::Apply { phase, source }
}
