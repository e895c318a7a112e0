//! Structural profile validation
//!
//! Controller handles change when the kernel driver or hardware
//! configuration changes between saves. A profile whose recorded controller
//! set no longer matches the live set is stale and must not be applied:
//! missing or extra controllers would leave hardware half-configured.

use std::collections::BTreeSet;

use tracing::error;

use crate::error::ReconcileError;
use crate::profile::Profile;
use crate::topology::TopologySnapshot;

/// Require an exact structural match between the profile's recorded
/// controller ids and the live controller ids.
pub fn validate_profile(
    profile: &Profile,
    topology: &TopologySnapshot,
) -> Result<(), ReconcileError> {
    let live: BTreeSet<_> = topology.controller_ids().into_iter().collect();
    let recorded: BTreeSet<_> = profile.recorded_controller_ids().into_iter().collect();

    if profile.controllers.len() != topology.controllers.len()
        || recorded.len() != live.len()
        || !live.is_subset(&recorded)
    {
        error!(
            live = ?live,
            recorded = ?recorded,
            "controller set changed since capture, refusing to apply"
        );
        return Err(ReconcileError::ConfigInvalid {
            live: live.into_iter().collect(),
            recorded: recorded.into_iter().collect(),
        });
    }
    Ok(())
}
