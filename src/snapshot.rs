//! Topology capture
//!
//! The inverse of reconciliation: turn the live topology into a `Profile`
//! keyed entirely on names, ready for persistence. Persisting is the
//! store's job; this module only builds the profile.

use tracing::info;

use crate::constants::profile as sentinel;
use crate::error::ReconcileError;
use crate::profile::{ControllerEntry, Profile};
use crate::topology::{MODE_NONE, TopologySnapshot};

/// Build a profile from one live topology snapshot.
pub fn capture_profile(topology: &TopologySnapshot) -> Result<Profile, ReconcileError> {
    let mut entries = Vec::with_capacity(topology.controllers.len());

    for controller in &topology.controllers {
        let mode = if controller.mode == MODE_NONE {
            sentinel::MODE_OFF.to_string()
        } else {
            topology
                .mode_name(controller.mode)
                .ok_or(ReconcileError::UnnamedMode {
                    controller: controller.id,
                    mode: controller.mode,
                })?
                .to_string()
        };

        let mut outputs = Vec::with_capacity(controller.outputs.len());
        for &output in &controller.outputs {
            let name = topology
                .output_name(output)
                .ok_or(ReconcileError::UnknownOutput {
                    controller: controller.id,
                    output,
                })?;
            outputs.push(name.to_string());
        }

        info!(
            controller = controller.id,
            mode = %mode,
            outputs = outputs.len(),
            "captured controller"
        );
        entries.push(ControllerEntry {
            controller_id: controller.id,
            x: controller.x,
            y: controller.y,
            rotation: controller.rotation,
            mode,
            outputs,
        });
    }

    Ok(Profile {
        screen: topology.geometry,
        controllers: entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Connection, Controller, Mode, Output, ScreenGeometry};
    use crate::validate::validate_profile;

    fn sample() -> TopologySnapshot {
        TopologySnapshot {
            controllers: vec![
                Controller {
                    id: 63,
                    x: 0,
                    y: 0,
                    mode: 81,
                    rotation: 1,
                    outputs: vec![70],
                },
                Controller {
                    id: 64,
                    x: 0,
                    y: 0,
                    mode: MODE_NONE,
                    rotation: 1,
                    outputs: vec![],
                },
            ],
            outputs: vec![Output {
                id: 70,
                name: "eDP-1".into(),
                connection: Connection::Connected,
                modes: vec![81],
            }],
            modes: vec![Mode {
                id: 81,
                name: "1920x1080".into(),
                width: 1920,
                height: 1080,
            }],
            geometry: ScreenGeometry {
                width: 1920,
                height: 1080,
                mm_width: 310,
                mm_height: 170,
            },
        }
    }

    #[test]
    fn capture_records_names_and_sentinel() {
        let profile = capture_profile(&sample()).unwrap();
        assert_eq!(profile.controllers.len(), 2);

        let active = &profile.controllers[0];
        assert_eq!(active.controller_id, 63);
        assert_eq!(active.mode, "1920x1080");
        assert_eq!(active.outputs, vec!["eDP-1".to_string()]);

        let off = &profile.controllers[1];
        assert_eq!(off.mode, "None");
        assert!(off.outputs.is_empty());
        assert!(off.is_off());
    }

    #[test]
    fn capture_validates_against_its_own_topology() {
        let topology = sample();
        let profile = capture_profile(&topology).unwrap();
        assert!(validate_profile(&profile, &topology).is_ok());
    }

    #[test]
    fn unnameable_mode_is_an_error() {
        let mut topology = sample();
        topology.modes.clear();
        assert!(matches!(
            capture_profile(&topology),
            Err(ReconcileError::UnnamedMode {
                controller: 63,
                mode: 81
            })
        ));
    }

    #[test]
    fn unknown_output_is_an_error() {
        let mut topology = sample();
        topology.outputs.clear();
        assert!(matches!(
            capture_profile(&topology),
            Err(ReconcileError::UnknownOutput {
                controller: 63,
                output: 70
            })
        ));
    }
}
