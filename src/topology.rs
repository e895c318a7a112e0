//! Live display topology model
//!
//! A `TopologySnapshot` is one coherent read of the display subsystem:
//! controllers (CRTCs), outputs, modes, and the virtual screen geometry.
//! Hardware handles are not stable across sessions, so profiles never store
//! them; every reconciliation rebuilds the name→handle mapping from a fresh
//! snapshot via the lookups below.

use serde::{Deserialize, Serialize};

pub type CrtcId = u32;
pub type OutputId = u32;
pub type ModeId = u32;

/// Mode handle value meaning "no mode set" on the wire
pub const MODE_NONE: ModeId = 0;

/// One scan-out pipeline (CRTC)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controller {
    pub id: CrtcId,
    pub x: i16,
    pub y: i16,
    /// Current mode handle, `MODE_NONE` when disabled
    pub mode: ModeId,
    /// X11 rotation bits
    pub rotation: u16,
    /// Outputs currently driven by this controller, in hardware order
    pub outputs: Vec<OutputId>,
}

/// Physical connector connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Connected,
    Disconnected,
    Unknown,
}

/// One physical connector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub id: OutputId,
    /// Human-readable connector name, stable across sessions ("eDP-1", "DP-2", ...)
    pub name: String,
    pub connection: Connection,
    /// Mode handles this output can be driven at
    pub modes: Vec<ModeId>,
}

/// One display timing mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mode {
    pub id: ModeId,
    /// Human-readable mode name, stable across sessions ("1920x1080", ...)
    pub name: String,
    pub width: u16,
    pub height: u16,
}

/// Total virtual screen size, in pixels and millimeters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenGeometry {
    pub width: u16,
    pub height: u16,
    pub mm_width: u32,
    pub mm_height: u32,
}

/// One coherent read of the full display topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologySnapshot {
    pub controllers: Vec<Controller>,
    pub outputs: Vec<Output>,
    pub modes: Vec<Mode>,
    pub geometry: ScreenGeometry,
}

/// Outcome of a single name→handle lookup against one snapshot.
///
/// `NotYetAvailable` and `NotFound` are distinguished for logging, but both
/// are retryable: right after a dock event an output can be listed but not
/// yet connected, or missing from the list entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<T> {
    Resolved(T),
    /// Present in the resource list but not usable yet (hardware settling)
    NotYetAvailable,
    /// Not in the resource list at all
    NotFound,
}

impl TopologySnapshot {
    /// Look up a connected output by connector name.
    pub fn find_connected_output(&self, name: &str) -> Lookup<OutputId> {
        match self.outputs.iter().find(|o| o.name == name) {
            Some(output) if output.connection == Connection::Connected => {
                Lookup::Resolved(output.id)
            }
            Some(_) => Lookup::NotYetAvailable,
            None => Lookup::NotFound,
        }
    }

    /// Look up a mode by name among the modes `output` itself reports as
    /// supported. A mode that exists globally but is not attached to this
    /// output's capability list does not count.
    pub fn find_mode_for_output(&self, output: OutputId, mode_name: &str) -> Lookup<ModeId> {
        let Some(output) = self.outputs.iter().find(|o| o.id == output) else {
            // The output vanished between lookups; let the settle window
            // bring it back.
            return Lookup::NotYetAvailable;
        };
        let mut seen_globally = false;
        for mode in self.modes.iter().filter(|m| m.name == mode_name) {
            seen_globally = true;
            if output.modes.contains(&mode.id) {
                return Lookup::Resolved(mode.id);
            }
        }
        if seen_globally {
            Lookup::NotYetAvailable
        } else {
            Lookup::NotFound
        }
    }

    /// Name of a mode handle, if the resource list describes it.
    pub fn mode_name(&self, mode: ModeId) -> Option<&str> {
        self.modes
            .iter()
            .find(|m| m.id == mode)
            .map(|m| m.name.as_str())
    }

    /// Name of an output handle, if the resource list describes it.
    pub fn output_name(&self, output: OutputId) -> Option<&str> {
        self.outputs
            .iter()
            .find(|o| o.id == output)
            .map(|o| o.name.as_str())
    }

    pub fn controller_ids(&self) -> Vec<CrtcId> {
        self.controllers.iter().map(|c| c.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TopologySnapshot {
        TopologySnapshot {
            controllers: vec![Controller {
                id: 60,
                x: 0,
                y: 0,
                mode: 81,
                rotation: 1,
                outputs: vec![70],
            }],
            outputs: vec![
                Output {
                    id: 70,
                    name: "eDP-1".into(),
                    connection: Connection::Connected,
                    modes: vec![81, 82],
                },
                Output {
                    id: 71,
                    name: "HDMI-1".into(),
                    connection: Connection::Disconnected,
                    modes: vec![82],
                },
            ],
            modes: vec![
                Mode {
                    id: 81,
                    name: "1920x1080".into(),
                    width: 1920,
                    height: 1080,
                },
                Mode {
                    id: 82,
                    name: "1280x720".into(),
                    width: 1280,
                    height: 720,
                },
            ],
            geometry: ScreenGeometry {
                width: 1920,
                height: 1080,
                mm_width: 310,
                mm_height: 170,
            },
        }
    }

    #[test]
    fn connected_output_resolves() {
        assert_eq!(sample().find_connected_output("eDP-1"), Lookup::Resolved(70));
    }

    #[test]
    fn disconnected_output_is_not_yet_available() {
        assert_eq!(
            sample().find_connected_output("HDMI-1"),
            Lookup::NotYetAvailable
        );
    }

    #[test]
    fn absent_output_is_not_found() {
        assert_eq!(sample().find_connected_output("DP-3"), Lookup::NotFound);
    }

    #[test]
    fn mode_resolves_only_from_the_outputs_own_list() {
        let topo = sample();
        assert_eq!(topo.find_mode_for_output(70, "1920x1080"), Lookup::Resolved(81));
        // 1920x1080 exists globally but HDMI-1 does not support it
        assert_eq!(
            topo.find_mode_for_output(71, "1920x1080"),
            Lookup::NotYetAvailable
        );
        assert_eq!(topo.find_mode_for_output(70, "640x480"), Lookup::NotFound);
    }

    #[test]
    fn mode_lookup_for_vanished_output_waits() {
        assert_eq!(
            sample().find_mode_for_output(99, "1920x1080"),
            Lookup::NotYetAvailable
        );
    }
}
