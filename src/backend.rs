//! Display backend seam
//!
//! Everything the engine needs from the display subsystem goes through this
//! trait: one full topology read plus the five primitives of the apply
//! transaction. The production implementation is `xrandr::XrandrBackend`;
//! tests drive the engine against `fake::FakeBackend`.

use anyhow::Result;

use crate::topology::{CrtcId, ModeId, OutputId, ScreenGeometry, TopologySnapshot};

pub trait DisplayBackend {
    /// Read the full current topology. Called fresh at the start of every
    /// operation and before every settle-retry; snapshots are never reused
    /// across calls.
    fn read_topology(&mut self) -> Result<TopologySnapshot>;

    /// Enter the exclusive-access scope for the apply transaction.
    fn grab(&mut self) -> Result<()>;

    /// Leave the exclusive-access scope.
    fn ungrab(&mut self) -> Result<()>;

    /// Block until the subsystem has processed all previous requests.
    /// Phases have strict data dependencies, so one of these follows each.
    fn sync(&mut self) -> Result<()>;

    /// Clear a controller's configuration (no mode, no outputs, origin 0,0).
    fn disable_controller(&mut self, controller: CrtcId) -> Result<()>;

    /// Set the virtual screen pixel and physical dimensions.
    fn set_screen_size(&mut self, geometry: &ScreenGeometry) -> Result<()>;

    /// Program a controller with position, mode, rotation, and outputs.
    fn enable_controller(
        &mut self,
        controller: CrtcId,
        x: i16,
        y: i16,
        mode: ModeId,
        rotation: u16,
        outputs: &[OutputId],
    ) -> Result<()>;
}
