//! Production display backend over the X RandR extension
//!
//! One backend instance spans one operation (a reconcile or a capture);
//! callers connect fresh per operation so every run starts from current
//! server state, the same way the original daemon reconnected before each
//! apply. Screen geometry comes from the connection setup, which is read
//! at connect time.

use anyhow::{Context, Result, bail};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::randr::{self, ConnectionExt as RandrExt};
use x11rb::protocol::xproto::{ConnectionExt as XprotoExt, Timestamp, Window};
use x11rb::rust_connection::RustConnection;

use crate::backend::DisplayBackend;
use crate::topology::{
    Connection as OutputConnection, Controller, CrtcId, Mode, ModeId, Output, OutputId,
    ScreenGeometry, TopologySnapshot,
};

pub struct XrandrBackend {
    conn: RustConnection,
    root: Window,
    geometry: ScreenGeometry,
    /// RandR config timestamp from the most recent resource read; stale
    /// values make the server reject SetCrtcConfig.
    config_timestamp: Timestamp,
}

impl XrandrBackend {
    /// Open a fresh connection to the X server and negotiate RandR.
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) =
            x11rb::connect(None).context("failed to connect to X server")?;
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let geometry = ScreenGeometry {
            width: screen.width_in_pixels,
            height: screen.height_in_pixels,
            mm_width: u32::from(screen.width_in_millimeters),
            mm_height: u32::from(screen.height_in_millimeters),
        };

        let version = conn
            .randr_query_version(1, 3)
            .context("failed to query RandR version")?
            .reply()
            .context("RandR extension not available")?;
        debug!(
            screen = screen_num,
            major = version.major_version,
            minor = version.minor_version,
            "connected to X server with RandR"
        );

        Ok(Self {
            conn,
            root,
            geometry,
            config_timestamp: x11rb::CURRENT_TIME,
        })
    }
}

impl DisplayBackend for XrandrBackend {
    fn read_topology(&mut self) -> Result<TopologySnapshot> {
        let resources = self
            .conn
            .randr_get_screen_resources(self.root)
            .context("failed to request screen resources")?
            .reply()
            .context("failed to read screen resources")?;
        self.config_timestamp = resources.config_timestamp;

        // Mode names arrive as one concatenated byte string, length-prefixed
        // per mode in the ModeInfo list.
        let mut modes = Vec::with_capacity(resources.modes.len());
        let mut offset = 0usize;
        for info in &resources.modes {
            let len = usize::from(info.name_len);
            let name = String::from_utf8_lossy(&resources.names[offset..offset + len]).into_owned();
            offset += len;
            modes.push(Mode {
                id: info.id,
                name,
                width: info.width,
                height: info.height,
            });
        }

        let mut outputs = Vec::with_capacity(resources.outputs.len());
        for &output in &resources.outputs {
            let info = self
                .conn
                .randr_get_output_info(output, resources.config_timestamp)
                .with_context(|| format!("failed to request info for output {output}"))?
                .reply()
                .with_context(|| format!("failed to read info for output {output}"))?;
            let connection = if info.connection == randr::Connection::CONNECTED {
                OutputConnection::Connected
            } else if info.connection == randr::Connection::DISCONNECTED {
                OutputConnection::Disconnected
            } else {
                OutputConnection::Unknown
            };
            outputs.push(Output {
                id: output,
                name: String::from_utf8_lossy(&info.name).into_owned(),
                connection,
                modes: info.modes,
            });
        }

        let mut controllers = Vec::with_capacity(resources.crtcs.len());
        for &crtc in &resources.crtcs {
            let info = self
                .conn
                .randr_get_crtc_info(crtc, resources.config_timestamp)
                .with_context(|| format!("failed to request info for CRTC {crtc}"))?
                .reply()
                .with_context(|| format!("failed to read info for CRTC {crtc}"))?;
            controllers.push(Controller {
                id: crtc,
                x: info.x,
                y: info.y,
                mode: info.mode,
                rotation: u16::from(info.rotation),
                outputs: info.outputs,
            });
        }

        debug!(
            controllers = controllers.len(),
            outputs = outputs.len(),
            modes = modes.len(),
            "read display topology"
        );
        Ok(TopologySnapshot {
            controllers,
            outputs,
            modes,
            geometry: self.geometry,
        })
    }

    fn grab(&mut self) -> Result<()> {
        self.conn.grab_server().context("failed to grab server")?;
        self.conn.flush().context("failed to flush after grab")?;
        Ok(())
    }

    fn ungrab(&mut self) -> Result<()> {
        self.conn
            .ungrab_server()
            .context("failed to ungrab server")?;
        self.conn.flush().context("failed to flush after ungrab")?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        // A GetInputFocus round-trip forces the server to process
        // everything queued before it, the classic XSync.
        self.conn
            .get_input_focus()
            .context("failed to request sync round-trip")?
            .reply()
            .context("failed to complete sync round-trip")?;
        Ok(())
    }

    fn disable_controller(&mut self, controller: CrtcId) -> Result<()> {
        self.set_crtc(controller, 0, 0, x11rb::NONE, 1, &[])
    }

    fn set_screen_size(&mut self, geometry: &ScreenGeometry) -> Result<()> {
        self.conn
            .randr_set_screen_size(
                self.root,
                geometry.width,
                geometry.height,
                geometry.mm_width,
                geometry.mm_height,
            )
            .context("failed to request screen resize")?
            .check()
            .context("screen resize rejected")?;
        self.geometry = *geometry;
        Ok(())
    }

    fn enable_controller(
        &mut self,
        controller: CrtcId,
        x: i16,
        y: i16,
        mode: ModeId,
        rotation: u16,
        outputs: &[OutputId],
    ) -> Result<()> {
        self.set_crtc(controller, x, y, mode, rotation, outputs)
    }
}

impl XrandrBackend {
    fn set_crtc(
        &mut self,
        controller: CrtcId,
        x: i16,
        y: i16,
        mode: ModeId,
        rotation: u16,
        outputs: &[OutputId],
    ) -> Result<()> {
        let reply = self
            .conn
            .randr_set_crtc_config(
                controller,
                x11rb::CURRENT_TIME,
                self.config_timestamp,
                x,
                y,
                mode,
                randr::Rotation::from(rotation),
                outputs,
            )
            .with_context(|| format!("failed to request config for CRTC {controller}"))?
            .reply()
            .with_context(|| format!("failed to configure CRTC {controller}"))?;
        if reply.status != randr::SetConfig::SUCCESS {
            bail!(
                "server rejected config for CRTC {controller}: {:?}",
                reply.status
            );
        }
        Ok(())
    }
}
