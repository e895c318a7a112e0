//! Error taxonomy for reconciliation and snapshot operations
//!
//! Everything up to and including resolution fails fast with no hardware
//! mutation performed. Only `Apply` can leave partial state behind; that is
//! logged and surfaced, never rolled back.

use std::path::PathBuf;

use crate::dock::DockState;
use crate::topology::{CrtcId, ModeId, OutputId};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The display subsystem could not be reached or answered with a
    /// protocol error during a read. Fatal to the calling operation.
    #[error("display subsystem error: {0}")]
    Io(#[source] anyhow::Error),

    /// No profile exists for the requested dock state.
    #[error("no {state} profile at {path:?}")]
    ConfigMissing { state: DockState, path: PathBuf },

    /// A profile exists but could not be parsed.
    #[error("failed to parse profile {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// A profile could not be written back to disk.
    #[error("failed to write profile {path:?}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The profile's recorded controller set no longer matches the live
    /// controller set. The profile is stale and must be re-captured.
    #[error("controller set changed: live {live:?}, profile {recorded:?}; re-run `dockd config`")]
    ConfigInvalid {
        live: Vec<CrtcId>,
        recorded: Vec<CrtcId>,
    },

    /// A named output never appeared among the connected outputs within
    /// the settle-retry window.
    #[error("output {output:?} not found after {attempts} attempts")]
    OutputNotFound { output: String, attempts: u32 },

    /// A named mode never appeared in the output's supported-mode list
    /// within the settle-retry window.
    #[error("mode {mode:?} not found for output {output:?} after {attempts} attempts")]
    ModeNotFound {
        mode: String,
        output: String,
        attempts: u32,
    },

    /// Two outputs on one controller entry resolved to different mode
    /// handles. A controller drives exactly one mode.
    #[error("mode mismatch on controller {controller}: output {output:?} wants a different mode")]
    ModeMismatch { controller: CrtcId, output: String },

    /// A hardware mutation call failed mid-apply. State may be partially
    /// applied; the next reconciliation starts from a full disable and
    /// self-heals.
    #[error("apply failed during {phase} phase: {source}")]
    Apply {
        phase: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Snapshot found a controller driving a mode the resource list
    /// cannot name. Such a profile could never be re-resolved.
    #[error("no name for mode {mode} on controller {controller}")]
    UnnamedMode { controller: CrtcId, mode: ModeId },

    /// Snapshot found a controller referencing an output the resource
    /// list does not describe.
    #[error("no info for output {output} on controller {controller}")]
    UnknownOutput { controller: CrtcId, output: OutputId },
}
