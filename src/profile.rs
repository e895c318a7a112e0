//! Persisted profiles and the on-disk store
//!
//! One TOML document per dock state: a `[screen]` table plus repeated
//! `[[controller]]` entries, one per live controller at capture time.
//! Controllers are recorded by id only to detect staleness; outputs and
//! modes are recorded by name and re-resolved against live handles on every
//! reconciliation. Each capture overwrites the whole file for its state.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::{paths, profile as sentinel};
use crate::dock::DockState;
use crate::error::ReconcileError;
use crate::topology::{CrtcId, ScreenGeometry};

/// One persisted controller configuration.
///
/// An empty output list (or the `"None"` mode sentinel) means the
/// controller is to be disabled; otherwise every listed output must resolve
/// to one common mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerEntry {
    pub controller_id: CrtcId,
    pub x: i16,
    pub y: i16,
    /// X11 rotation bits as captured
    pub rotation: u16,
    /// Mode name, or `"None"` when the controller had no mode
    pub mode: String,
    /// Connector names in hardware order
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl ControllerEntry {
    /// Whether this entry targets the disabled state.
    pub fn is_off(&self) -> bool {
        self.outputs.is_empty() || self.mode == sentinel::MODE_OFF
    }
}

/// A complete persisted topology for one dock state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub screen: ScreenGeometry,
    #[serde(rename = "controller", default)]
    pub controllers: Vec<ControllerEntry>,
}

impl Profile {
    /// Controller ids recorded at capture time, in entry order.
    pub fn recorded_controller_ids(&self) -> Vec<CrtcId> {
        self.controllers.iter().map(|c| c.controller_id).collect()
    }
}

/// Reader/writer for the two dock-state profile files.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn default_dir() -> PathBuf {
        PathBuf::from(paths::PROFILE_DIR)
    }

    pub fn path(&self, state: DockState) -> PathBuf {
        let file = match state {
            DockState::Docked => paths::DOCKED_PROFILE,
            DockState::Undocked => paths::UNDOCKED_PROFILE,
        };
        self.dir.join(file)
    }

    /// Load the profile for `state`.
    pub fn read(&self, state: DockState) -> Result<Profile, ReconcileError> {
        let path = self.path(state);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReconcileError::ConfigMissing { state, path });
            }
            Err(e) => {
                return Err(ReconcileError::ConfigParse {
                    path,
                    source: e.into(),
                });
            }
        };
        let profile: Profile =
            toml::from_str(&contents).map_err(|e| ReconcileError::ConfigParse {
                path: path.clone(),
                source: e.into(),
            })?;
        info!(
            state = %state,
            path = %path.display(),
            controllers = profile.controllers.len(),
            "loaded profile"
        );
        Ok(profile)
    }

    /// Overwrite the profile for `state`, creating the directory if needed.
    pub fn write(&self, state: DockState, profile: &Profile) -> Result<PathBuf, ReconcileError> {
        let path = self.path(state);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err(&path, e))?;
        }
        let toml_string = toml::to_string_pretty(profile).map_err(|e| write_err(&path, e))?;
        fs::write(&path, toml_string).map_err(|e| write_err(&path, e))?;
        info!(
            state = %state,
            path = %path.display(),
            controllers = profile.controllers.len(),
            "saved profile"
        );
        Ok(path)
    }
}

fn write_err(path: &Path, e: impl Into<anyhow::Error>) -> ReconcileError {
    ReconcileError::ConfigWrite {
        path: path.to_path_buf(),
        source: e.into(),
    }
}
