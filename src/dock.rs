//! Dock state and dock-presence probing
//!
//! ACPI sleep and thermal events carry no dock information, so the daemon
//! infers the state itself: the platform dock node under sysfs is the
//! primary source, a scan for known dock-internal USB hubs the fallback.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::constants::dock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DockState {
    Docked,
    Undocked,
}

impl std::fmt::Display for DockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DockState::Docked => f.write_str("docked"),
            DockState::Undocked => f.write_str("undocked"),
        }
    }
}

/// Infer the current dock state.
///
/// Never fails: if neither source is readable the machine is assumed
/// undocked, which at worst re-applies the builtin-panel profile.
pub fn probe_dock_state() -> DockState {
    if let Some(state) = probe_platform(Path::new(dock::PLATFORM_DIR)) {
        return state;
    }
    probe_usb(Path::new(dock::USB_DEVICE_DIR))
}

/// Primary probe: `/sys/devices/platform/dock.N/docked` is "1" when the
/// ACPI dock is latched.
fn probe_platform(platform_dir: &Path) -> Option<DockState> {
    let entries = match fs::read_dir(platform_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %platform_dir.display(), error = %e, "cannot scan platform devices");
            return None;
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with("dock.") {
            continue;
        }
        let docked_attr = entry.path().join("docked");
        if let Ok(value) = fs::read_to_string(&docked_attr) {
            let docked = value.trim() == "1";
            debug!(node = %docked_attr.display(), docked = docked, "platform dock probe");
            return Some(if docked {
                DockState::Docked
            } else {
                DockState::Undocked
            });
        }
    }
    None
}

/// Fallback probe: the dock shows up on the bus as a known USB hub.
fn probe_usb(usb_dir: &Path) -> DockState {
    let entries = match fs::read_dir(usb_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %usb_dir.display(), error = %e, "cannot scan USB devices, assuming undocked");
            return DockState::Undocked;
        }
    };

    for entry in entries.flatten() {
        let vendor = fs::read_to_string(entry.path().join("idVendor")).unwrap_or_default();
        if vendor.trim() != dock::DOCK_USB_VENDOR {
            continue;
        }
        let product = fs::read_to_string(entry.path().join("idProduct")).unwrap_or_default();
        if dock::DOCK_USB_PRODUCTS.contains(&product.trim()) {
            debug!(device = %entry.path().display(), product = %product.trim(), "USB dock probe hit");
            return DockState::Docked;
        }
    }
    DockState::Undocked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_probe_reads_docked_attribute() {
        let dir = tempfile::tempdir().unwrap();
        let dock_node = dir.path().join("dock.0");
        fs::create_dir(&dock_node).unwrap();
        fs::write(dock_node.join("docked"), "1\n").unwrap();
        assert_eq!(probe_platform(dir.path()), Some(DockState::Docked));

        fs::write(dock_node.join("docked"), "0\n").unwrap();
        assert_eq!(probe_platform(dir.path()), Some(DockState::Undocked));
    }

    #[test]
    fn platform_probe_without_dock_node_is_inconclusive() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(probe_platform(dir.path()), None);
    }

    #[test]
    fn usb_probe_matches_known_hub_ids() {
        let dir = tempfile::tempdir().unwrap();
        let dev = dir.path().join("1-1");
        fs::create_dir(&dev).unwrap();
        fs::write(dev.join("idVendor"), "17ef\n").unwrap();
        fs::write(dev.join("idProduct"), "1010\n").unwrap();
        assert_eq!(probe_usb(dir.path()), DockState::Docked);
    }

    #[test]
    fn usb_probe_ignores_other_vendors() {
        let dir = tempfile::tempdir().unwrap();
        let dev = dir.path().join("1-2");
        fs::create_dir(&dev).unwrap();
        fs::write(dev.join("idVendor"), "046d\n").unwrap();
        fs::write(dev.join("idProduct"), "1010\n").unwrap();
        assert_eq!(probe_usb(dir.path()), DockState::Undocked);
    }
}
