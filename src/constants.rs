//! Application-wide constants
//!
//! Single source of truth for paths, retry policy, and event-source
//! identifiers used throughout the daemon.

/// Profile storage locations
pub mod paths {
    /// Default directory holding the two dock-state profiles
    pub const PROFILE_DIR: &str = "/etc/dockd";

    /// Profile file for the docked state
    pub const DOCKED_PROFILE: &str = "docked.toml";

    /// Profile file for the undocked state
    pub const UNDOCKED_PROFILE: &str = "undocked.toml";

    /// Script executed after a successful reconciliation to docked
    pub const DOCK_HOOK: &str = "/etc/dockd/dock.hook";

    /// Script executed after a successful reconciliation to undocked
    pub const UNDOCK_HOOK: &str = "/etc/dockd/undock.hook";
}

/// Settle-retry policy for output/mode resolution
pub mod retry {
    use std::time::Duration;

    /// Fixed back-off between resolution attempts while the kernel is
    /// still re-enumerating outputs after a dock event
    pub const BACKOFF: Duration = Duration::from_millis(250);

    /// Total lookup attempts before a name is declared absent (~2.5 s ceiling)
    pub const MAX_ATTEMPTS: u32 = 11;
}

/// Persisted profile sentinels
pub mod profile {
    /// Mode name recorded for a controller that has no active mode
    pub const MODE_OFF: &str = "None";
}

/// ACPI event source
pub mod acpi {
    /// acpid multiplexer socket
    pub const SOCKET: &str = "/var/run/acpid.socket";
}

/// Dock presence detection
pub mod dock {
    use std::time::Duration;

    /// sysfs directory scanned for platform dock nodes (`dock.N/docked`)
    pub const PLATFORM_DIR: &str = "/sys/devices/platform";

    /// sysfs directory scanned for the USB-id fallback probe
    pub const USB_DEVICE_DIR: &str = "/sys/bus/usb/devices";

    /// Lenovo USB vendor id, written as sysfs reports it
    pub const DOCK_USB_VENDOR: &str = "17ef";

    /// Product ids of known dock-internal USB hubs
    pub const DOCK_USB_PRODUCTS: &[&str] = &["1010", "100a", "3060", "306f"];

    /// Interval between USB-presence polls in daemon mode
    pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
}
