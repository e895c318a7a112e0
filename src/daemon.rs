//! Daemon mode: event sources and the reconciliation loop
//!
//! Two listener threads feed one channel: an acpid-socket reader for
//! discrete ACPI events and a USB-presence poller that emits dock edges.
//! The loop serializes all work through one engine behind a mutex held for
//! the full reconcile call; triggers arriving mid-reconciliation queue up
//! and run to completion one at a time.

use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{error, info, warn};

use crate::constants::{acpi, dock as dock_consts};
use crate::dock::{self, DockState};
use crate::engine::Engine;
use crate::hooks;
use crate::xrandr::XrandrBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonEvent {
    Docked,
    Undocked,
    ResumeFromSleep,
    ThermalZoneChanged,
}

/// Run until SIGTERM/SIGINT, or until the X server becomes unreachable.
pub fn run(engine: Engine) -> Result<()> {
    let engine = Arc::new(Mutex::new(engine));
    let (tx, rx) = mpsc::channel();
    spawn_acpi_listener(tx.clone());
    spawn_usb_poller(tx);

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))
        .context("failed to register SIGTERM handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .context("failed to register SIGINT handler")?;

    info!("dock daemon started");
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("signal received, shutting down");
            return Ok(());
        }

        let event = match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => bail!("all event sources stopped"),
        };

        let state = match event {
            DaemonEvent::Docked => DockState::Docked,
            DaemonEvent::Undocked => DockState::Undocked,
            // These events carry no dock information; ask the probe.
            DaemonEvent::ResumeFromSleep | DaemonEvent::ThermalZoneChanged => {
                dock::probe_dock_state()
            }
        };
        info!(event = ?event, state = %state, "handling dock event");

        // Losing the display connection is the one fatal daemon error.
        let mut backend = XrandrBackend::connect()?;
        let guard = engine.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.reconcile(&mut backend, state) {
            Ok(()) => hooks::run_hook(state),
            Err(e) => error!(state = %state, error = %e, "reconciliation failed"),
        }
    }
}

/// Reader thread on the acpid multiplexer socket. Reconnects with a delay
/// if acpid goes away; gives up only if the channel closes.
fn spawn_acpi_listener(tx: Sender<DaemonEvent>) {
    thread::spawn(move || {
        loop {
            let stream = match UnixStream::connect(acpi::SOCKET) {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(socket = %acpi::SOCKET, error = %e, "cannot reach acpid, retrying");
                    thread::sleep(Duration::from_secs(5));
                    continue;
                }
            };
            info!(socket = %acpi::SOCKET, "listening for ACPI events");

            for line in BufReader::new(stream).lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "acpid socket read failed, reconnecting");
                        break;
                    }
                };
                if let Some(event) = parse_acpi_line(&line) {
                    info!(line = %line, event = ?event, "ACPI event");
                    if tx.send(event).is_err() {
                        return;
                    }
                }
            }
        }
    });
}

/// Poll thread emitting dock-state edges from the USB/platform probe, for
/// docks whose hotplug never surfaces as an ACPI dock event.
fn spawn_usb_poller(tx: Sender<DaemonEvent>) {
    thread::spawn(move || {
        let mut last = dock::probe_dock_state();
        loop {
            thread::sleep(dock_consts::POLL_INTERVAL);
            let now = dock::probe_dock_state();
            if now != last {
                info!(from = %last, to = %now, "dock presence changed");
                let event = match now {
                    DockState::Docked => DaemonEvent::Docked,
                    DockState::Undocked => DaemonEvent::Undocked,
                };
                if tx.send(event).is_err() {
                    return;
                }
                last = now;
            }
        }
    });
}

/// Map one acpid event line to a daemon event.
///
/// Dock events look like `ibm/dock GDCK 00000003 00000001` with the final
/// data word 1 on dock and 0 on undock.
fn parse_acpi_line(line: &str) -> Option<DaemonEvent> {
    let mut parts = line.split_whitespace();
    let class = parts.next()?;

    if class.contains("dock") {
        let data = parts.last()?;
        let docked = u32::from_str_radix(data, 16).ok()? == 1;
        return Some(if docked {
            DaemonEvent::Docked
        } else {
            DaemonEvent::Undocked
        });
    }
    if class.starts_with("button/sleep") || class.starts_with("button/lid") {
        return Some(DaemonEvent::ResumeFromSleep);
    }
    if class.starts_with("thermal_zone") {
        return Some(DaemonEvent::ThermalZoneChanged);
    }
    None
}
