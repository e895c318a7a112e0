//! Output and mode resolution
//!
//! Maps one persisted controller entry to live hardware handles. Dock and
//! undock events fire before the kernel has finished re-enumerating
//! outputs, so a lookup that misses is retried after a fixed back-off with
//! a fresh topology read, up to a bounded attempt count. Only after the
//! window is exhausted does a missing name become a hard failure.

use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::backend::DisplayBackend;
use crate::constants::retry;
use crate::error::ReconcileError;
use crate::profile::ControllerEntry;
use crate::topology::{CrtcId, Lookup, ModeId, OutputId, TopologySnapshot};

/// Target state for one controller after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Off,
    On {
        x: i16,
        y: i16,
        mode: ModeId,
        rotation: u16,
        outputs: Vec<OutputId>,
    },
}

/// One controller entry with every name replaced by a live handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedController {
    pub controller: CrtcId,
    pub target: Target,
}

/// Settle-and-retry resolver. `Default` uses the production policy
/// (250 ms × 11 attempts); tests shrink the back-off to zero.
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    pub backoff: Duration,
    pub max_attempts: u32,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            backoff: retry::BACKOFF,
            max_attempts: retry::MAX_ATTEMPTS,
        }
    }
}

impl Resolver {
    pub fn new(backoff: Duration, max_attempts: u32) -> Self {
        Self {
            backoff,
            max_attempts,
        }
    }

    /// Resolve one persisted entry against the live topology.
    ///
    /// `topology` is updated in place by settle-retries so later entries
    /// see the freshest snapshot.
    pub fn resolve_entry<B: DisplayBackend>(
        &self,
        backend: &mut B,
        topology: &mut TopologySnapshot,
        entry: &ControllerEntry,
    ) -> Result<ResolvedController, ReconcileError> {
        // No outputs or the "None" sentinel: disabled, no lookups needed.
        if entry.is_off() {
            info!(controller = entry.controller_id, "entry resolves to disabled");
            return Ok(ResolvedController {
                controller: entry.controller_id,
                target: Target::Off,
            });
        }

        let mut outputs: Vec<OutputId> = Vec::with_capacity(entry.outputs.len());
        let mut common_mode: Option<ModeId> = None;

        for output_name in &entry.outputs {
            let output = self
                .settle(backend, topology, output_name, |topo| {
                    topo.find_connected_output(output_name)
                })?
                .ok_or_else(|| ReconcileError::OutputNotFound {
                    output: output_name.clone(),
                    attempts: self.max_attempts,
                })?;

            let mode = self
                .settle(backend, topology, &entry.mode, |topo| {
                    topo.find_mode_for_output(output, &entry.mode)
                })?
                .ok_or_else(|| ReconcileError::ModeNotFound {
                    mode: entry.mode.clone(),
                    output: output_name.clone(),
                    attempts: self.max_attempts,
                })?;

            // First resolved mode fixes the controller's mode; a divergent
            // later output is a hard failure, one controller drives one mode.
            match common_mode {
                None => common_mode = Some(mode),
                Some(expected) if expected != mode => {
                    return Err(ReconcileError::ModeMismatch {
                        controller: entry.controller_id,
                        output: output_name.clone(),
                    });
                }
                Some(_) => {}
            }

            outputs.push(output);
        }

        let mode = common_mode.expect("non-off entry has at least one output");
        info!(
            controller = entry.controller_id,
            mode = mode,
            outputs = outputs.len(),
            "entry resolved"
        );
        Ok(ResolvedController {
            controller: entry.controller_id,
            target: Target::On {
                x: entry.x,
                y: entry.y,
                mode,
                rotation: entry.rotation,
                outputs,
            },
        })
    }

    /// Run one lookup against the snapshot, re-reading the topology and
    /// backing off between attempts. `Ok(None)` means the attempt window
    /// is exhausted.
    fn settle<B: DisplayBackend, T>(
        &self,
        backend: &mut B,
        topology: &mut TopologySnapshot,
        name: &str,
        lookup: impl Fn(&TopologySnapshot) -> Lookup<T>,
    ) -> Result<Option<T>, ReconcileError> {
        for attempt in 1..=self.max_attempts {
            match lookup(topology) {
                Lookup::Resolved(value) => return Ok(Some(value)),
                outcome @ (Lookup::NotYetAvailable | Lookup::NotFound) => {
                    if attempt == self.max_attempts {
                        break;
                    }
                    warn!(
                        name = %name,
                        attempt = attempt,
                        settling = matches!(outcome, Lookup::NotYetAvailable),
                        "lookup missed, waiting for hardware to settle"
                    );
                    thread::sleep(self.backoff);
                    *topology = backend.read_topology().map_err(ReconcileError::Io)?;
                }
            }
        }
        Ok(None)
    }
}
