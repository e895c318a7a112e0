//! Reconciliation orchestration
//!
//! The only path that mutates hardware: load the dock-state profile,
//! read the live topology, validate, resolve every entry, then run the
//! transactional apply. Any failure before apply aborts with zero hardware
//! mutation. The capture path is the inverse and never mutates.
//!
//! Callers that can race (ACPI thread, USB poll, CLI) share one engine
//! behind a `Mutex` held for the whole call; the apply-time server grab
//! only covers the mutation window, not read/validate/resolve.

use tracing::{info, warn};

use crate::backend::DisplayBackend;
use crate::dock::DockState;
use crate::error::ReconcileError;
use crate::profile::{Profile, ProfileStore};
use crate::resolve::Resolver;
use crate::snapshot::capture_profile;
use crate::validate::validate_profile;

pub struct Engine {
    store: ProfileStore,
    resolver: Resolver,
}

impl Engine {
    pub fn new(store: ProfileStore) -> Self {
        Self {
            store,
            resolver: Resolver::default(),
        }
    }

    #[cfg(test)]
    fn with_resolver(store: ProfileStore, resolver: Resolver) -> Self {
        Self { store, resolver }
    }

    /// Reconcile the display hardware with the saved profile for `state`.
    pub fn reconcile<B: DisplayBackend>(
        &self,
        backend: &mut B,
        state: DockState,
    ) -> Result<(), ReconcileError> {
        info!(state = %state, "reconciling display topology");

        let profile = self.store.read(state)?;
        let mut topology = backend.read_topology().map_err(ReconcileError::Io)?;
        validate_profile(&profile, &topology)?;

        let mut resolved = Vec::with_capacity(profile.controllers.len());
        for entry in &profile.controllers {
            // First resolution failure aborts the whole operation before
            // any mutation.
            resolved.push(self.resolver.resolve_entry(backend, &mut topology, entry)?);
        }

        crate::apply::apply_resolved(backend, &resolved, &profile.screen)?;
        info!(state = %state, "reconciliation complete");
        Ok(())
    }

    /// Capture the live topology into the profile for `state` and persist it.
    pub fn snapshot_and_save<B: DisplayBackend>(
        &self,
        backend: &mut B,
        state: DockState,
    ) -> Result<std::path::PathBuf, ReconcileError> {
        let topology = backend.read_topology().map_err(ReconcileError::Io)?;
        let profile = self.capture(&topology)?;
        self.store.write(state, &profile)
    }

    fn capture(&self, topology: &crate::topology::TopologySnapshot) -> Result<Profile, ReconcileError> {
        let profile = capture_profile(topology)?;
        if profile.controllers.is_empty() {
            warn!("capturing a topology with no controllers");
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::fake::{Call, FakeBackend};
    use crate::constants::retry;
    use crate::profile::ControllerEntry;
    use crate::topology::{
        Connection, Controller, Mode, Output, ScreenGeometry, TopologySnapshot,
    };

    fn geometry() -> ScreenGeometry {
        ScreenGeometry {
            width: 1920,
            height: 1080,
            mm_width: 310,
            mm_height: 170,
        }
    }

    /// Two controllers, one connected panel (laptop off the dock).
    fn live_topology() -> TopologySnapshot {
        TopologySnapshot {
            controllers: vec![
                Controller {
                    id: 63,
                    x: 0,
                    y: 0,
                    mode: 0,
                    rotation: 1,
                    outputs: vec![],
                },
                Controller {
                    id: 64,
                    x: 0,
                    y: 0,
                    mode: 0,
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
            geometry: geometry(),
        }
    }

    fn saved_profile() -> Profile {
        Profile {
            screen: geometry(),
            controllers: vec![
                ControllerEntry {
                    controller_id: 63,
                    x: 0,
                    y: 0,
                    rotation: 1,
                    mode: "1920x1080".into(),
                    outputs: vec!["eDP-1".into()],
                },
                ControllerEntry {
                    controller_id: 64,
                    x: 0,
                    y: 0,
                    rotation: 1,
                    mode: "None".into(),
                    outputs: vec![],
                },
            ],
        }
    }

    fn engine_in(dir: &std::path::Path) -> Engine {
        Engine::with_resolver(
            ProfileStore::new(dir),
            Resolver::new(Duration::ZERO, retry::MAX_ATTEMPTS),
        )
    }

    #[test]
    fn reconcile_disables_both_resizes_then_enables_one() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());
        ProfileStore::new(dir.path())
            .write(DockState::Docked, &saved_profile())
            .unwrap();

        let mut backend = FakeBackend::new(live_topology());
        engine.reconcile(&mut backend, DockState::Docked).unwrap();

        assert_eq!(
            backend
                .mutation_calls()
                .into_iter()
                .cloned()
                .collect::<Vec<_>>(),
            vec![
                Call::Disable(63),
                Call::Disable(64),
                Call::SetScreenSize(1920, 1080),
                Call::Enable {
                    controller: 63,
                    x: 0,
                    y: 0,
                    mode: 81,
                    rotation: 1,
                    outputs: vec![70],
                },
            ]
        );
    }

    #[test]
    fn missing_profile_aborts_without_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());
        let mut backend = FakeBackend::new(live_topology());

        let err = engine
            .reconcile(&mut backend, DockState::Docked)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::ConfigMissing { .. }));
        assert!(backend.calls.is_empty());
        assert_eq!(backend.reads, 0);
    }

    #[test]
    fn stale_controller_set_aborts_without_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());
        let mut profile = saved_profile();
        profile.controllers[1].controller_id = 99;
        ProfileStore::new(dir.path())
            .write(DockState::Docked, &profile)
            .unwrap();

        let mut backend = FakeBackend::new(live_topology());
        let err = engine
            .reconcile(&mut backend, DockState::Docked)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::ConfigInvalid { .. }));
        assert!(backend.mutation_calls().is_empty());
    }

    #[test]
    fn unresolvable_output_aborts_with_zero_apply_calls() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());
        let mut profile = saved_profile();
        profile.controllers[0].outputs = vec!["HDMI-1".into()];
        ProfileStore::new(dir.path())
            .write(DockState::Docked, &profile)
            .unwrap();

        let mut backend = FakeBackend::new(live_topology());
        let err = engine
            .reconcile(&mut backend, DockState::Docked)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::OutputNotFound { .. }));
        assert!(backend.mutation_calls().is_empty());
    }

    #[test]
    fn snapshot_then_reconcile_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());

        // Start from an applied state so the capture has an active mode.
        let mut applied = live_topology();
        applied.controllers[0].mode = 81;
        applied.controllers[0].outputs = vec![70];

        let mut backend = FakeBackend::new(applied);
        let path = engine
            .snapshot_and_save(&mut backend, DockState::Undocked)
            .unwrap();
        assert!(path.ends_with("undocked.toml"));

        // The captured profile validates and applies against the same live
        // topology without error.
        engine
            .reconcile(&mut backend, DockState::Undocked)
            .unwrap();
    }
}
