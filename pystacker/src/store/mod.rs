//! # Snapshot Store
//!
//! Keyed registry of the latest [`Snapshot`] per target and the view bound to
//! it. The in-memory maps are the live state; every `put` is mirrored into
//! [`SessionStorage`] so views can be revived after a restart, and `unbind`
//! drops the mirror again.
//!
//! The store does not police the one-view-per-target rule itself. `bind`
//! overwrites; the lifecycle controller checks [`SnapshotStore::has_binding`]
//! and reuses the existing view instead of binding a second one.
//!
//! Single owner, single thread: the store is only touched from the event
//! loop, so it needs no locking.

use std::collections::HashMap;

use log::{debug, warn};
use pystacker_common::PersistedView;

use crate::domain::{Pid, ViewHandle};
use crate::snapshot::Snapshot;

pub mod session;

pub use session::{
    parse_session_key, session_key, FileSessionStorage, MemorySessionStorage, SessionStorage,
};

pub struct SnapshotStore {
    snapshots: HashMap<Pid, Snapshot>,
    bindings: HashMap<Pid, ViewHandle>,
    session: Box<dyn SessionStorage>,
}

impl SnapshotStore {
    pub fn new(session: Box<dyn SessionStorage>) -> Self {
        Self { snapshots: HashMap::new(), bindings: HashMap::new(), session }
    }

    /// Store with an in-memory mirror only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Box::<MemorySessionStorage>::default())
    }

    /// Replace the target's snapshot and mirror it to session storage.
    ///
    /// Mirror failures are logged and otherwise ignored: the mirror only
    /// matters after a restart.
    pub fn put(&mut self, snapshot: Snapshot) {
        let pid = snapshot.target().pid;
        if let Err(e) = self.session.save(&session_key(pid), &snapshot.to_persisted()) {
            warn!("Failed to mirror snapshot for {pid}: {e}");
        }
        self.snapshots.insert(pid, snapshot);
    }

    /// Seed the in-memory map from a revived mirror entry without rewriting it.
    pub(crate) fn restore(&mut self, snapshot: Snapshot) {
        self.snapshots.insert(snapshot.target().pid, snapshot);
    }

    pub fn get(&self, pid: Pid) -> Option<&Snapshot> {
        self.snapshots.get(&pid)
    }

    pub fn bind(&mut self, pid: Pid, view: ViewHandle) {
        if let Some(previous) = self.bindings.insert(pid, view) {
            debug!("Rebound {pid}: {previous} -> {view}");
        }
    }

    /// Drop the binding and the mirrored entry. The in-memory snapshot stays.
    pub fn unbind(&mut self, pid: Pid) -> Option<ViewHandle> {
        if let Err(e) = self.session.remove(&session_key(pid)) {
            warn!("Failed to remove mirrored snapshot for {pid}: {e}");
        }
        self.bindings.remove(&pid)
    }

    pub fn has_binding(&self, pid: Pid) -> bool {
        self.bindings.contains_key(&pid)
    }

    pub fn binding(&self, pid: Pid) -> Option<ViewHandle> {
        self.bindings.get(&pid).copied()
    }

    /// Reverse lookup from a view to its target.
    pub fn target_of(&self, view: ViewHandle) -> Option<Pid> {
        self.bindings.iter().find_map(|(pid, bound)| (*bound == view).then_some(*pid))
    }

    /// Mirrored entry for `pid`, if any.
    pub fn persisted(&self, pid: Pid) -> Option<PersistedView> {
        match self.session.load(&session_key(pid)) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read mirrored snapshot for {pid}: {e}");
                None
            }
        }
    }

    /// Targets with a mirrored entry.
    ///
    /// After [`SnapshotStore::retain_bound`] has run at the end of a session,
    /// these are the views that were open when it ended.
    pub fn persisted_targets(&self) -> Vec<Pid> {
        match self.session.keys() {
            Ok(keys) => keys.iter().filter_map(|key| parse_session_key(key)).collect(),
            Err(e) => {
                warn!("Failed to list mirrored snapshots: {e}");
                Vec::new()
            }
        }
    }

    /// Drop mirrored entries whose target has no open view.
    ///
    /// Called when a session ends, so the mirror only remembers what was open.
    pub fn retain_bound(&mut self) {
        for pid in self.persisted_targets() {
            if self.bindings.contains_key(&pid) {
                continue;
            }
            debug!("Forgetting {pid}: no open view");
            if let Err(e) = self.session.remove(&session_key(pid)) {
                warn!("Failed to remove mirrored snapshot for {pid}: {e}");
            }
        }
    }
}
