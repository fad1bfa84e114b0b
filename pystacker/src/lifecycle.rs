//! # View Lifecycle
//!
//! Creates, reuses, revives and disposes views, one per target:
//!
//! ```text
//! Unbound ──capture / revive──▶ Bound ──close──▶ Disposed
//!                                 ▲ │
//!                                 └─┘ later captures reuse the view
//! ```
//!
//! A later capture for a bound target pushes a fresh `init` into the existing
//! view instead of opening a second one. Closing a view removes the binding
//! and the mirrored session entry; the in-memory snapshot is kept so a late
//! `ready` or a recapture still has data.
//!
//! ## Revival
//!
//! A restored view gets the best data available: the in-memory snapshot,
//! then the session mirror, else an empty `init`. It is sent immediately and
//! once more after [`REVIVAL_RESEND_DELAY`]. The view's `ready` can race its
//! handler registration, so delivery is at-least-once and views apply `init`
//! idempotently.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use log::{debug, info, warn};
use pystacker_common::{ProcessInfo, ViewUpdate};

use crate::domain::{Pid, ViewHandle};
use crate::host::ViewHost;
use crate::snapshot::Snapshot;
use crate::store::SnapshotStore;

/// Delay before the second revival send.
pub const REVIVAL_RESEND_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    Unbound,
    Bound(ViewHandle),
    Disposed,
}

/// Result of reviving a view. The caller schedules the delayed re-send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revival {
    pub view: ViewHandle,
    /// Whether a snapshot (memory or mirror) was found.
    pub restored: bool,
}

pub struct ViewLifecycleController<H: ViewHost> {
    host: H,
    store: SnapshotStore,
    /// Labels for views revived without data.
    names: HashMap<Pid, String>,
    disposed: HashSet<Pid>,
}

impl<H: ViewHost> ViewLifecycleController<H> {
    pub fn new(host: H, store: SnapshotStore) -> Self {
        Self { host, store, names: HashMap::new(), disposed: HashSet::new() }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn phase(&self, pid: Pid) -> ViewPhase {
        match self.store.binding(pid) {
            Some(view) => ViewPhase::Bound(view),
            None if self.disposed.contains(&pid) => ViewPhase::Disposed,
            None => ViewPhase::Unbound,
        }
    }

    /// Store a fresh snapshot and show it, reusing the target's view if bound.
    pub fn deliver(&mut self, snapshot: Snapshot) -> ViewHandle {
        let pid = snapshot.target().pid;
        let init = snapshot.init_message();

        let reused = self.store.binding(pid).and_then(|view| {
            self.host.reveal(view);
            match self.host.post(view, init.clone()) {
                Ok(()) => Some(view),
                Err(e) => {
                    warn!("Dropping stale binding for {pid}: {e}");
                    self.store.unbind(pid);
                    None
                }
            }
        });

        let view = reused.unwrap_or_else(|| {
            let view = self.host.create_view(snapshot.target());
            self.store.bind(pid, view);
            info!("Opened {view} for {}", snapshot.target().label());
            if let Err(e) = self.host.post(view, init) {
                warn!("Failed to post init to new {view}: {e}");
            }
            view
        });

        self.disposed.remove(&pid);
        self.store.put(snapshot);
        view
    }

    /// Surface a capture failure in the target's view, or globally if unbound.
    ///
    /// Never touches the stored snapshot.
    pub fn report_failure(&mut self, target: &ProcessInfo, message: &str) {
        if let Some(view) = self.store.binding(target.pid) {
            let update = ViewUpdate::Error { message: message.to_string() };
            match self.host.post(view, update) {
                Ok(()) => return,
                Err(e) => debug!("Falling back to global notification for {}: {e}", target.pid),
            }
        }
        self.host.notify_error(message);
    }

    pub fn notify_error(&mut self, message: &str) {
        self.host.notify_error(message);
    }

    pub fn show_document(&mut self, title: &str, text: &str) {
        if let Err(e) = self.host.show_document(title, text) {
            warn!("Failed to open document \"{title}\": {e}");
        }
    }

    /// The view finished loading: send it the best data for its target.
    pub fn on_ready(&mut self, view: ViewHandle) {
        match self.store.target_of(view) {
            Some(pid) => self.send_best(view, pid),
            None => debug!("Ignoring ready from unbound {view}"),
        }
    }

    /// Revive a view for `pid` after a restart.
    ///
    /// If the target is already bound the existing view is revealed instead.
    pub fn revive(&mut self, pid: Pid, name: Option<&str>) -> Revival {
        let restored = self.seed_from_mirror(pid);
        if let Some(name) = name {
            self.names.insert(pid, name.to_string());
        }

        let view = match self.store.binding(pid) {
            Some(view) => {
                self.host.reveal(view);
                view
            }
            None => {
                let target = self.best_target(pid);
                let view = self.host.create_view(&target);
                self.store.bind(pid, view);
                info!("Revived {view} for {} (restored: {restored})", target.label());
                view
            }
        };

        self.disposed.remove(&pid);
        self.send_best(view, pid);
        Revival { view, restored }
    }

    /// Second revival send. A view closed in between is skipped.
    pub fn resend(&mut self, view: ViewHandle) {
        match self.store.target_of(view) {
            Some(pid) => self.send_best(view, pid),
            None => debug!("Skipping re-send to closed {view}"),
        }
    }

    /// The user closed `view`.
    pub fn dispose(&mut self, view: ViewHandle) {
        let Some(pid) = self.store.target_of(view) else {
            debug!("Dispose of unknown {view}");
            return;
        };
        self.store.unbind(pid);
        self.disposed.insert(pid);
        info!("Disposed {view} for {pid}");
    }

    /// The session is over: forget mirrored targets without an open view.
    pub fn end_session(&mut self) {
        self.store.retain_bound();
    }

    /// Pull a mirrored snapshot into memory if memory has none.
    fn seed_from_mirror(&mut self, pid: Pid) -> bool {
        if self.store.get(pid).is_some() {
            return true;
        }
        match self.store.persisted(pid) {
            Some(entry) => {
                self.store.restore(Snapshot::from_persisted(entry));
                true
            }
            None => false,
        }
    }

    fn best_target(&self, pid: Pid) -> ProcessInfo {
        if let Some(snapshot) = self.store.get(pid) {
            return snapshot.target().clone();
        }
        let name = self.names.get(&pid).cloned().unwrap_or_else(|| format!("pid:{}", pid.0));
        ProcessInfo::new(pid, name)
    }

    fn best_update(&self, pid: Pid) -> ViewUpdate {
        match self.store.get(pid) {
            Some(snapshot) => snapshot.init_message(),
            None => ViewUpdate::Init {
                threads: Vec::new(),
                process_info: self.best_target(pid),
                captured_at: None,
            },
        }
    }

    fn send_best(&mut self, view: ViewHandle, pid: Pid) {
        let update = self.best_update(pid);
        if let Err(e) = self.host.post(view, update) {
            warn!("Failed to send snapshot to {view}: {e}");
        }
    }
}
