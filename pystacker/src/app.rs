//! # Application Controller
//!
//! [`App`] is the one owner of the live state: the lifecycle controller
//! (and through it the snapshot store), the capture engine, the resolver
//! and the capture configuration. It is built once in `main` and torn down
//! when the process exits.
//!
//! ## Event Loop
//!
//! [`App::run`] is single-threaded: host events and delayed revival re-sends
//! are handled one at a time, and a capture is awaited inside the handler
//! that asked for it. Two refreshes of the same target therefore never
//! overlap here; if they did, the later `put` would simply win.
//!
//! ## Outcome Routing
//!
//! | Outcome                 | Goes to                                        |
//! |-------------------------|------------------------------------------------|
//! | structured success      | store + bound (or new) view                    |
//! | raw-text success        | read-only document                             |
//! | `MalformedOutput`       | error, plus the raw text as a document         |
//! | any other failure       | the target's view if bound, else global error  |

use anyhow::Result;
use log::{debug, info, warn};
use pystacker_common::ViewRequest;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::capture::{CaptureEngine, CaptureOutcome};
use crate::config::CaptureConfig;
use crate::domain::{CaptureFailureKind, Pid, ProcessInfo, ViewHandle};
use crate::host::{HostEvent, ViewHost};
use crate::lifecycle::{ViewLifecycleController, REVIVAL_RESEND_DELAY};
use crate::process_tree::{ProcessTreeQuery, Resolver};
use crate::selection::{select_targets, Prompter, Selection};
use crate::snapshot::Snapshot;
use crate::store::SnapshotStore;

/// Shown when a refresh arrives without a target.
pub const REFRESH_WITHOUT_PID: &str = "refresh called without a PID";

/// What happened to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureReport {
    pub target: ProcessInfo,
    pub failure: Option<CaptureFailureKind>,
}

impl CaptureReport {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

pub struct App<H: ViewHost, Q: ProcessTreeQuery> {
    views: ViewLifecycleController<H>,
    engine: CaptureEngine,
    resolver: Resolver<Q>,
    config: CaptureConfig,
    resend_tx: UnboundedSender<ViewHandle>,
    resend_rx: UnboundedReceiver<ViewHandle>,
    pending_resends: usize,
}

impl<H: ViewHost, Q: ProcessTreeQuery> App<H, Q> {
    pub fn new(
        host: H,
        store: SnapshotStore,
        engine: CaptureEngine,
        resolver: Resolver<Q>,
        config: CaptureConfig,
    ) -> Self {
        let (resend_tx, resend_rx) = mpsc::unbounded_channel();
        Self {
            views: ViewLifecycleController::new(host, store),
            engine,
            resolver,
            config,
            resend_tx,
            resend_rx,
            pending_resends: 0,
        }
    }

    pub fn views(&self) -> &ViewLifecycleController<H> {
        &self.views
    }

    /// Resolve the interpreters under `root` and let the user disambiguate.
    pub async fn select(&self, root: Pid, prompter: &mut dyn Prompter) -> Result<Selection> {
        let candidates = self.resolver.resolve(root).await;
        info!("Found {} Python candidate(s) under {root}", candidates.len());
        let root_info = self.resolver.root_info(root).await;
        select_targets(&root_info, &candidates, prompter)
    }

    /// Capture each target in turn.
    pub async fn capture_targets(&mut self, targets: Vec<ProcessInfo>) -> Vec<CaptureReport> {
        let mut reports = Vec::with_capacity(targets.len());
        for target in targets {
            reports.push(self.capture_target(target).await);
        }
        reports
    }

    /// Capture from a starting process: resolve, disambiguate, capture.
    ///
    /// A cancelled prompt captures nothing and returns no reports.
    pub async fn capture_from_root(
        &mut self,
        root: Pid,
        prompter: &mut dyn Prompter,
    ) -> Result<Vec<CaptureReport>> {
        match self.select(root, prompter).await? {
            Selection::Cancelled => {
                info!("Capture under {root} cancelled");
                Ok(Vec::new())
            }
            Selection::Targets(targets) => Ok(self.capture_targets(targets).await),
        }
    }

    /// Re-capture a known target. Without a pid this is a visible error.
    pub async fn refresh(&mut self, pid: Option<Pid>, name: Option<String>) -> Option<CaptureReport> {
        let Some(pid) = pid else {
            self.views.notify_error(REFRESH_WITHOUT_PID);
            return None;
        };
        let name = name.unwrap_or_else(|| format!("pid:{}", pid.0));
        Some(self.capture_target(ProcessInfo::new(pid, name)).await)
    }

    /// Capture one target and route the outcome.
    pub async fn capture_target(&mut self, target: ProcessInfo) -> CaptureReport {
        let outcome = self.engine.capture(target.pid, self.config).await;
        let failure = outcome.failure_kind();

        match outcome {
            CaptureOutcome::Success { threads: Some(threads), .. } => {
                self.views.deliver(Snapshot::new(target.clone(), threads));
            }
            CaptureOutcome::Success { raw_text, threads: None } => {
                self.views.show_document(&document_title(&target), &raw_text);
            }
            CaptureOutcome::Failure(failure) => {
                warn!("Capture of {} failed: {failure}", target.label());
                self.views.report_failure(&target, &failure.user_message(&target));
                if failure.kind == CaptureFailureKind::MalformedOutput {
                    self.views.show_document(&document_title(&target), &failure.detail);
                }
            }
        }

        CaptureReport { target, failure }
    }

    pub async fn handle_view_request(&mut self, view: ViewHandle, request: ViewRequest) {
        debug!("{view} -> {request:?}");
        match request {
            ViewRequest::Ready => self.views.on_ready(view),
            ViewRequest::Refresh { pid, name } => {
                self.refresh(pid, name).await;
            }
        }
    }

    /// Revive every view mirrored in the session. Returns how many.
    ///
    /// Each revived view gets a second send after [`REVIVAL_RESEND_DELAY`],
    /// delivered through [`App::run`] or [`App::drain_resends`]. Must be
    /// called inside a tokio runtime.
    pub fn restore(&mut self) -> usize {
        let targets = self.views.store().persisted_targets();
        for &pid in &targets {
            let revival = self.views.revive(pid, None);
            self.schedule_resend(revival.view);
        }
        info!("Restored {} view(s)", targets.len());
        targets.len()
    }

    fn schedule_resend(&mut self, view: ViewHandle) {
        self.pending_resends += 1;
        let tx = self.resend_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(REVIVAL_RESEND_DELAY).await;
            // The loop may already be gone.
            let _ = tx.send(view);
        });
    }

    /// Wait for every scheduled revival re-send and deliver it.
    ///
    /// For runs without an event loop, such as headless `restore`.
    pub async fn drain_resends(&mut self) {
        while self.pending_resends > 0 {
            match self.resend_rx.recv().await {
                Some(view) => self.deliver_resend(view),
                None => break,
            }
        }
    }

    fn deliver_resend(&mut self, view: ViewHandle) {
        self.pending_resends = self.pending_resends.saturating_sub(1);
        self.views.resend(view);
    }

    /// Handle host events until the user quits or the host goes away.
    ///
    /// On the way out, mirrored targets without an open view are forgotten so
    /// the next `restore` reopens only what was open now.
    pub async fn run(&mut self, events: &mut UnboundedReceiver<HostEvent>) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(HostEvent::View { view, request }) => {
                        self.handle_view_request(view, request).await;
                    }
                    Some(HostEvent::Closed { view }) => self.views.dispose(view),
                    Some(HostEvent::Quit) | None => break,
                },
                Some(view) = self.resend_rx.recv() => self.deliver_resend(view),
            }
        }
        self.views.end_session();
        debug!("Event loop finished");
    }
}

fn document_title(target: &ProcessInfo) -> String {
    format!("py-spy dump: {}", target.label())
}
