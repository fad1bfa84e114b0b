//! Per-view model: what one tab displays.
//!
//! `init` replaces everything, `error` only adds a message. Applying the same
//! `init` twice leaves the state exactly as applying it once; revival relies
//! on that.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use pystacker_common::{ProcessInfo, ThreadRecord, ViewRequest, ViewUpdate};

/// How long a view waits for a refresh before giving up on it.
pub const SOFT_TIMEOUT: Duration = Duration::from_secs(30);

pub const TIMEOUT_MESSAGE: &str = "Timed out waiting for capture response (30s)";

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    target: ProcessInfo,
    threads: Vec<ThreadRecord>,
    captured_at: Option<DateTime<Utc>>,
    error: Option<String>,
    loading_since: Option<Instant>,
    pub show_locals: bool,
    pub scroll: usize,
}

impl ViewState {
    pub fn new(target: ProcessInfo) -> Self {
        Self {
            target,
            threads: Vec::new(),
            captured_at: None,
            error: None,
            loading_since: None,
            show_locals: false,
            scroll: 0,
        }
    }

    pub fn apply(&mut self, update: ViewUpdate) {
        match update {
            ViewUpdate::Init { threads, process_info, captured_at } => {
                self.threads = threads;
                self.target = process_info;
                self.captured_at = captured_at;
                self.error = None;
                self.loading_since = None;
            }
            ViewUpdate::Error { message } => {
                self.error = Some(message);
                self.loading_since = None;
            }
        }
    }

    /// Start a refresh. `None` while one is already outstanding.
    pub fn begin_refresh(&mut self, now: Instant) -> Option<ViewRequest> {
        if self.loading_since.is_some() {
            return None;
        }
        self.loading_since = Some(now);
        self.error = None;
        Some(ViewRequest::Refresh {
            pid: Some(self.target.pid),
            name: Some(self.target.name.clone()),
        })
    }

    /// Expire an outstanding refresh after [`SOFT_TIMEOUT`].
    ///
    /// A response that arrives later is still applied.
    pub fn tick(&mut self, now: Instant) {
        if let Some(since) = self.loading_since {
            if now.saturating_duration_since(since) >= SOFT_TIMEOUT {
                self.loading_since = None;
                self.error = Some(TIMEOUT_MESSAGE.to_string());
            }
        }
    }

    pub fn target(&self) -> &ProcessInfo {
        &self.target
    }

    pub fn threads(&self) -> &[ThreadRecord] {
        &self.threads
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.captured_at
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading_since.is_some()
    }

    pub fn toggle_locals(&mut self) {
        self.show_locals = !self.show_locals;
    }

    pub fn scroll_by(&mut self, delta: isize) {
        self.scroll = self.scroll.saturating_add_signed(delta);
    }
}
