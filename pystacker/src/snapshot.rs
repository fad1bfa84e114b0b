//! Snapshot data model
//!
//! A [`Snapshot`] is one immutable capture of a target's threads. A new
//! capture produces a new value that replaces the old one in the store; no
//! field is ever updated in place.

use chrono::{DateTime, Utc};
use pystacker_common::{PersistedView, ProcessInfo, ThreadRecord, ViewUpdate};

/// Parse the sampler's `--json` output.
pub fn parse_dump(raw: &str) -> Result<Vec<ThreadRecord>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// One capture of a target's thread and frame state.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    target: ProcessInfo,
    threads: Vec<ThreadRecord>,
    captured_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// A snapshot captured now.
    pub fn new(target: ProcessInfo, threads: Vec<ThreadRecord>) -> Self {
        Self::captured_at(target, threads, Utc::now())
    }

    pub fn captured_at(target: ProcessInfo, threads: Vec<ThreadRecord>, at: DateTime<Utc>) -> Self {
        Self { target, threads, captured_at: Some(at) }
    }

    /// Rebuild a snapshot from its mirrored form.
    pub fn from_persisted(view: PersistedView) -> Self {
        Self { target: view.process_info, threads: view.threads, captured_at: view.captured_at }
    }

    #[must_use]
    pub fn to_persisted(&self) -> PersistedView {
        PersistedView {
            threads: self.threads.clone(),
            process_info: self.target.clone(),
            captured_at: self.captured_at,
        }
    }

    /// The `init` message that makes a view display this snapshot.
    #[must_use]
    pub fn init_message(&self) -> ViewUpdate {
        ViewUpdate::Init {
            threads: self.threads.clone(),
            process_info: self.target.clone(),
            captured_at: self.captured_at,
        }
    }

    pub fn target(&self) -> &ProcessInfo {
        &self.target
    }

    pub fn threads(&self) -> &[ThreadRecord] {
        &self.threads
    }

    pub fn capture_time(&self) -> Option<DateTime<Utc>> {
        self.captured_at
    }
}
