//! # Shared Data Structures (Core ↔ Renderer)
//!
//! Defines the records and messages that cross the boundary between the
//! snapshot core and whatever renders a snapshot. Everything here is plain
//! serde data: no I/O, no process handling.
//!
//! ## Record Shapes
//!
//! The thread/frame/local records mirror the JSON emitted by `py-spy dump --json`
//! field for field, so a dump deserializes straight into [`ThreadRecord`]s:
//!
//! ```text
//! [ { "pid", "thread_id", "thread_name", "os_thread_id", "active", "owns_gil",
//!     "frames": [ { "name", "filename", "module", "short_filename", "line",
//!                   "locals": [ { "name", "addr", "arg", "repr" } ] } ] } ]
//! ```
//!
//! Frames are kept in the order the sampler emits them. Renderers reverse them
//! for display.
//!
//! ## View Protocol
//!
//! - [`ViewRequest`] - view → core (`ready`, `refresh`)
//! - [`ViewUpdate`] - core → view (`init`, `error`)
//!
//! Both are tagged by a `command` field. `init` is a full replace and is safe
//! to apply any number of times.
//!
//! ## Persisted Layout
//!
//! - [`PersistedView`] - `{threads, processInfo}` mirrored per target so a view
//!   can be revived after a restart

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identity
// ============================================================================

/// OS process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(pub i32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

/// Target descriptor: which process a snapshot belongs to and how to label it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub name: String,
}

impl ProcessInfo {
    pub fn new(pid: Pid, name: impl Into<String>) -> Self {
        Self { pid, name: name.into() }
    }

    /// Label used for view titles and prompts, e.g. `python3 (PID: 1001)`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} (PID: {})", self.name, self.pid.0)
    }
}

// ============================================================================
// Sampler Records
// ============================================================================

/// One thread of a sampled process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub pid: Pid,
    pub thread_id: u64,
    /// The sampler emits `null` for threads it could not name
    #[serde(default)]
    pub thread_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_thread_id: Option<u64>,
    pub active: bool,
    pub owns_gil: bool,
    /// Outermost call first, as emitted by the sampler
    #[serde(default)]
    pub frames: Vec<FrameRecord>,
    /// Present when descendant processes were sampled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_info: Option<serde_json::Value>,
}

impl ThreadRecord {
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.thread_name.as_deref().unwrap_or("Thread")
    }
}

/// One stack frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub short_filename: Option<String>,
    #[serde(default)]
    pub line: Option<i64>,
    /// `null` unless the sampler was asked for locals
    #[serde(default)]
    pub locals: Option<Vec<LocalRecord>>,
}

impl FrameRecord {
    #[must_use]
    pub fn locals(&self) -> &[LocalRecord] {
        self.locals.as_deref().unwrap_or_default()
    }

    /// `short_filename:line`, falling back to the full filename.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        let file = self.short_filename.as_deref().or(self.filename.as_deref())?;
        Some(match self.line {
            Some(line) => format!("{file}:{line}"),
            None => format!("{file}:?"),
        })
    }
}

/// A local variable or argument captured with a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRecord {
    pub name: String,
    #[serde(default)]
    pub addr: Option<u64>,
    #[serde(default)]
    pub arg: bool,
    #[serde(default)]
    pub repr: Option<String>,
}

// ============================================================================
// View Protocol
// ============================================================================

/// Message sent from a view to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ViewRequest {
    /// Sent once when the view has loaded and registered its handlers
    Ready,
    /// Re-capture a known target
    Refresh {
        #[serde(default)]
        pid: Option<Pid>,
        #[serde(default)]
        name: Option<String>,
    },
}

/// Message sent from the core to a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ViewUpdate {
    /// Replace everything the view displays
    Init {
        threads: Vec<ThreadRecord>,
        #[serde(rename = "processInfo")]
        process_info: ProcessInfo,
        #[serde(rename = "capturedAt", default, skip_serializing_if = "Option::is_none")]
        captured_at: Option<DateTime<Utc>>,
    },
    /// Surface a failure without discarding what is displayed
    Error { message: String },
}

// ============================================================================
// Persisted Layout
// ============================================================================

/// Mirror of a target's last snapshot, kept for revival after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedView {
    pub threads: Vec<ThreadRecord>,
    #[serde(rename = "processInfo")]
    pub process_info: ProcessInfo,
    #[serde(rename = "capturedAt", default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_thread() {
        let json = r#"[{"pid":1001,"thread_id":1,"thread_name":"MainThread","active":true,"owns_gil":true,"frames":[]}]"#;
        let threads: Vec<ThreadRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].pid, Pid(1001));
        assert_eq!(threads[0].display_name(), "MainThread");
        assert!(threads[0].frames.is_empty());
        assert!(threads[0].os_thread_id.is_none());
    }

    #[test]
    fn test_parse_null_name_and_locals() {
        let json = r#"{"pid":7,"thread_id":140,"thread_name":null,"active":false,"owns_gil":false,
            "frames":[{"name":"run","filename":"/srv/app/worker.py","module":null,
                       "short_filename":"worker.py","line":12,"locals":null}]}"#;
        let thread: ThreadRecord = serde_json::from_str(json).unwrap();
        assert_eq!(thread.display_name(), "Thread");
        assert!(thread.frames[0].locals().is_empty());
        assert_eq!(thread.frames[0].location().as_deref(), Some("worker.py:12"));
    }

    #[test]
    fn test_request_tags() {
        let ready: ViewRequest = serde_json::from_str(r#"{"command":"ready"}"#).unwrap();
        assert_eq!(ready, ViewRequest::Ready);

        let refresh: ViewRequest =
            serde_json::from_str(r#"{"command":"refresh","pid":1001,"name":"python3"}"#).unwrap();
        assert_eq!(
            refresh,
            ViewRequest::Refresh { pid: Some(Pid(1001)), name: Some("python3".into()) }
        );
    }

    #[test]
    fn test_update_shape() {
        let update = ViewUpdate::Init {
            threads: vec![],
            process_info: ProcessInfo::new(Pid(42), "python"),
            captured_at: None,
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["command"], "init");
        assert_eq!(value["processInfo"]["pid"], 42);
        assert_eq!(value["processInfo"]["name"], "python");
        assert!(value.get("capturedAt").is_none());

        let error = serde_json::to_value(ViewUpdate::Error { message: "boom".into() }).unwrap();
        assert_eq!(error["command"], "error");
        assert_eq!(error["message"], "boom");
    }

    #[test]
    fn test_process_info_label() {
        assert_eq!(ProcessInfo::new(Pid(1001), "python3").label(), "python3 (PID: 1001)");
        assert_eq!(Pid(1234).to_string(), "PID:1234");
    }
}
