//! Core identity types.

use std::fmt;

pub use pystacker_common::{Pid, ProcessInfo};

/// Substrings that mark a process name as a Python interpreter.
pub const INTERPRETER_MARKERS: [&str; 2] = ["python", "py"];

/// Returns true if `name` looks like a Python interpreter (case-insensitive).
#[must_use]
pub fn looks_like_interpreter(name: &str) -> bool {
    let lower = name.to_lowercase();
    INTERPRETER_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Opaque handle to a live view, minted by the view host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewHandle(pub u64);

impl fmt::Display for ViewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// A process found under the root that may be sampled.
///
/// Produced by the resolver for one disambiguation round, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCandidate {
    pub pid: Pid,
    pub name: String,
    pub command_line: Option<String>,
}

impl ProcessCandidate {
    #[must_use]
    pub fn info(&self) -> ProcessInfo {
        ProcessInfo::new(self.pid, self.name.clone())
    }
}
