//! Structured error types for pystacker
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::time::Duration;

use super::types::{Pid, ProcessInfo, ViewHandle};
use thiserror::Error;

/// Why a process-tree query failed. Always swallowed by the resolver.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Failed to run `{command}`: {error}")]
    CommandFailed { command: String, error: std::io::Error },

    #[error("`{command}` did not finish within {timeout:?}")]
    TimedOut { command: String, timeout: Duration },

    #[error("`{command}` exited with {status}: {stderr}")]
    NonZeroExit { command: String, status: String, stderr: String },

    #[error("Unexpected output from `{command}`: {detail}")]
    Unparsable { command: String, detail: String },

    #[error("Process {0} not found")]
    ProcessNotFound(Pid),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access session file {path}: {error}")]
    Io { path: String, error: std::io::Error },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HostError {
    #[error("View {0} is no longer open")]
    ViewClosed(ViewHandle),

    #[error("View host has shut down")]
    Disconnected,
}

/// Classification of a failed capture, checked in the order listed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFailureKind {
    /// Sampler binary missing or not executable
    #[error("sampler could not be launched")]
    LaunchError,

    /// Sampler did not finish within the engine's bound
    #[error("sampler timed out")]
    TimedOut,

    /// Target is not a recognized Python interpreter
    #[error("not a Python process")]
    NotATarget,

    /// Not privileged enough to attach
    #[error("permission denied")]
    PermissionDenied,

    /// Any other non-zero exit
    #[error("sampler failed")]
    SamplerError,

    /// Zero exit without output
    #[error("sampler produced no output")]
    EmptyOutput,

    /// Structured output that does not parse
    #[error("sampler output could not be parsed")]
    MalformedOutput,
}

/// A classified capture failure with the raw text that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {detail}")]
pub struct CaptureFailure {
    pub kind: CaptureFailureKind,
    pub detail: String,
}

impl CaptureFailure {
    pub fn new(kind: CaptureFailureKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }

    /// User-facing message with guidance for the recoverable kinds.
    #[must_use]
    pub fn user_message(&self, target: &ProcessInfo) -> String {
        let pid = target.pid.0;
        match self.kind {
            CaptureFailureKind::LaunchError => format!(
                "Could not launch py-spy: {}\n\
                 Reinstall it with: cargo xtask setup-sampler",
                self.detail
            ),
            CaptureFailureKind::TimedOut => format!(
                "py-spy did not finish capturing {} within {}",
                target.label(),
                self.detail
            ),
            CaptureFailureKind::NotATarget => format!(
                "The process (PID: {pid}) is not a Python process. \
                 py-spy can only capture stack traces from running Python programs. Try:\n\
                 1. Run a Python script in the terminal first\n\
                 2. Pick the 'python' process rather than its shell"
            ),
            CaptureFailureKind::PermissionDenied => "Permission denied. \
                 py-spy requires admin/root privileges to attach to processes. Try:\n\
                 1. Run as Administrator (Windows)\n\
                 2. Use sudo (Linux/macOS)\n\
                 3. Or sample Python processes you own"
                .to_string(),
            CaptureFailureKind::SamplerError => format!("py-spy failed: {}", self.detail),
            CaptureFailureKind::EmptyOutput => {
                format!("py-spy returned no output for {}", target.label())
            }
            CaptureFailureKind::MalformedOutput => {
                "Failed to parse JSON output from py-spy. The raw output has been opened for inspection."
                    .to_string()
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum TuiError {
    #[error("Terminal error: {0}")]
    TerminalError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
