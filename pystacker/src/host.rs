//! # View Host
//!
//! The capability the core uses to show things to the user. Two hosts
//! implement it: the terminal UI ([`crate::tui::TuiHost`]) and
//! [`HeadlessHost`], which writes to stdout/stderr for scripting.
//!
//! Views talk back to the core through [`HostEvent`]s on a tokio channel;
//! the application loop is the only consumer.

use std::io::Write;

use log::debug;
use pystacker_common::{ProcessInfo, ViewRequest, ViewUpdate};

use crate::domain::{HostError, ViewHandle};

/// What the core needs from whatever displays views.
pub trait ViewHost {
    /// Open a new view for `target` and return its handle.
    fn create_view(&mut self, target: &ProcessInfo) -> ViewHandle;

    /// Bring an existing view to the front.
    fn reveal(&mut self, view: ViewHandle);

    /// Send a protocol message to a view.
    fn post(&mut self, view: ViewHandle, update: ViewUpdate) -> Result<(), HostError>;

    /// Global notification, used when no view context exists.
    fn notify_error(&mut self, message: &str);

    /// Open read-only text (raw sampler output).
    fn show_document(&mut self, title: &str, text: &str) -> Result<(), HostError>;
}

/// View → core traffic.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    View { view: ViewHandle, request: ViewRequest },
    /// The user closed a view.
    Closed { view: ViewHandle },
    /// The user asked to leave.
    Quit,
}

/// Host without a UI: snapshots go to stdout as JSON, errors to stderr.
///
/// Views exist only as handles; nothing ever sends a `ready`.
pub struct HeadlessHost<O: Write = std::io::Stdout, E: Write = std::io::Stderr> {
    out: O,
    err: E,
    next_view: u64,
}

impl HeadlessHost {
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::stderr())
    }
}

impl<O: Write, E: Write> HeadlessHost<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err, next_view: 1 }
    }

    pub fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }

    fn write_out(&mut self, text: &str) -> Result<(), HostError> {
        writeln!(self.out, "{text}").map_err(|_| HostError::Disconnected)
    }
}

impl<O: Write, E: Write> ViewHost for HeadlessHost<O, E> {
    fn create_view(&mut self, target: &ProcessInfo) -> ViewHandle {
        let view = ViewHandle(self.next_view);
        self.next_view += 1;
        debug!("Headless {view} for {}", target.label());
        view
    }

    fn reveal(&mut self, _view: ViewHandle) {}

    fn post(&mut self, view: ViewHandle, update: ViewUpdate) -> Result<(), HostError> {
        match update {
            ViewUpdate::Init { .. } => {
                let json = serde_json::to_string_pretty(&update).map_err(|e| {
                    debug!("Failed to encode update for {view}: {e}");
                    HostError::Disconnected
                })?;
                self.write_out(&json)
            }
            ViewUpdate::Error { message } => {
                writeln!(self.err, "error: {message}").map_err(|_| HostError::Disconnected)
            }
        }
    }

    fn notify_error(&mut self, message: &str) {
        // Nowhere left to report a failed stderr write.
        let _ = writeln!(self.err, "error: {message}");
    }

    fn show_document(&mut self, title: &str, text: &str) -> Result<(), HostError> {
        debug!("Document: {title}");
        self.write_out(text.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pystacker_common::Pid;

    fn host() -> HeadlessHost<Vec<u8>, Vec<u8>> {
        HeadlessHost::new(Vec::new(), Vec::new())
    }

    #[test]
    fn test_handles_are_distinct() {
        let mut host = host();
        let target = ProcessInfo::new(Pid(1), "python");
        assert_ne!(host.create_view(&target), host.create_view(&target));
    }

    #[test]
    fn test_init_goes_to_stdout_error_to_stderr() {
        let mut host = host();
        let target = ProcessInfo::new(Pid(1001), "python3");
        let view = host.create_view(&target);

        let init = ViewUpdate::Init { threads: vec![], process_info: target, captured_at: None };
        host.post(view, init).unwrap();
        host.post(view, ViewUpdate::Error { message: "boom".into() }).unwrap();
        host.notify_error("global");

        let (out, err) = host.into_parts();
        let out = String::from_utf8(out).unwrap();
        let err = String::from_utf8(err).unwrap();
        assert!(out.contains(r#""command": "init""#));
        assert!(out.contains(r#""pid": 1001"#));
        assert_eq!(err, "error: boom\nerror: global\n");
    }

    #[test]
    fn test_document_is_verbatim() {
        let mut host = host();
        host.show_document("dump", "Thread 0x1 (idle)\n\n").unwrap();
        let (out, _) = host.into_parts();
        assert_eq!(String::from_utf8(out).unwrap(), "Thread 0x1 (idle)\n");
    }
}
