//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pystacker::domain::{HostError, Pid, QueryError, ViewHandle};
use pystacker::host::ViewHost;
use pystacker::process_tree::{ChildProcess, ProcessMeta, ProcessTreeQuery};
use pystacker_common::{ProcessInfo, ViewUpdate};

pub const DUMP_FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/dump.json");

pub const ONE_THREAD: &str = r#"[{"pid":1001,"thread_id":1,"thread_name":"MainThread","active":true,"owns_gil":true,"frames":[]}]"#;

/// Write an executable shell script standing in for py-spy.
///
/// The script records its arguments to `args.txt` beside it, then runs `body`.
#[cfg(unix)]
pub fn fake_sampler(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("py-spy");
    let args_file = dir.join("args.txt");
    let script = format!("#!/bin/sh\necho \"$@\" > '{}'\n{body}\n", args_file.display());
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Arguments the fake sampler was last called with, if it ran.
pub fn recorded_args(dir: &Path) -> Option<String> {
    std::fs::read_to_string(dir.join("args.txt")).ok().map(|s| s.trim_end().to_string())
}

/// Process tree from a table; unknown pids have no children.
#[derive(Default)]
pub struct FakeTree {
    pub edges: HashMap<Pid, Vec<Pid>>,
    pub names: HashMap<Pid, String>,
}

impl FakeTree {
    pub fn with_child(mut self, parent: i32, child: i32, name: &str) -> Self {
        self.edges.entry(Pid(parent)).or_default().push(Pid(child));
        self.names.insert(Pid(child), name.to_string());
        self
    }

    pub fn named(mut self, pid: i32, name: &str) -> Self {
        self.names.insert(Pid(pid), name.to_string());
        self
    }
}

impl ProcessTreeQuery for FakeTree {
    async fn children(&self, parent: Pid) -> Result<Vec<ChildProcess>, QueryError> {
        Ok(self
            .edges
            .get(&parent)
            .into_iter()
            .flatten()
            .map(|&pid| ChildProcess {
                pid,
                meta: self
                    .names
                    .get(&pid)
                    .map(|name| ProcessMeta { name: name.clone(), command_line: None }),
            })
            .collect())
    }

    async fn process_name(&self, pid: Pid) -> Result<String, QueryError> {
        self.names.get(&pid).cloned().ok_or(QueryError::ProcessNotFound(pid))
    }
}

/// Host that records everything it is asked to do.
#[derive(Default)]
pub struct RecordingHost {
    next: u64,
    pub created: Vec<(ViewHandle, ProcessInfo)>,
    pub posts: Vec<(ViewHandle, ViewUpdate)>,
    pub notifications: Vec<String>,
    pub documents: Vec<(String, String)>,
}

impl RecordingHost {
    pub fn inits_for(&self, view: ViewHandle) -> usize {
        self.posts
            .iter()
            .filter(|(v, update)| *v == view && matches!(update, ViewUpdate::Init { .. }))
            .count()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.posts
            .iter()
            .filter_map(|(_, update)| match update {
                ViewUpdate::Error { message } => Some(message.as_str()),
                ViewUpdate::Init { .. } => None,
            })
            .collect()
    }
}

impl ViewHost for RecordingHost {
    fn create_view(&mut self, target: &ProcessInfo) -> ViewHandle {
        self.next += 1;
        let view = ViewHandle(self.next);
        self.created.push((view, target.clone()));
        view
    }

    fn reveal(&mut self, _view: ViewHandle) {}

    fn post(&mut self, view: ViewHandle, update: ViewUpdate) -> Result<(), HostError> {
        self.posts.push((view, update));
        Ok(())
    }

    fn notify_error(&mut self, message: &str) {
        self.notifications.push(message.to_string());
    }

    fn show_document(&mut self, title: &str, text: &str) -> Result<(), HostError> {
        self.documents.push((title.to_string(), text.to_string()));
        Ok(())
    }
}
